use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::normalize::{
    classify_class_section, normalize_class_section, normalize_name, ClassLabel, SubjectSynonyms,
};

pub const DEFAULT_AT_RISK_THRESHOLD: f64 = 60.0;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    #[serde(default)]
    pub school: SchoolConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default = "default_threshold")]
    pub at_risk_threshold: f64,
    /// Extra subject synonyms, merged over the built-in table.
    #[serde(default)]
    pub subject_synonyms: BTreeMap<String, String>,
    #[serde(default = "default_summary_markers")]
    pub summary_markers: Vec<String>,
    #[serde(default)]
    pub unrecognized_class: UnrecognizedClassPolicy,
    #[serde(default)]
    pub skill_overlap: SkillOverlapPolicy,
    #[serde(default)]
    pub overrides: Vec<NameOverride>,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            school: SchoolConfig::default(),
            sources: SourcesConfig::default(),
            at_risk_threshold: DEFAULT_AT_RISK_THRESHOLD,
            subject_synonyms: BTreeMap::new(),
            summary_markers: default_summary_markers(),
            unrecognized_class: UnrecognizedClassPolicy::default(),
            skill_overlap: SkillOverlapPolicy::default(),
            overrides: Vec::new(),
        }
    }
}

fn default_threshold() -> f64 {
    DEFAULT_AT_RISK_THRESHOLD
}

fn default_summary_markers() -> Vec<String> {
    vec!["Correct Answer".into(), "Avg Section".into(), "Avg School".into()]
}

// ---------------------------------------------------------------------------
// School + Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SchoolConfig {
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub assessment_date: String,
    #[serde(default)]
    pub assessment_name: String,
}

impl Default for SchoolConfig {
    fn default() -> Self {
        Self {
            name: "School".into(),
            code: String::new(),
            assessment_date: String::new(),
            assessment_name: String::new(),
        }
    }
}

/// Source directories, resolved relative to the config file by the loader.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_totals_dir")]
    pub totals_dir: String,
    #[serde(default = "default_skills_dir")]
    pub skills_dir: String,
    #[serde(default = "default_responses_dir")]
    pub responses_dir: String,
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            totals_dir: default_totals_dir(),
            skills_dir: default_skills_dir(),
            responses_dir: default_responses_dir(),
            extension: default_extension(),
        }
    }
}

fn default_totals_dir() -> String {
    "totals".into()
}

fn default_skills_dir() -> String {
    "skills".into()
}

fn default_responses_dir() -> String {
    "responses".into()
}

fn default_extension() -> String {
    "csv".into()
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// What to do with a class label that has no `<grade><letter>` pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnrecognizedClassPolicy {
    /// Use the trimmed raw label as the class key.
    #[default]
    PassThrough,
    /// Drop the sheet.
    Skip,
}

/// Which skill keeps a question that two skills of one report both claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillOverlapPolicy {
    #[default]
    LastWins,
    FirstWins,
    Reject,
}

// ---------------------------------------------------------------------------
// Name overrides
// ---------------------------------------------------------------------------

/// One known spelling divergence between the totals and responses sources.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NameOverride {
    pub class_section: String,
    pub subject: String,
    pub totals_name: String,
    pub responses_name: String,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.school.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("school.name must not be empty".into()));
        }

        if !(0.0..=100.0).contains(&self.at_risk_threshold) {
            return Err(ReconError::ConfigValidation(format!(
                "at_risk_threshold must be within 0..=100, got {}",
                self.at_risk_threshold
            )));
        }

        if self.sources.extension.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "sources.extension must not be empty".into(),
            ));
        }

        if self.summary_markers.is_empty() {
            return Err(ReconError::ConfigValidation(
                "summary_markers must list at least one marker".into(),
            ));
        }
        if self.summary_markers.iter().any(|m| m.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(
                "summary_markers must not contain empty entries".into(),
            ));
        }

        let synonyms = SubjectSynonyms::with_extra(&self.subject_synonyms);
        let mut seen = HashSet::new();
        for ov in &self.overrides {
            if matches!(classify_class_section(&ov.class_section), ClassLabel::Unrecognized(_)) {
                return Err(ReconError::ConfigValidation(format!(
                    "override for '{}': class '{}' is not a <grade>-<section> label",
                    ov.totals_name, ov.class_section
                )));
            }
            if normalize_name(&ov.totals_name).is_empty()
                || normalize_name(&ov.responses_name).is_empty()
            {
                return Err(ReconError::ConfigValidation(format!(
                    "override in {} {}: names must not be empty",
                    ov.class_section, ov.subject
                )));
            }
            let key = (
                normalize_class_section(&ov.class_section),
                synonyms.normalize(&ov.subject).to_lowercase(),
                normalize_name(&ov.totals_name),
            );
            if !seen.insert(key) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate override for '{}' in {} {}",
                    ov.totals_name, ov.class_section, ov.subject
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
