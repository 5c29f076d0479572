use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, DiagnosticReport};
use crate::stats::Statistics;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One student row from a totals sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalsRow {
    pub name: String,
    /// Authoritative "Total Score" value (0 when the cell was not numeric).
    pub score: i64,
}

/// A parsed totals file: one class/subject test with its student scores.
#[derive(Debug, Clone)]
pub struct TotalsSheet {
    pub file: String,
    pub raw_class: String,
    pub raw_subject: String,
    /// Number of `Q<n>` columns in the header row.
    pub total_questions: u32,
    pub rows: Vec<TotalsRow>,
}

/// One skill of a taxonomy sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillRow {
    pub name: String,
    /// 1-indexed question numbers, in source order.
    pub questions: Vec<u32>,
    pub section_performance: f64,
    pub school_performance: f64,
}

#[derive(Debug, Clone)]
pub struct SkillSheet {
    pub file: String,
    pub raw_class: String,
    pub raw_subject: String,
    pub skills: Vec<SkillRow>,
}

/// One student's right/wrong vector; index `i` holds question `i + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRow {
    pub name: String,
    pub responses: Vec<u8>,
}

/// A parsed per-question response file, keyed by its `<class>_<subject>` file name.
#[derive(Debug, Clone)]
pub struct ResponseSheet {
    pub file: String,
    pub raw_class: String,
    pub raw_subject: String,
    /// Declared matrix width; may exceed the real test length.
    pub width: u32,
    pub rows: Vec<ResponseRow>,
}

/// Pre-extracted source sheets plus whatever the extractors had to report.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub totals: Vec<TotalsSheet>,
    pub skills: Vec<SkillSheet>,
    pub responses: Vec<ResponseSheet>,
    pub diagnostics: Vec<Diagnostic>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentResult {
    pub name: String,
    pub score: i64,
    pub total_questions: u32,
    pub percentage: f64,
    #[serde(default)]
    pub question_responses: Vec<u8>,
    #[serde(default)]
    pub skill_performance: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillPerformance {
    pub skill_name: String,
    pub questions: Vec<u32>,
    pub section_performance: f64,
    pub school_performance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub class_section: String,
    pub subject: String,
    pub total_students: usize,
    pub total_questions: u32,
    /// Secondary metric, always reported next to the median.
    pub class_average: f64,
    /// Primary metric.
    pub class_median: f64,
    pub statistics: Statistics,
    pub students: Vec<StudentResult>,
    pub skills: Vec<SkillPerformance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSummary {
    pub median: f64,
    pub average: f64,
}

/// Per-class roll-up across all subjects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeSummary {
    pub overall_median: f64,
    pub overall_average: f64,
    pub by_subject: BTreeMap<String, SubjectSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolInfo {
    pub school_name: String,
    pub school_code: String,
    pub assessment_date: String,
    pub assessment_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolStatistics {
    pub median: f64,
    pub average: f64,
    /// Distinct student names per class, summed over classes.
    pub total_students: usize,
    /// Student records across all reports.
    pub total_assessments: usize,
}

/// The single artifact handed to downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolAggregate {
    pub school_info: SchoolInfo,
    pub classes: Vec<String>,
    pub subjects: Vec<String>,
    pub reports: Vec<ClassReport>,
    pub grade_medians: BTreeMap<String, GradeSummary>,
    pub school_statistics: SchoolStatistics,
}

impl SchoolAggregate {
    pub fn report(&self, class_section: &str, subject: &str) -> Option<&ClassReport> {
        self.reports
            .iter()
            .find(|r| r.class_section == class_section && r.subject == subject)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub school: SchoolAggregate,
    pub diagnostics: DiagnosticReport,
}
