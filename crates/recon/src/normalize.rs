//! Identifier canonicalization for class/section, subject and student names.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

static CLASS_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)[\s\-]*([A-Za-z])").expect("static regex"));

static CANONICAL_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)-([A-Z])$").expect("static regex"));

/// Outcome of class/section normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassLabel {
    /// `<grade>-<SECTION>`, e.g. `3-A`.
    Canonical(String),
    /// No grade/letter pattern found; holds the trimmed raw label.
    Unrecognized(String),
}

impl ClassLabel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Canonical(s) | Self::Unrecognized(s) => s,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Self::Canonical(s) | Self::Unrecognized(s) => s,
        }
    }
}

/// Classify a raw class label: "3 A", "3-A A" and "3a" all become `3-A`.
pub fn classify_class_section(raw: &str) -> ClassLabel {
    let cleaned = raw.trim();
    match CLASS_SECTION.captures(cleaned) {
        Some(caps) => ClassLabel::Canonical(format!(
            "{}-{}",
            &caps[1],
            caps[2].to_uppercase()
        )),
        None => ClassLabel::Unrecognized(cleaned.to_string()),
    }
}

/// Canonical `<grade>-<section>` label, or the trimmed input when no pattern matches.
pub fn normalize_class_section(raw: &str) -> String {
    classify_class_section(raw).into_string()
}

/// Uppercase, with spaces and periods removed. Matching key only, never for display.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Sort key ordering classes by grade number, then section letter.
/// Labels outside the canonical form sort after every canonical one.
pub fn class_sort_key(class_section: &str) -> (u32, String) {
    match CANONICAL_CLASS.captures(class_section) {
        Some(caps) => (caps[1].parse().unwrap_or(u32::MAX), caps[2].to_string()),
        None => (u32::MAX, class_section.to_string()),
    }
}

pub fn compare_classes(a: &str, b: &str) -> Ordering {
    class_sort_key(a).cmp(&class_sort_key(b))
}

pub fn sort_class_sections(classes: &mut [String]) {
    classes.sort_by(|a, b| compare_classes(a, b));
}

// ---------------------------------------------------------------------------
// Subjects
// ---------------------------------------------------------------------------

/// Case-insensitive subject synonym table.
#[derive(Debug, Clone)]
pub struct SubjectSynonyms {
    table: BTreeMap<String, String>,
}

impl Default for SubjectSynonyms {
    fn default() -> Self {
        let mut table = BTreeMap::new();
        table.insert("math".to_string(), "Maths".to_string());
        Self { table }
    }
}

impl SubjectSynonyms {
    /// Built-in table widened by `extra` (keys compared case-insensitively).
    pub fn with_extra(extra: &BTreeMap<String, String>) -> Self {
        let mut synonyms = Self::default();
        for (k, v) in extra {
            synonyms
                .table
                .insert(k.trim().to_lowercase(), v.trim().to_string());
        }
        synonyms
    }

    pub fn normalize(&self, raw: &str) -> String {
        let subject = raw.trim();
        match self.table.get(&subject.to_lowercase()) {
            Some(canonical) => canonical.clone(),
            None => subject.to_string(),
        }
    }
}

/// Subject normalization with the built-in table only.
pub fn normalize_subject(raw: &str) -> String {
    SubjectSynonyms::default().normalize(raw)
}
