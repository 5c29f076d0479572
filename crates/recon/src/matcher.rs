use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::NameOverride;
use crate::normalize::{normalize_class_section, normalize_name, SubjectSynonyms};

/// Key of one override: (class, subject, normalized totals name).
type OverrideKey = (String, String, String);

/// Injectable table of known name divergences between totals and responses.
///
/// Values are normalized on insert, so callers may supply display spellings.
#[derive(Debug, Clone, Default)]
pub struct NameOverrides {
    map: HashMap<OverrideKey, String>,
}

impl NameOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(overrides: &[NameOverride], synonyms: &SubjectSynonyms) -> Self {
        let mut table = Self::new();
        for ov in overrides {
            table.insert(
                &normalize_class_section(&ov.class_section),
                &synonyms.normalize(&ov.subject),
                &ov.totals_name,
                &ov.responses_name,
            );
        }
        table
    }

    /// `class_section` and `subject` must already be canonical.
    pub fn insert(&mut self, class_section: &str, subject: &str, totals_name: &str, responses_name: &str) {
        self.map.insert(
            (
                class_section.to_string(),
                subject.to_string(),
                normalize_name(totals_name),
            ),
            normalize_name(responses_name),
        );
    }

    /// Normalized responses-side spelling for a normalized totals name, if overridden.
    pub fn lookup(&self, class_section: &str, subject: &str, totals_key: &str) -> Option<&str> {
        self.map
            .get(&(
                class_section.to_string(),
                subject.to_string(),
                totals_key.to_string(),
            ))
            .map(String::as_str)
    }

    /// Key under which the responses source should carry `totals_name`.
    pub fn responses_key(&self, class_section: &str, subject: &str, totals_name: &str) -> String {
        let totals_key = normalize_name(totals_name);
        self.lookup(class_section, subject, &totals_key)
            .map(str::to_string)
            .unwrap_or(totals_key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Lookup from responses-side name key to canonical (totals) display name
/// for one (class, subject). The totals source is ground truth.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    by_key: BTreeMap<String, String>,
}

impl NameIndex {
    pub fn build<'a>(
        class_section: &str,
        subject: &str,
        canonical_names: impl IntoIterator<Item = &'a str>,
        overrides: &NameOverrides,
    ) -> Self {
        let mut by_key = BTreeMap::new();
        for name in canonical_names {
            let key = overrides.responses_key(class_section, subject, name);
            // First row wins when a name repeats within one pair.
            by_key.entry(key).or_insert_with(|| name.to_string());
        }
        Self { by_key }
    }

    /// Canonical name for a raw responses-side name.
    pub fn resolve(&self, responses_name: &str) -> Option<&str> {
        self.by_key.get(&normalize_name(responses_name)).map(String::as_str)
    }

    /// Responses-side keys this index expects to see.
    pub fn keys(&self) -> BTreeSet<&str> {
        self.by_key.keys().map(String::as_str).collect()
    }

    pub fn canonical_for_key(&self, key: &str) -> Option<&str> {
        self.by_key.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
