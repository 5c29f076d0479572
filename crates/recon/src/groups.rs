//! Saved cross-class student groups. Opaque to reconciliation; carried for
//! the reporting surface, which owns their meaning.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedGroup {
    pub subject: String,
    /// Display labels of the selected students, e.g. `"RIYA SEN (3-A)"`.
    pub students: Vec<String>,
}

/// Group name -> group, serialized as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedGroups(pub BTreeMap<String, SavedGroup>);

impl SavedGroups {
    pub fn insert(&mut self, name: impl Into<String>, group: SavedGroup) -> Option<SavedGroup> {
        self.0.insert(name.into(), group)
    }

    pub fn remove(&mut self, name: &str) -> Option<SavedGroup> {
        self.0.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&SavedGroup> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn from_json(input: &str) -> Result<Self, crate::ReconError> {
        serde_json::from_str(input).map_err(|e| crate::ReconError::Json(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, crate::ReconError> {
        serde_json::to_string_pretty(self).map_err(|e| crate::ReconError::Json(e.to_string()))
    }
}

/// Display label used for a student inside a group.
pub fn member_label(name: &str, class_section: &str) -> String {
    format!("{name} ({class_section})")
}
