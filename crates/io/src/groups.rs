// Saved group persistence

use std::path::Path;

use asset_recon::groups::SavedGroups;
use asset_recon::ReconError;

/// Load saved groups; a missing file is an empty set.
pub fn load_groups(path: &Path) -> Result<SavedGroups, ReconError> {
    match std::fs::read_to_string(path) {
        Ok(text) => SavedGroups::from_json(&text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SavedGroups::default()),
        Err(e) => Err(ReconError::Io(format!("{}: {e}", path.display()))),
    }
}

pub fn save_groups(groups: &SavedGroups, path: &Path) -> Result<(), ReconError> {
    crate::loader::write_json(groups, path)
}
