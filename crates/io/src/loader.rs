//! Directory loaders and the config-to-result pipeline.

use std::fmt;
use std::path::{Path, PathBuf};

use asset_recon::model::SchoolAggregate;
use asset_recon::{Diagnostic, DiagnosticKind, ReconConfig, ReconError, ReconInput, ReconResult};

use crate::read::read_rows;
use crate::sheet::Extracted;

/// The three source families, one directory each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Totals,
    Skills,
    Responses,
}

impl SourceKind {
    pub fn dir<'a>(&self, config: &'a ReconConfig) -> &'a str {
        match self {
            Self::Totals => &config.sources.totals_dir,
            Self::Skills => &config.sources.skills_dir,
            Self::Responses => &config.sources.responses_dir,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Totals => write!(f, "totals"),
            Self::Skills => write!(f, "skills"),
            Self::Responses => write!(f, "responses"),
        }
    }
}

/// Files in `dir` with `extension` (case-insensitive), sorted by file name.
///
/// A missing directory or one with no matching files is `EmptySourceDir`.
pub fn list_files(kind: SourceKind, dir: &Path, extension: &str) -> Result<Vec<PathBuf>, ReconError> {
    let empty = || ReconError::EmptySourceDir {
        source_kind: kind.to_string(),
        dir: dir.display().to_string(),
        extension: extension.to_string(),
    };
    if !dir.is_dir() {
        return Err(empty());
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| ReconError::Io(format!("{}: {e}", dir.display())))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| ReconError::Io(format!("{}: {e}", dir.display())))?
            .path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if path.is_file() && matches {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(empty());
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Parse every file of one source directory with `extract`.
///
/// A file that fails to read or extract is skipped with a `FileSkipped`
/// diagnostic. Zero parsed files is `NoParsedFiles`.
pub fn load_dir<T, F>(
    kind: SourceKind,
    dir: &Path,
    extension: &str,
    markers: &[String],
    diagnostics: &mut Vec<Diagnostic>,
    periods: &mut Vec<String>,
    mut extract: F,
) -> Result<Vec<T>, ReconError>
where
    F: FnMut(&str, &[Vec<String>], &[String]) -> Result<Extracted<T>, ReconError>,
{
    let files = list_files(kind, dir, extension)?;
    let attempted = files.len();

    let mut sheets = Vec::new();
    for path in &files {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parsed = read_rows(path).and_then(|rows| extract(&file, &rows, markers));
        match parsed {
            Ok(ex) => {
                tracing::info!(source = %kind, file = %file, "loaded");
                diagnostics.extend(ex.diagnostics);
                periods.extend(ex.period);
                sheets.push(ex.sheet);
            }
            Err(e) => {
                tracing::debug!(source = %kind, file = %file, error = %e, "skipping file");
                diagnostics.push(
                    Diagnostic::warning(DiagnosticKind::FileSkipped, e.to_string()).in_file(&file),
                );
            }
        }
    }

    if sheets.is_empty() {
        return Err(ReconError::NoParsedFiles {
            source_kind: kind.to_string(),
            dir: dir.display().to_string(),
            attempted,
        });
    }
    Ok(sheets)
}

/// Everything extracted from the three source directories under `base_dir`.
#[derive(Debug, Clone, Default)]
pub struct LoadedSources {
    pub input: ReconInput,
    /// Month/date labels found in sheet metadata, in load order.
    pub periods: Vec<String>,
}

/// Load all three source directories, resolved against `base_dir`.
pub fn load_sources(config: &ReconConfig, base_dir: &Path) -> Result<LoadedSources, ReconError> {
    let ext = config.sources.extension.trim_start_matches('.');
    let markers = &config.summary_markers;
    let mut diagnostics = Vec::new();
    let mut periods = Vec::new();

    let path = |kind: SourceKind| base_dir.join(kind.dir(config));

    let totals = load_dir(
        SourceKind::Totals,
        &path(SourceKind::Totals),
        ext,
        markers,
        &mut diagnostics,
        &mut periods,
        crate::totals::extract_totals,
    )?;
    let skills = load_dir(
        SourceKind::Skills,
        &path(SourceKind::Skills),
        ext,
        markers,
        &mut diagnostics,
        &mut periods,
        crate::taxonomy::extract_skills,
    )?;
    let responses = load_dir(
        SourceKind::Responses,
        &path(SourceKind::Responses),
        ext,
        markers,
        &mut diagnostics,
        &mut periods,
        crate::responses::extract_responses,
    )?;

    tracing::info!(
        totals = totals.len(),
        skills = skills.len(),
        responses = responses.len(),
        diagnostics = diagnostics.len(),
        "sources loaded"
    );

    Ok(LoadedSources {
        input: ReconInput {
            totals,
            skills,
            responses,
            diagnostics,
        },
        periods,
    })
}

/// Read and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<ReconConfig, ReconError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ReconError::Io(format!("{}: {e}", path.display())))?;
    ReconConfig::from_toml(&text)
}

/// Load config, read all sources next to it, and run reconciliation.
///
/// An empty `school.assessment_date` is filled from the first month/date
/// label found in the source sheets.
pub fn build_school_data(config_path: &Path) -> Result<ReconResult, ReconError> {
    let mut config = load_config(config_path)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let loaded = load_sources(&config, base_dir)?;

    if config.school.assessment_date.is_empty() {
        if let Some(period) = loaded.periods.first() {
            config.school.assessment_date = period.clone();
        }
    }

    asset_recon::run(&config, &loaded.input)
}

/// Write the aggregate as pretty JSON, creating parent directories.
pub fn save_school_data(school: &SchoolAggregate, path: &Path) -> Result<(), ReconError> {
    write_json(school, path)
}

/// Write the data-quality report next to the data output.
pub fn save_diagnostics(result: &ReconResult, path: &Path) -> Result<(), ReconError> {
    write_json(&result.diagnostics, path)
}

pub fn load_school_data(path: &Path) -> Result<SchoolAggregate, ReconError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ReconError::Io(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&text).map_err(|e| ReconError::Json(e.to_string()))
}

pub(crate) fn write_json<T: serde::Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), ReconError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| ReconError::Io(format!("{}: {e}", parent.display())))?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| ReconError::Json(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| ReconError::Io(format!("{}: {e}", path.display())))?;
    tracing::info!(path = %path.display(), "wrote JSON");
    Ok(())
}
