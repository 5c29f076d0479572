use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::config::{ReconConfig, UnrecognizedClassPolicy};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticReport, Severity};
use crate::error::ReconError;
use crate::matcher::NameOverrides;
use crate::model::{ReconInput, ReconMeta, ReconResult, SchoolInfo};
use crate::normalize::{classify_class_section, normalize_name, ClassLabel, SubjectSynonyms};
use crate::report::{build_school, PairData, PairKey, StudentScore};
use crate::skills::resolve_overlaps;
use crate::validate::{cross_source_mismatches, near_duplicates};

/// Run reconciliation per config. Returns the school aggregate + diagnostics.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    let synonyms = SubjectSynonyms::with_extra(&config.subject_synonyms);
    let overrides = NameOverrides::from_config(&config.overrides, &synonyms);
    run_with_overrides(config, input, &overrides)
}

/// Same as [`run`], with a caller-supplied override table instead of the config's.
pub fn run_with_overrides(
    config: &ReconConfig,
    input: &ReconInput,
    overrides: &NameOverrides,
) -> Result<ReconResult, ReconError> {
    config.validate()?;
    let synonyms = SubjectSynonyms::with_extra(&config.subject_synonyms);
    let mut diags = DiagnosticReport::default();
    for d in input.diagnostics.iter().cloned() {
        record(&mut diags, d);
    }

    let mut pairs = group_sources(config, input, &synonyms, &mut diags)?;
    validate_pairs(&pairs, overrides, &mut diags);
    drop_empty_orphans(&mut pairs);

    let info = SchoolInfo {
        school_name: config.school.name.clone(),
        school_code: config.school.code.clone(),
        assessment_date: config.school.assessment_date.clone(),
        assessment_name: config.school.assessment_name.clone(),
    };
    let school = build_school(info, &pairs, overrides, config.at_risk_threshold);

    tracing::info!(
        classes = school.classes.len(),
        subjects = school.subjects.len(),
        reports = school.reports.len(),
        diagnostics = diags.len(),
        "reconciliation complete"
    );

    Ok(ReconResult {
        meta: ReconMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        school,
        diagnostics: diags,
    })
}

/// Log a diagnostic through `tracing` and keep it for the report.
fn record(diags: &mut DiagnosticReport, d: Diagnostic) {
    match d.severity {
        Severity::Warning => tracing::warn!(kind = %d.kind, "{d}"),
        Severity::Info => tracing::info!(kind = %d.kind, "{d}"),
    }
    diags.push(d);
}

/// Canonical class for a sheet, or `None` when policy drops it.
fn resolve_class(
    raw: &str,
    file: &str,
    policy: UnrecognizedClassPolicy,
    diags: &mut DiagnosticReport,
) -> Option<String> {
    match classify_class_section(raw) {
        ClassLabel::Canonical(c) => Some(c),
        ClassLabel::Unrecognized(c) => {
            let action = match policy {
                UnrecognizedClassPolicy::PassThrough => "using it unchanged",
                UnrecognizedClassPolicy::Skip => "skipping sheet",
            };
            record(
                diags,
                Diagnostic::warning(
                    DiagnosticKind::UnrecognizedClass,
                    format!("class label '{c}' has no <grade><section> pattern; {action}"),
                )
                .in_file(file),
            );
            match policy {
                UnrecognizedClassPolicy::PassThrough => Some(c),
                UnrecognizedClassPolicy::Skip => None,
            }
        }
    }
}

/// Fold every sheet into its canonical (class, subject) pair.
fn group_sources(
    config: &ReconConfig,
    input: &ReconInput,
    synonyms: &SubjectSynonyms,
    diags: &mut DiagnosticReport,
) -> Result<BTreeMap<PairKey, PairData>, ReconError> {
    let policy = config.unrecognized_class;
    let mut pairs: BTreeMap<PairKey, PairData> = BTreeMap::new();
    let mut seen_names: HashSet<(PairKey, String)> = HashSet::new();

    for sheet in &input.totals {
        let Some(class_section) = resolve_class(&sheet.raw_class, &sheet.file, policy, diags) else {
            continue;
        };
        let subject = synonyms.normalize(&sheet.raw_subject);
        let key = (class_section.clone(), subject.clone());
        tracing::debug!(file = %sheet.file, %class_section, %subject, rows = sheet.rows.len(), "totals sheet");

        let pair = pairs
            .entry(key.clone())
            .or_insert_with(|| PairData::new(&class_section, &subject));
        for row in &sheet.rows {
            if !seen_names.insert((key.clone(), normalize_name(&row.name))) {
                record(
                    diags,
                    Diagnostic::warning(
                        DiagnosticKind::DuplicateStudent,
                        format!("'{}' appears more than once; keeping every row", row.name),
                    )
                    .in_pair(&class_section, &subject)
                    .in_file(&sheet.file),
                );
            }
            pair.students.push(StudentScore {
                name: row.name.clone(),
                score: row.score,
                total_questions: sheet.total_questions,
            });
        }
    }

    let totals_keys: BTreeSet<PairKey> = pairs.keys().cloned().collect();

    for sheet in &input.responses {
        let Some(class_section) = resolve_class(&sheet.raw_class, &sheet.file, policy, diags) else {
            continue;
        };
        let subject = synonyms.normalize(&sheet.raw_subject);
        let key = (class_section.clone(), subject.clone());
        if !totals_keys.contains(&key) {
            record(
                diags,
                Diagnostic::warning(
                    DiagnosticKind::ResponsesWithoutTotals,
                    "question responses for a class/subject with no totals sheet",
                )
                .in_pair(&class_section, &subject)
                .in_file(&sheet.file),
            );
        }
        pairs
            .entry(key)
            .or_insert_with(|| PairData::new(&class_section, &subject))
            .responses
            .extend(sheet.rows.iter().cloned());
    }

    let mut raw_skills: BTreeMap<PairKey, Vec<crate::model::SkillRow>> = BTreeMap::new();
    for sheet in &input.skills {
        let Some(class_section) = resolve_class(&sheet.raw_class, &sheet.file, policy, diags) else {
            continue;
        };
        let subject = synonyms.normalize(&sheet.raw_subject);
        let key = (class_section.clone(), subject.clone());
        if !totals_keys.contains(&key) {
            record(
                diags,
                Diagnostic::warning(
                    DiagnosticKind::SkillsWithoutTotals,
                    "skill taxonomy for a class/subject with no totals sheet",
                )
                .in_pair(&class_section, &subject)
                .in_file(&sheet.file),
            );
        }
        raw_skills.entry(key).or_default().extend(sheet.skills.iter().cloned());
    }

    for ((class_section, subject), skills) in raw_skills {
        let (resolved, overlaps) =
            resolve_overlaps(&class_section, &subject, &skills, config.skill_overlap)?;
        for ov in overlaps {
            record(
                diags,
                Diagnostic::warning(
                    DiagnosticKind::SkillOverlap,
                    format!(
                        "question {} claimed by '{}' and '{}'; kept in '{}'",
                        ov.question, ov.dropped_from, ov.kept_by, ov.kept_by
                    ),
                )
                .in_pair(&class_section, &subject),
            );
        }
        pairs
            .entry((class_section.clone(), subject.clone()))
            .or_insert_with(|| PairData::new(&class_section, &subject))
            .skills = resolved;
    }

    Ok(pairs)
}

/// Cross-source symmetric difference per pair, near-duplicates per class.
fn validate_pairs(
    pairs: &BTreeMap<PairKey, PairData>,
    overrides: &NameOverrides,
    diags: &mut DiagnosticReport,
) {
    for pair in pairs.values() {
        if pair.responses.is_empty() || pair.students.is_empty() {
            continue;
        }
        let index = pair.name_index(overrides);
        for d in cross_source_mismatches(
            &pair.class_section,
            &pair.subject,
            &index,
            pair.responses.iter().map(|r| r.name.as_str()),
        ) {
            record(diags, d);
        }
    }

    let mut names_by_class: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for pair in pairs.values() {
        names_by_class
            .entry(pair.class_section.as_str())
            .or_default()
            .extend(pair.students.iter().map(|s| s.name.as_str()));
    }
    for (class_section, names) in names_by_class {
        for d in near_duplicates(class_section, names) {
            record(diags, d);
        }
    }
}

/// Pairs that only exist on the responses/skills side never produce a report.
fn drop_empty_orphans(pairs: &mut BTreeMap<PairKey, PairData>) {
    pairs.retain(|_, p| !p.students.is_empty());
}
