//! Cross-source consistency checks. Diagnostic only; never blocks a run.

use std::collections::BTreeSet;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::matcher::NameIndex;
use crate::normalize::normalize_name;

/// Shortest normalized name considered for the near-duplicate check.
pub const MIN_DUPLICATE_KEY_LEN: usize = 8;

/// Names present in exactly one of the totals and responses sources of a pair.
///
/// `responses_names` are raw names from the responses sheet; the index already
/// carries any override that maps a totals name onto its responses spelling.
pub fn cross_source_mismatches<'a>(
    class_section: &str,
    subject: &str,
    index: &NameIndex,
    responses_names: impl IntoIterator<Item = &'a str>,
) -> Vec<Diagnostic> {
    let expected = index.keys();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut display: Vec<(String, String)> = Vec::new();
    for name in responses_names {
        let key = normalize_name(name);
        if seen.insert(key.clone()) {
            display.push((key, name.to_string()));
        }
    }

    let mut out = Vec::new();

    for &key in &expected {
        if !seen.contains(key) {
            let name = index.canonical_for_key(key).unwrap_or(key);
            out.push(
                Diagnostic::warning(
                    DiagnosticKind::MissingFromResponses,
                    format!("'{name}' has a total score but no question responses"),
                )
                .in_pair(class_section, subject),
            );
        }
    }

    for (key, name) in &display {
        if !expected.contains(key.as_str()) {
            out.push(
                Diagnostic::warning(
                    DiagnosticKind::MissingFromTotals,
                    format!("'{name}' has question responses but no total score"),
                )
                .in_pair(class_section, subject),
            );
        }
    }

    out
}

/// Pairs of distinct names in one class where one normalized name contains the other.
///
/// Both keys must be at least [`MIN_DUPLICATE_KEY_LEN`] characters long.
pub fn near_duplicates<'a>(
    class_section: &str,
    names: impl IntoIterator<Item = &'a str>,
) -> Vec<Diagnostic> {
    let distinct: BTreeSet<&str> = names.into_iter().collect();
    let keyed: Vec<(&str, String)> = distinct
        .into_iter()
        .map(|n| (n, normalize_name(n)))
        .filter(|(_, k)| k.chars().count() >= MIN_DUPLICATE_KEY_LEN)
        .collect();

    let mut out = Vec::new();
    for (i, (a, ka)) in keyed.iter().enumerate() {
        for (b, kb) in &keyed[i + 1..] {
            if ka.contains(kb.as_str()) || kb.contains(ka.as_str()) {
                out.push(
                    Diagnostic::info(
                        DiagnosticKind::PossibleDuplicate,
                        format!("'{a}' and '{b}' may be the same student"),
                    )
                    .in_class(class_section),
                );
            }
        }
    }
    out
}
