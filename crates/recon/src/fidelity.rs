//! Post-build audit of the aggregate against the extracted totals source.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use crate::config::{ReconConfig, UnrecognizedClassPolicy};
use crate::model::{ReconInput, SchoolAggregate};
use crate::normalize::{classify_class_section, ClassLabel, SubjectSynonyms};
use crate::stats::percentage;

const TOLERANCE: f64 = 0.1;

#[derive(Debug, Clone, Serialize)]
pub struct FidelityCheck {
    pub name: &'static str,
    pub checked: usize,
    pub failures: Vec<String>,
}

impl FidelityCheck {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            checked: 0,
            failures: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FidelityReport {
    pub checks: Vec<FidelityCheck>,
}

impl FidelityReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(FidelityCheck::passed)
    }

    pub fn check(&self, name: &str) -> Option<&FidelityCheck> {
        self.checks.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for FidelityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.checks {
            let status = if c.passed() { "PASS" } else { "FAIL" };
            writeln!(f, "[{status}] {} ({} checked)", c.name, c.checked)?;
            for failure in &c.failures {
                writeln!(f, "    - {failure}")?;
            }
        }
        Ok(())
    }
}

/// One totals row in canonical coordinates.
struct SourceRow<'a> {
    class_section: String,
    subject: String,
    name: &'a str,
    score: i64,
    total_questions: u32,
}

fn source_rows<'a>(config: &ReconConfig, input: &'a ReconInput) -> Vec<SourceRow<'a>> {
    let synonyms = SubjectSynonyms::with_extra(&config.subject_synonyms);
    let mut rows = Vec::new();
    for sheet in &input.totals {
        let class_section = match classify_class_section(&sheet.raw_class) {
            ClassLabel::Canonical(c) => c,
            ClassLabel::Unrecognized(c) => match config.unrecognized_class {
                UnrecognizedClassPolicy::PassThrough => c,
                UnrecognizedClassPolicy::Skip => continue,
            },
        };
        let subject = synonyms.normalize(&sheet.raw_subject);
        for row in &sheet.rows {
            rows.push(SourceRow {
                class_section: class_section.clone(),
                subject: subject.clone(),
                name: &row.name,
                score: row.score,
                total_questions: sheet.total_questions,
            });
        }
    }
    rows
}

/// Re-check score fidelity, percentages, medians, count conservation and
/// class/subject coverage of `school` against the totals it was built from.
pub fn audit(config: &ReconConfig, input: &ReconInput, school: &SchoolAggregate) -> FidelityReport {
    let rows = source_rows(config, input);

    let mut output: HashMap<(&str, &str, &str), Vec<(i64, u32)>> = HashMap::new();
    for r in &school.reports {
        for s in &r.students {
            output
                .entry((r.class_section.as_str(), r.subject.as_str(), s.name.as_str()))
                .or_default()
                .push((s.score, s.total_questions));
        }
    }

    let mut scores = FidelityCheck::new("score_fidelity");
    for row in &rows {
        scores.checked += 1;
        let key = (row.class_section.as_str(), row.subject.as_str(), row.name);
        let Some(candidates) = output.get_mut(&key) else {
            scores.failures.push(format!(
                "MISSING: {} ({} {}) not in output",
                row.name, row.class_section, row.subject
            ));
            continue;
        };
        match candidates
            .iter()
            .position(|&(s, t)| s == row.score && t == row.total_questions)
        {
            Some(i) => {
                candidates.swap_remove(i);
            }
            None => scores.failures.push(format!(
                "SCORE MISMATCH: {} ({} {}): source {}/{}, output {:?}",
                row.name, row.class_section, row.subject, row.score, row.total_questions, candidates
            )),
        }
    }

    let mut percentages = FidelityCheck::new("percentage_calculation");
    let mut medians = FidelityCheck::new("median_calculation");
    for r in &school.reports {
        for s in &r.students {
            percentages.checked += 1;
            let expected = percentage(s.score, s.total_questions);
            if (expected - s.percentage).abs() > TOLERANCE {
                percentages.failures.push(format!(
                    "{} ({} {}): expected {expected}%, got {}%",
                    s.name, r.class_section, r.subject, s.percentage
                ));
            }
        }

        medians.checked += 1;
        let mut pcts: Vec<f64> = r.students.iter().map(|s| s.percentage).collect();
        pcts.sort_by(f64::total_cmp);
        let n = pcts.len();
        let expected = if n == 0 {
            0.0
        } else if n % 2 == 1 {
            pcts[n / 2]
        } else {
            (pcts[n / 2 - 1] + pcts[n / 2]) / 2.0
        };
        if (expected - r.class_median).abs() > TOLERANCE {
            medians.failures.push(format!(
                "{} {}: expected median {expected:.1}%, got {:.1}%",
                r.class_section, r.subject, r.class_median
            ));
        }
    }

    let mut counts = FidelityCheck::new("count_conservation");
    counts.checked = 1;
    let output_count: usize = school.reports.iter().map(|r| r.students.len()).sum();
    if output_count != rows.len() {
        counts.failures.push(format!(
            "source has {} student rows, output has {output_count}",
            rows.len()
        ));
    }

    let mut coverage = FidelityCheck::new("coverage_completeness");
    let source_pairs: BTreeSet<(&str, &str)> = rows
        .iter()
        .map(|r| (r.class_section.as_str(), r.subject.as_str()))
        .collect();
    let output_pairs: BTreeSet<(&str, &str)> = school
        .reports
        .iter()
        .map(|r| (r.class_section.as_str(), r.subject.as_str()))
        .collect();
    coverage.checked = source_pairs.len();
    for (c, s) in source_pairs.difference(&output_pairs) {
        coverage.failures.push(format!("missing in output: {c} {s}"));
    }
    for (c, s) in output_pairs.difference(&source_pairs) {
        coverage.failures.push(format!("extra in output: {c} {s}"));
    }

    FidelityReport {
        checks: vec![scores, percentages, medians, counts, coverage],
    }
}
