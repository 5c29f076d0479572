//! Skill taxonomy source: which questions test which skill.

use asset_recon::{Diagnostic, DiagnosticKind, ReconError, SkillRow, SkillSheet};

use crate::sheet::{cell, find_table, read_meta, Extracted};

pub const HEADER_SENTINEL: &str = "Skill Name";
pub const QUESTIONS_COLUMN: &str = "Questions";
pub const SECTION_PERF_COLUMN: &str = "Section Perf %";
pub const SCHOOL_PERF_COLUMN: &str = "School Perf %";

/// Extract one taxonomy file. A missing percentage column reads as 0 for every skill.
pub fn extract_skills(
    file: &str,
    rows: &[Vec<String>],
    markers: &[String],
) -> Result<Extracted<SkillSheet>, ReconError> {
    let (header_idx, table) = find_table(rows, HEADER_SENTINEL, file)?;
    let meta = read_meta(&rows[..header_idx]);
    let name_col = 0;
    let questions_col = table.require_column(file, QUESTIONS_COLUMN)?;
    let section_col = table.column(SECTION_PERF_COLUMN);
    let school_col = table.column(SCHOOL_PERF_COLUMN);

    let mut diagnostics = Vec::new();
    for (col, name) in [(section_col, SECTION_PERF_COLUMN), (school_col, SCHOOL_PERF_COLUMN)] {
        if col.is_none() {
            diagnostics.push(
                Diagnostic::warning(
                    DiagnosticKind::PercentCoerced,
                    format!("no '{name}' column; using 0 for every skill"),
                )
                .in_file(file),
            );
        }
    }

    let mut skills = Vec::new();
    for row in table.data_rows(name_col, markers) {
        let name = cell(row, name_col);
        let (questions, rejected) = parse_question_list(cell(row, questions_col));
        if !rejected.is_empty() {
            diagnostics.push(
                Diagnostic::info(
                    DiagnosticKind::QuestionListToken,
                    format!("skill '{name}': ignored question token(s) {rejected:?}"),
                )
                .in_file(file),
            );
        }

        let mut perf = |col: Option<usize>, label: &str| -> f64 {
            let Some(col) = col else {
                return 0.0;
            };
            let raw = cell(row, col);
            match parse_percent(raw) {
                Some(p) => p,
                None => {
                    if !raw.is_empty() {
                        diagnostics.push(
                            Diagnostic::warning(
                                DiagnosticKind::PercentCoerced,
                                format!("skill '{name}': {label} '{raw}' is not a number; using 0"),
                            )
                            .in_file(file),
                        );
                    }
                    0.0
                }
            }
        };
        let section_performance = perf(section_col, SECTION_PERF_COLUMN);
        let school_performance = perf(school_col, SCHOOL_PERF_COLUMN);

        skills.push(SkillRow {
            name: name.to_string(),
            questions,
            section_performance,
            school_performance,
        });
    }

    tracing::debug!(file, skills = skills.len(), "extracted skill taxonomy");

    Ok(Extracted {
        sheet: SkillSheet {
            file: file.to_string(),
            raw_class: meta.class,
            raw_subject: meta.subject,
            skills,
        },
        period: meta.period,
        diagnostics,
    })
}

/// Comma-separated question numbers, in order. Non-numeric tokens are
/// returned separately and never fail the row.
pub fn parse_question_list(raw: &str) -> (Vec<u32>, Vec<String>) {
    let mut questions = Vec::new();
    let mut rejected = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.parse::<u32>() {
            Ok(q) if token.bytes().all(|b| b.is_ascii_digit()) => questions.push(q),
            _ => rejected.push(token.to_string()),
        }
    }
    (questions, rejected)
}

/// `"62.5"` or `"62.5%"`; `None` when empty or not a finite number.
pub fn parse_percent(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    number.parse::<f64>().ok().filter(|p| p.is_finite())
}
