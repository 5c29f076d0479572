//! Per-question response source. Class and subject come from the file name,
//! `<class>_<subject>.<ext>`.

use std::path::Path;

use asset_recon::{ReconError, ResponseRow, ResponseSheet};

use crate::sheet::{cell, find_table, Extracted};

pub const HEADER_SENTINEL: &str = "Student Name";

/// Highest question number a response header may carry.
pub const MAX_QUESTION_NUMBER: u32 = 500;

/// Split a response file name into raw `(class, subject)`.
///
/// The class is everything before the first `_`; underscores in the rest
/// of the stem become spaces.
pub fn parse_file_name(file: &str) -> Result<(String, String), ReconError> {
    let bad = || ReconError::BadFileName {
        file: file.to_string(),
    };
    let stem = Path::new(file)
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(bad)?;
    let (class, subject) = stem.split_once('_').ok_or_else(bad)?;
    let class = class.trim();
    let subject = subject.replace('_', " ");
    let subject = subject.trim();
    if class.is_empty() || subject.is_empty() {
        return Err(bad());
    }
    Ok((class.to_string(), subject.to_string()))
}

/// Extract one response file into 0/1 vectors indexed by question number − 1.
///
/// The vector width is the highest `Q<n>` column, which may exceed the real
/// test length of the class. A question number above [`MAX_QUESTION_NUMBER`]
/// fails the file.
pub fn extract_responses(
    file: &str,
    rows: &[Vec<String>],
    markers: &[String],
) -> Result<Extracted<ResponseSheet>, ReconError> {
    let (raw_class, raw_subject) = parse_file_name(file)?;
    let (_, table) = find_table(rows, HEADER_SENTINEL, file)?;
    let name_col = 0;
    let questions = table.question_columns();
    let width = questions.iter().map(|(n, _)| *n).max().unwrap_or(0);
    if width > MAX_QUESTION_NUMBER {
        return Err(ReconError::QuestionOutOfRange {
            file: file.to_string(),
            question: width,
            limit: MAX_QUESTION_NUMBER,
        });
    }

    let out: Vec<ResponseRow> = table
        .data_rows(name_col, markers)
        .map(|row| {
            let mut responses = vec![0u8; width as usize];
            for &(n, col) in &questions {
                if is_correct(cell(row, col)) {
                    responses[n as usize - 1] = 1;
                }
            }
            ResponseRow {
                name: cell(row, name_col).to_string(),
                responses,
            }
        })
        .collect();

    tracing::debug!(file, rows = out.len(), width, "extracted question responses");

    Ok(Extracted {
        sheet: ResponseSheet {
            file: file.to_string(),
            raw_class,
            raw_subject,
            width,
            rows: out,
        },
        period: None,
        diagnostics: Vec::new(),
    })
}

fn is_correct(raw: &str) -> bool {
    raw == "1" || raw.parse::<f64>().map(|v| v == 1.0).unwrap_or(false)
}
