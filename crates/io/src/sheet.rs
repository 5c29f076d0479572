//! Layout helpers shared by the extractors: metadata rows, header sentinel,
//! question columns and summary-row filtering.

use once_cell::sync::Lazy;
use regex::Regex;

use asset_recon::{Diagnostic, ReconError};

static QUESTION_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[Qq](\d+)$").expect("static regex"));

/// Class/subject labels found above the header row, still raw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetMeta {
    pub class: String,
    pub subject: String,
    /// Month/date label of the sitting, when the file carries one.
    pub period: Option<String>,
}

/// One extracted file plus the non-fatal issues found while reading it.
#[derive(Debug, Clone)]
pub struct Extracted<T> {
    pub sheet: T,
    pub period: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A located table: the header row and every row below it.
#[derive(Debug, Clone, Copy)]
pub struct Table<'a> {
    pub header: &'a [String],
    pub rows: &'a [Vec<String>],
}

impl<'a> Table<'a> {
    /// Case-insensitive column lookup by header text.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    pub fn require_column(&self, file: &str, name: &str) -> Result<usize, ReconError> {
        self.column(name).ok_or_else(|| ReconError::MissingColumn {
            file: file.to_string(),
            column: name.to_string(),
        })
    }

    /// `(question number, column index)` for every `Q<n>` header, in column order.
    pub fn question_columns(&self) -> Vec<(u32, usize)> {
        self.header
            .iter()
            .enumerate()
            .filter_map(|(i, h)| {
                let caps = QUESTION_COLUMN.captures(h)?;
                let n: u32 = caps[1].parse().ok()?;
                (n >= 1).then_some((n, i))
            })
            .collect()
    }

    /// Rows with a non-empty identifying cell that is not a summary row.
    pub fn data_rows<'m>(
        &self,
        id_col: usize,
        markers: &'m [String],
    ) -> impl Iterator<Item = &'a Vec<String>> + 'm
    where
        'a: 'm,
    {
        self.rows.iter().filter(move |row| {
            let id = cell(row, id_col);
            !id.is_empty() && !is_summary_row(id, markers)
        })
    }
}

/// Cell text, or `""` past the end of a ragged row.
pub fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

/// Identifying cell contains any of `markers`, case-insensitively.
pub fn is_summary_row(id: &str, markers: &[String]) -> bool {
    let id = id.to_lowercase();
    markers.iter().any(|m| id.contains(&m.to_lowercase()))
}

/// Locate the header row by its first-cell sentinel.
pub fn find_table<'a>(
    rows: &'a [Vec<String>],
    sentinel: &str,
    file: &str,
) -> Result<(usize, Table<'a>), ReconError> {
    let idx = rows
        .iter()
        .position(|row| cell(row, 0).eq_ignore_ascii_case(sentinel))
        .ok_or_else(|| ReconError::MissingHeader {
            file: file.to_string(),
            sentinel: sentinel.to_string(),
        })?;
    Ok((
        idx,
        Table {
            header: &rows[idx],
            rows: &rows[idx + 1..],
        },
    ))
}

/// Read class/subject/period from the rows above the header.
///
/// Labelled rows win ("Class", "Class/Section", "Subject", "Month", "Date");
/// otherwise row 0 and row 1 column 1 are used positionally.
pub fn read_meta(preamble: &[Vec<String>]) -> SheetMeta {
    let mut class = None;
    let mut subject = None;
    let mut period = None;
    let mut used = Vec::new();

    for (i, row) in preamble.iter().enumerate() {
        let label = cell(row, 0).to_lowercase();
        let value = cell(row, 1);
        if value.is_empty() {
            continue;
        }
        if class.is_none() && label.contains("class") {
            class = Some(value.to_string());
        } else if subject.is_none() && label.contains("subject") {
            subject = Some(value.to_string());
        } else if period.is_none() && (label.contains("month") || label.contains("date")) {
            period = Some(value.to_string());
        } else {
            continue;
        }
        used.push(i);
    }

    // Unlabelled fields take the first two preamble rows in order, minus any
    // row a labelled field already claimed.
    let mut positional = preamble
        .iter()
        .take(2)
        .enumerate()
        .filter(|(i, _)| !used.contains(i))
        .map(|(_, row)| cell(row, 1).to_string());
    let class = class.unwrap_or_else(|| positional.next().unwrap_or_default());
    let subject = subject.unwrap_or_else(|| positional.next().unwrap_or_default());

    SheetMeta {
        class,
        subject,
        period,
    }
}
