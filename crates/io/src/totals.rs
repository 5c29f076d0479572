//! Totals source: one row per student with the authoritative score.

use asset_recon::{Diagnostic, DiagnosticKind, ReconError, TotalsRow, TotalsSheet};

use crate::sheet::{cell, find_table, read_meta, Extracted};

pub const HEADER_SENTINEL: &str = "Student Name";
pub const TOTAL_SCORE_COLUMN: &str = "Total Score";

/// Extract one totals file.
///
/// The score is read from the "Total Score" column as-is, never recomputed
/// from the answer cells. `total_questions` is the number of `Q<n>` columns.
pub fn extract_totals(
    file: &str,
    rows: &[Vec<String>],
    markers: &[String],
) -> Result<Extracted<TotalsSheet>, ReconError> {
    let (header_idx, table) = find_table(rows, HEADER_SENTINEL, file)?;
    let meta = read_meta(&rows[..header_idx]);
    let name_col = 0;
    let score_col = table.require_column(file, TOTAL_SCORE_COLUMN)?;
    let total_questions = table.question_columns().len() as u32;

    let mut diagnostics = Vec::new();
    let mut out = Vec::new();
    for row in table.data_rows(name_col, markers) {
        let name = cell(row, name_col);
        let raw = cell(row, score_col);
        let score = match parse_score(raw) {
            Some(s) => s,
            None => {
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticKind::ScoreCoerced,
                        format!("'{name}': total score '{raw}' is not a whole number; using 0"),
                    )
                    .in_file(file),
                );
                0
            }
        };
        out.push(TotalsRow {
            name: name.to_string(),
            score,
        });
    }

    tracing::debug!(file, rows = out.len(), total_questions, "extracted totals");

    Ok(Extracted {
        sheet: TotalsSheet {
            file: file.to_string(),
            raw_class: meta.class,
            raw_subject: meta.subject,
            total_questions,
            rows: out,
        },
        period: meta.period,
        diagnostics,
    })
}

/// Integer, or a float with no fractional part ("35.0").
fn parse_score(raw: &str) -> Option<i64> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    let f: f64 = raw.parse().ok()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::parse_rows;

    fn markers() -> Vec<String> {
        vec!["Correct Answer".into(), "Avg Section".into(), "Avg School".into()]
    }

    #[test]
    fn reads_authoritative_scores() {
        let rows = parse_rows(
            "Class,3 A\nSubject,English\nMonth,January 2026\n\n\
             Student Name,Total Score,Q1,Q2,Q3,Q4\n\
             Correct Answer,,A,B,C,D\n\
             ADIL S GUPTA,4,A,B,C,D\n\
             RIYA SEN,3.0,A,B,C,A\n\
             MEERA NAIR,abs,,,,\n\
             Avg Section Perf %,58.3,,,,\n",
        )
        .unwrap();

        let ex = extract_totals("3A_English.csv", &rows, &markers()).unwrap();
        let sheet = ex.sheet;
        assert_eq!(sheet.raw_class, "3 A");
        assert_eq!(sheet.raw_subject, "English");
        assert_eq!(sheet.total_questions, 4);
        assert_eq!(ex.period.as_deref(), Some("January 2026"));

        let scores: Vec<(&str, i64)> = sheet.rows.iter().map(|r| (r.name.as_str(), r.score)).collect();
        assert_eq!(scores, vec![("ADIL S GUPTA", 4), ("RIYA SEN", 3), ("MEERA NAIR", 0)]);

        assert_eq!(ex.diagnostics.len(), 1);
        assert_eq!(ex.diagnostics[0].kind, DiagnosticKind::ScoreCoerced);
        assert_eq!(ex.diagnostics[0].file.as_deref(), Some("3A_English.csv"));
    }

    #[test]
    fn score_is_not_recomputed_from_answers() {
        let rows = parse_rows("Student Name,Total Score,Q1,Q2\nADIL,2,0,0\n").unwrap();
        let ex = extract_totals("t.csv", &rows, &markers()).unwrap();
        assert_eq!(ex.sheet.rows[0].score, 2);
    }

    #[test]
    fn missing_total_score_column_fails_file() {
        let rows = parse_rows("Student Name,Q1\nADIL,1\n").unwrap();
        let err = extract_totals("t.csv", &rows, &markers()).unwrap_err();
        assert!(matches!(err, ReconError::MissingColumn { .. }));
    }

    #[test]
    fn fractional_score_is_coerced() {
        assert_eq!(parse_score("12"), Some(12));
        assert_eq!(parse_score("12.0"), Some(12));
        assert_eq!(parse_score("12.5"), None);
        assert_eq!(parse_score(""), None);
    }
}
