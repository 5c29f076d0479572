// Delimited-text decoding

use std::path::Path;

use asset_recon::ReconError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parsed cells of one file, row-major, every cell trimmed.
pub type Rows = Vec<Vec<String>>;

/// Read a file fully and parse it into rows with a sniffed delimiter.
pub fn read_rows(path: &Path) -> Result<Rows, ReconError> {
    let content = read_file_as_utf8(path)?;
    parse_rows(&content)
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, ReconError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ReconError::Io(format!("{}: {e}", path.display())))?;
    Ok(decode_bytes(bytes))
}

/// UTF-8 (BOM stripped) when valid, Windows-1252 otherwise.
pub fn decode_bytes(bytes: Vec<u8>) -> String {
    let bytes = if bytes.starts_with(UTF8_BOM) {
        bytes[UTF8_BOM.len()..].to_vec()
    } else {
        bytes
    };
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            // Excel exports from Windows machines
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Metadata rows are short, so score by the modal field count
        let Some((target, consistent)) = modal_count(&counts) else {
            continue;
        };
        if target <= 1 {
            continue;
        }
        let score = consistent as u64 * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Most frequent value and its frequency; ties go to the larger value.
fn modal_count(counts: &[usize]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    for &c in counts {
        let freq = counts.iter().filter(|&&x| x == c).count();
        best = match best {
            Some((bc, bf)) if bf > freq || (bf == freq && bc >= c) => Some((bc, bf)),
            _ => Some((c, freq)),
        };
    }
    best
}

/// Parse decoded text into trimmed rows. Ragged rows are kept as-is.
pub fn parse_rows(content: &str) -> Result<Rows, ReconError> {
    let delimiter = sniff_delimiter(content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| ReconError::Io(e.to_string()))?;
        rows.push(record.iter().map(|f| f.trim().to_string()).collect());
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Student Name;Total Score;Q1\nADIL;1;1\nRIYA;0;0\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "Student Name,Total Score,Q1\nADIL,1,1\nRIYA,0,0\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Student Name\tTotal Score\tQ1\nADIL\t1\t1\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_pipe_delimiter() {
        let content = "Student Name|Total Score|Q1\nADIL|1|1\n";
        assert_eq!(sniff_delimiter(content), b'|');
    }

    #[test]
    fn test_sniff_ignores_short_metadata_rows() {
        let content = "Class,3 A\nSubject,English\nMonth,January 2026\n\n\
                       Student Name,Total Score,Q1,Q2\nADIL,2,1,1\nRIYA,1,1,0\nMEERA,0,0,0\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Skill Name;Questions;Section Perf %\n\"Reading\";\"1, 2, 3\";55\nGrammar;\"4, 5\";40\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_parse_rows_trims_and_keeps_ragged_rows() {
        let rows = parse_rows("Class, 3 A \nStudent Name , Total Score,Q1\n ADIL ,1, 1\n").unwrap();
        assert_eq!(rows[0], vec!["Class", "3 A"]);
        assert_eq!(rows[1], vec!["Student Name", "Total Score", "Q1"]);
        assert_eq!(rows[2], vec!["ADIL", "1", "1"]);
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"Student Name,Total Score\n");
        let text = decode_bytes(bytes);
        assert!(text.starts_with("Student Name"));
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "José" in Windows-1252
        fs::write(&path, b"Student Name,Total Score\nJos\xE9,3\n").unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows[1][0], "José");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = read_rows(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, ReconError::Io(_)));
    }
}
