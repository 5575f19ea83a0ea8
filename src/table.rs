//! Tabular result-file fallback
//!
//! Batch runs cannot be queried live; the engine instead exports a
//! delimited text table of the recorded curve. The header row is matched
//! against a fixed synonym list per quantity; the matcher is a pure
//! function so the synonym list is testable without touching a file.

use std::path::Path;

use crate::error::{EngineError, ErrorKind};
use crate::results::CurvePoint;

/// Header substrings identifying the penetration/displacement column
const PENETRATION_SYNONYMS: &[&str] = &["pen", "disp", "uz"];

/// Header substrings identifying the load/force column
const LOAD_SYNONYMS: &[&str] = &["load", "force", "fz", "sumfz"];

/// Context tag for all table failures
const CONTEXT: &str = "table parsing";

/// Split one row on the file's delimiter. Tabs, semicolons and commas are
/// treated as column separators; otherwise whitespace splits.
fn split_row(line: &str) -> Vec<&str> {
    if line.contains('\t') {
        line.split('\t').map(str::trim).collect()
    } else if line.contains(';') {
        line.split(';').map(str::trim).collect()
    } else if line.contains(',') {
        line.split(',').map(str::trim).collect()
    } else {
        line.split_whitespace().collect()
    }
}

/// Identify the (penetration, load) column indices from a header row.
///
/// Case-insensitive substring match against the synonym lists; the first
/// matching column wins per quantity, and one column never serves both.
pub fn detect_columns(header: &[&str]) -> Option<(usize, usize)> {
    let lowered: Vec<String> = header.iter().map(|h| h.to_lowercase()).collect();
    let penetration = lowered
        .iter()
        .position(|h| PENETRATION_SYNONYMS.iter().any(|s| h.contains(s)))?;
    let load = lowered
        .iter()
        .enumerate()
        .position(|(i, h)| i != penetration && LOAD_SYNONYMS.iter().any(|s| h.contains(s)))?;
    Some((penetration, load))
}

/// Parse a delimited result table into curve points.
///
/// The first row must be a header with one recognizable penetration
/// column and one recognizable load column. Rows that fail numeric
/// conversion are skipped with a warning; an unreadable file or an
/// unidentifiable header is an `Output` error.
pub fn from_table(path: &Path) -> Result<Vec<CurvePoint>, EngineError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        EngineError::new(
            ErrorKind::Output,
            format!("Could not read result table '{}'", path.display()),
            e.to_string(),
            CONTEXT,
        )
    })?;

    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header_line = lines.next().ok_or_else(|| {
        EngineError::new(
            ErrorKind::Output,
            format!("Result table '{}' is empty", path.display()),
            "empty file",
            CONTEXT,
        )
    })?;

    let header = split_row(header_line);
    let (pen_col, load_col) = detect_columns(&header).ok_or_else(|| {
        EngineError::new(
            ErrorKind::Output,
            "Could not identify penetration and load columns in the result table header",
            header_line.to_string(),
            CONTEXT,
        )
    })?;

    let mut points = Vec::new();
    for (row_index, line) in lines.enumerate() {
        let cells = split_row(line);
        let parsed = cells
            .get(pen_col)
            .and_then(|c| c.parse::<f64>().ok())
            .zip(cells.get(load_col).and_then(|c| c.parse::<f64>().ok()));
        match parsed {
            Some((penetration, load)) => points.push(CurvePoint {
                penetration: penetration.abs(),
                load: load.abs(),
            }),
            None => {
                tracing::warn!(row = row_index + 2, line, "skipping unparseable table row");
            }
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_table(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_detect_columns_exact_names() {
        assert_eq!(detect_columns(&["penetration", "load"]), Some((0, 1)));
    }

    #[test]
    fn test_detect_columns_synonyms_and_case() {
        assert_eq!(detect_columns(&["Step", "Uz [m]", "SumFz [kN]"]), Some((1, 2)));
        assert_eq!(detect_columns(&["FORCE", "DISPLACEMENT"]), Some((1, 0)));
    }

    #[test]
    fn test_detect_columns_missing_either_is_none() {
        assert_eq!(detect_columns(&["step", "time"]), None);
        assert_eq!(detect_columns(&["penetration", "time"]), None);
        assert_eq!(detect_columns(&["load", "time"]), None);
    }

    #[test]
    fn test_detect_columns_one_column_never_serves_both() {
        // "uz_load" matches both synonym lists; the load column must be a
        // different index, and there is none
        assert_eq!(detect_columns(&["uz_load"]), None);
    }

    #[test]
    fn test_from_table_reference_rows() {
        let file = write_table("penetration,load\n0.0,0.0\n0.1,150.5\n");
        let points = from_table(file.path()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].load, 150.5);
        assert_eq!(points[1].penetration, 0.1);
    }

    #[test]
    fn test_from_table_unrecognizable_header_is_output_error() {
        let file = write_table("alpha,beta\n1.0,2.0\n");
        let err = from_table(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Output);
    }

    #[test]
    fn test_from_table_missing_file_is_output_error() {
        let err = from_table(Path::new("/nonexistent/results.tab")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Output);
    }

    #[test]
    fn test_from_table_skips_unparseable_rows() {
        let file = write_table("pen;force\n0.1;100.0\nbad;row\n0.2;200.0\n");
        let points = from_table(file.path()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].load, 200.0);
    }

    #[test]
    fn test_from_table_strips_signs() {
        let file = write_table("uz\tfz\n-0.1\t-100.0\n");
        let points = from_table(file.path()).unwrap();
        assert_eq!(points[0].penetration, 0.1);
        assert_eq!(points[0].load, 100.0);
    }

    #[test]
    fn test_from_table_whitespace_delimited() {
        let file = write_table("pen   load\n0.1   10.0\n");
        let points = from_table(file.path()).unwrap();
        assert_eq!(points.len(), 1);
    }
}
