//! Delimited text loader for n×n input matrices

use super::Matrix;
use crate::errors::{Result, SortError};
use std::path::Path;
use tracing::{debug, info};

/// Load an n×n matrix from a delimited text file
///
/// Reads the first `n` non-blank lines and the first `n` fields of each.
/// Extra rows and fields are ignored.
///
/// # Errors
/// - `Io` if the file can't be read
/// - `Input` if there are fewer than `n` rows or fields, or a value isn't a finite number
pub fn load_matrix(path: &Path, n: usize, delimiter: char) -> Result<Matrix> {
    info!(path = %path.display(), n = n, "Loading input matrix");

    let content = std::fs::read_to_string(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Failed to read input matrix");
        e
    })?;

    let matrix = parse_matrix(&content, n, delimiter)?;
    debug!(rows = matrix.rows(), cols = matrix.cols(), "Input matrix parsed");
    Ok(matrix)
}

/// Parse an n×n matrix from delimited text
pub fn parse_matrix(content: &str, n: usize, delimiter: char) -> Result<Matrix> {
    let mut matrix = Matrix::zeros(n, n)?;
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    for row in 0..n {
        let (line_no, line) = lines.next().ok_or_else(|| {
            SortError::Input(format!("expected {} rows, found {}", n, row))
        })?;

        let mut fields = line.split(delimiter);
        for col in 0..n {
            let field = fields.next().ok_or_else(|| {
                SortError::Input(format!(
                    "line {}: expected at least {} fields, found {}",
                    line_no + 1,
                    n,
                    col
                ))
            })?;
            let value = parse_value(field.trim(), line_no + 1, col + 1)?;
            matrix.set(row, col, value);
        }
    }

    Ok(matrix)
}

fn parse_value(field: &str, line: usize, column: usize) -> Result<f64> {
    let value: f64 = field.parse().map_err(|e| {
        SortError::Input(format!(
            "line {}, column {}: invalid number {:?}: {}",
            line, column, field, e
        ))
    })?;
    if !value.is_finite() {
        return Err(SortError::Input(format!(
            "line {}, column {}: value {} is not finite",
            line, column, value
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_square() {
        let m = parse_matrix("1,2\n3,4\n", 2, ',').unwrap();
        assert_eq!(m.row(0), &[1.0, 2.0]);
        assert_eq!(m.row(1), &[3.0, 4.0]);
    }

    #[test]
    fn test_parse_ignores_extra_rows_and_fields() {
        let m = parse_matrix("1,2,99\n3,4,99\n5,6,99\n", 2, ',').unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.row(1), &[3.0, 4.0]);
    }

    #[test]
    fn test_parse_trims_whitespace_and_skips_blank_lines() {
        let m = parse_matrix(" 1.5 ; -2 \n\n3e1;4\r\n", 2, ';').unwrap();
        assert_eq!(m.row(0), &[1.5, -2.0]);
        assert_eq!(m.row(1), &[30.0, 4.0]);
    }

    #[test]
    fn test_parse_too_few_rows() {
        let err = parse_matrix("1,2\n", 2, ',').unwrap_err();
        assert!(matches!(err, SortError::Input(_)));
        assert!(err.to_string().contains("expected 2 rows"));
    }

    #[test]
    fn test_parse_too_few_fields() {
        let err = parse_matrix("1,2\n3\n", 2, ',').unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_rejects_garbage_and_non_finite() {
        assert!(parse_matrix("1,x\n3,4\n", 2, ',').is_err());
        assert!(parse_matrix("1,NaN\n3,4\n", 2, ',').is_err());
        assert!(parse_matrix("1,inf\n3,4\n", 2, ',').is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "4,3").unwrap();
        writeln!(file, "2,1").unwrap();

        let m = load_matrix(file.path(), 2, ',').unwrap();
        assert_eq!(m.column(0), vec![4.0, 2.0]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_matrix(Path::new("/nonexistent/matrix.csv"), 2, ',').unwrap_err();
        assert!(matches!(err, SortError::Io(_)));
    }
}
