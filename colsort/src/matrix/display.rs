use super::Matrix;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Which side of the sort a printed matrix is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixStage {
    Unsorted,
    Sorted,
}

impl MatrixStage {
    pub fn label(&self) -> &'static str {
        match self {
            MatrixStage::Unsorted => "Original unsorted matrix:",
            MatrixStage::Sorted => "Sorted matrix:",
        }
    }
}

/// Format a matrix for display: a label line, one line per row with every
/// value printed to 3 decimals and followed by a space, then a blank line.
pub fn format_matrix(matrix: &Matrix, stage: MatrixStage) -> String {
    let mut out = String::new();
    out.push_str(stage.label());
    out.push('\n');
    for row in matrix.iter_rows() {
        for value in row {
            // Writing to a String can't fail
            let _ = write!(out, "{:.3} ", value);
        }
        out.push('\n');
    }
    out.push('\n');
    out
}
