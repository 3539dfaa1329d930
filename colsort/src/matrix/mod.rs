//! Dense f64 matrix plus its file loader and display formatter
//!
//! The matrix stores values row-major. Sorting happens per column, so the
//! type offers column extraction and the transposes the reassembler needs.

pub mod display;
pub mod loader;

pub use display::{format_matrix, MatrixStage};
pub use loader::{load_matrix, parse_matrix};

use crate::errors::{Result, SortError};
use serde::{Deserialize, Serialize};

/// Row-major grid of f64 values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

/// Empty vector with room for exactly `len` items, or `Allocation` if that can't be reserved.
pub(crate) fn reserved<T>(len: usize) -> Result<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)?;
    Ok(data)
}

/// Reserve a zeroed buffer, surfacing allocation failure as an error.
pub(crate) fn zeroed_buffer(len: usize) -> Result<Vec<f64>> {
    let mut data = reserved(len)?;
    data.resize(len, 0.0);
    Ok(data)
}

impl Matrix {
    /// Create a `rows × cols` matrix filled with zeros
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        let len = rows.checked_mul(cols).ok_or_else(|| {
            SortError::Allocation(format!("{}x{} matrix overflows usize", rows, cols))
        })?;
        Ok(Self {
            rows,
            cols,
            data: zeroed_buffer(len)?,
        })
    }

    /// Create a matrix from row-major data
    ///
    /// # Errors
    /// Returns a configuration error if the data length doesn't match `rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(SortError::Config(format!(
                "data length {} doesn't match {}x{} shape",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Create a matrix from a list of equally sized rows
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let row_count = rows.len();
        let col_count = rows.first().map(Vec::len).unwrap_or(0);
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != col_count) {
            return Err(SortError::Config(format!(
                "row {} has {} values, expected {}",
                idx,
                row.len(),
                col_count
            )));
        }
        Self::from_vec(row_count, col_count, rows.into_iter().flatten().collect())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Row-major backing data
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Value at `(row, col)`
    ///
    /// # Panics
    /// Panics if the index is out of bounds.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.rows && col < self.cols, "index ({}, {}) out of bounds", row, col);
        self.data[row * self.cols + col]
    }

    /// Set the value at `(row, col)`
    ///
    /// # Panics
    /// Panics if the index is out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.rows && col < self.cols, "index ({}, {}) out of bounds", row, col);
        self.data[row * self.cols + col] = value;
    }

    /// Borrow one row
    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Mutably borrow one row
    pub fn row_mut(&mut self, row: usize) -> &mut [f64] {
        let start = row * self.cols;
        &mut self.data[start..start + self.cols]
    }

    /// Iterate over rows in order
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks(0) panics, and an empty matrix has no rows anyway
        self.data.chunks(self.cols.max(1)).take(self.rows)
    }

    /// Copy one column out (deep copy)
    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.rows).map(|r| self.data[r * self.cols + col]).collect()
    }

    /// Copy one column out into freshly reserved storage
    ///
    /// # Errors
    /// `Allocation` if the column buffer can't be reserved.
    pub fn try_column(&self, col: usize) -> Result<Vec<f64>> {
        let mut column = reserved(self.rows)?;
        column.extend((0..self.rows).map(|r| self.data[r * self.cols + col]));
        Ok(column)
    }

    /// Copy every column out, in order
    pub fn columns(&self) -> Vec<Vec<f64>> {
        (0..self.cols).map(|c| self.column(c)).collect()
    }

    /// Keep only the first `rows` rows
    pub fn truncate_rows(&mut self, rows: usize) {
        if rows < self.rows {
            self.rows = rows;
            self.data.truncate(rows * self.cols);
        }
    }

    /// Transpose a square matrix in place by swapping `(r, c)` with `(c, r)` for `r < c`
    ///
    /// # Errors
    /// Returns a configuration error for non-square matrices.
    pub fn transpose_in_place(&mut self) -> Result<()> {
        if !self.is_square() {
            return Err(SortError::Config(format!(
                "in-place transpose needs a square matrix, got {}x{}",
                self.rows, self.cols
            )));
        }
        let n = self.rows;
        for r in 0..n {
            for c in (r + 1)..n {
                self.data.swap(r * n + c, c * n + r);
            }
        }
        Ok(())
    }

    /// Return the transpose of any `rows × cols` matrix
    pub fn transposed(&self) -> Result<Matrix> {
        let mut out = Matrix::zeros(self.cols, self.rows)?;
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.data[c * self.rows + r] = self.data[r * self.cols + c];
            }
        }
        Ok(out)
    }
}
