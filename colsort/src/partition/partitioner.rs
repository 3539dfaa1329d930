//! Splits a matrix into fixed-width column groups

use super::planner::PartitionLayout;
use crate::errors::{Result, SortError};
use crate::matrix::{reserved, zeroed_buffer, Matrix};
use serde::{Deserialize, Serialize};

/// A bundle of exactly `group_width` columns of `n` values each
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnGroup {
    /// Group index (also the round that carries it)
    pub index: usize,

    /// Column values, one `Vec` per slot
    pub columns: Vec<Vec<f64>>,

    /// Source column of each slot, `None` for padding
    pub sources: Vec<Option<usize>>,
}

impl ColumnGroup {
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Values per column
    pub fn rows(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    /// Columns that came from the source matrix, with their column index
    pub fn data_columns(&self) -> impl Iterator<Item = (usize, &Vec<f64>)> {
        self.sources
            .iter()
            .zip(&self.columns)
            .filter_map(|(src, col)| src.map(|s| (s, col)))
    }

    /// Flatten column after column for transmission
    ///
    /// # Errors
    /// `Allocation` if the block can't be reserved.
    pub fn to_block(&self) -> Result<Vec<f64>> {
        let len = self.width().checked_mul(self.rows()).ok_or_else(|| {
            SortError::Allocation(format!("group {} block overflows usize", self.index))
        })?;
        let mut block = reserved(len)?;
        for column in &self.columns {
            block.extend_from_slice(column);
        }
        Ok(block)
    }

    /// Replace the column values from a flattened block of the same shape
    pub fn with_block(mut self, block: Vec<f64>) -> Result<Self> {
        let rows = self.rows();
        if block.len() != self.width() * rows {
            return Err(SortError::ProtocolMismatch(format!(
                "group {} expects {} values, got {}",
                self.index,
                self.width() * rows,
                block.len()
            )));
        }
        if rows > 0 {
            let mut columns = reserved(self.width())?;
            for chunk in block.chunks(rows) {
                let mut column = reserved(rows)?;
                column.extend_from_slice(chunk);
                columns.push(column);
            }
            self.columns = columns;
        }
        Ok(self)
    }
}

/// Partition an n×n matrix into column groups following `layout`
///
/// Group `g` slot `j` holds source column `g * group_width + j`, or n zeros
/// when that column is past the end of the matrix.
pub fn partition(matrix: &Matrix, layout: &PartitionLayout) -> Result<Vec<ColumnGroup>> {
    if matrix.rows() != layout.n || matrix.cols() != layout.n {
        return Err(SortError::Config(format!(
            "matrix is {}x{}, layout expects {}x{}",
            matrix.rows(),
            matrix.cols(),
            layout.n,
            layout.n
        )));
    }

    let mut groups = Vec::new();
    groups.try_reserve_exact(layout.group_count())?;

    for index in 0..layout.group_count() {
        let mut columns = reserved(layout.group_width)?;
        let mut sources = reserved(layout.group_width)?;

        for column in layout.group_columns(index) {
            if column < layout.n {
                columns.push(matrix.try_column(column)?);
                sources.push(Some(column));
            } else {
                columns.push(zeroed_buffer(layout.n)?);
                sources.push(None);
            }
        }

        groups.push(ColumnGroup {
            index,
            columns,
            sources,
        });
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::planner::plan;

    fn counting_matrix(n: usize) -> Matrix {
        let data = (0..n * n).map(|i| i as f64).collect();
        Matrix::from_vec(n, n, data).unwrap()
    }

    #[test]
    fn test_partition_shape() {
        let matrix = counting_matrix(10);
        let layout = PartitionLayout::reference(10, 3).unwrap();
        let groups = partition(&matrix, &layout).unwrap();

        assert_eq!(groups.len(), 3);
        for group in &groups {
            assert_eq!(group.width(), 4);
            assert_eq!(group.rows(), 10);
        }
    }

    #[test]
    fn test_padding_columns_are_zero() {
        let matrix = counting_matrix(10);
        let layout = PartitionLayout::reference(10, 3).unwrap();
        let groups = partition(&matrix, &layout).unwrap();

        let last = &groups[2];
        assert_eq!(last.sources, vec![Some(8), Some(9), None, None]);
        assert!(last.columns[2].iter().all(|&v| v == 0.0));
        assert!(last.columns[3].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_round_trip_reconstructs_columns() {
        for (n, workers, width) in [(10, 3, 4), (8, 2, 4), (16, 2, 4), (9, 1, 3), (7, 2, 2)] {
            let matrix = counting_matrix(n);
            let layout = plan(n, workers, width).unwrap();
            let groups = partition(&matrix, &layout).unwrap();

            let rebuilt: Vec<Vec<f64>> = groups
                .iter()
                .flat_map(|g| g.data_columns().map(|(_, c)| c.clone()))
                .collect();
            assert_eq!(rebuilt, matrix.columns(), "n={} workers={}", n, workers);

            let indices: Vec<usize> = groups
                .iter()
                .flat_map(|g| g.data_columns().map(|(i, _)| i))
                .collect();
            assert_eq!(indices, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_partition_is_deep_copy() {
        let mut matrix = counting_matrix(4);
        let layout = PartitionLayout::reference(4, 1).unwrap();
        let groups = partition(&matrix, &layout).unwrap();
        matrix.set(0, 0, -1.0);
        assert_eq!(groups[0].columns[0][0], 0.0);
    }

    #[test]
    fn test_partition_rejects_wrong_size() {
        let matrix = counting_matrix(5);
        let layout = PartitionLayout::reference(4, 1).unwrap();
        assert!(matches!(
            partition(&matrix, &layout),
            Err(SortError::Config(_))
        ));
    }

    #[test]
    fn test_block_round_trip_and_mismatch() {
        let matrix = counting_matrix(4);
        let layout = PartitionLayout::reference(4, 1).unwrap();
        let group = partition(&matrix, &layout).unwrap().remove(0);

        let block = group.to_block().unwrap();
        assert_eq!(block.len(), 16);
        assert_eq!(&block[0..4], &[0.0, 4.0, 8.0, 12.0]);

        let same = group.clone().with_block(block).unwrap();
        assert_eq!(same, group);

        assert!(matches!(
            group.with_block(vec![1.0; 3]),
            Err(SortError::ProtocolMismatch(_))
        ));
    }
}
