//! Folds sorted column groups back into a matrix

use super::partitioner::ColumnGroup;
use super::planner::PartitionLayout;
use crate::errors::{Result, SortError};
use crate::matrix::Matrix;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What to do with padding columns when reassembling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddingPolicy {
    /// Drop padding so the output is exactly n×n
    #[default]
    Truncate,
    /// Keep padding: the output is `n × padded_columns`, trailing columns are zeros
    Keep,
}

impl FromStr for PaddingPolicy {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "truncate" => Ok(PaddingPolicy::Truncate),
            "keep" => Ok(PaddingPolicy::Keep),
            other => Err(SortError::Config(format!(
                "padding policy must be 'truncate' or 'keep', got '{}'",
                other
            ))),
        }
    }
}

/// Rebuild the sorted matrix from the collected groups
///
/// Slot `j` of group `i` becomes row `j + i * group_width` of an intermediate
/// `padded_columns × n` matrix, which is then transposed back so every sorted
/// group slot is a column again.
pub fn reassemble(
    sorted_groups: &[ColumnGroup],
    layout: &PartitionLayout,
    padding: PaddingPolicy,
) -> Result<Matrix> {
    if sorted_groups.len() != layout.group_count() {
        return Err(SortError::Config(format!(
            "expected {} sorted groups, got {}",
            layout.group_count(),
            sorted_groups.len()
        )));
    }

    let mut combined = Matrix::zeros(layout.padded_columns, layout.n)?;

    for (i, group) in sorted_groups.iter().enumerate() {
        if group.width() != layout.group_width || group.rows() != layout.n {
            return Err(SortError::Config(format!(
                "group {} is {} columns x {} rows, expected {} x {}",
                i,
                group.width(),
                group.rows(),
                layout.group_width,
                layout.n
            )));
        }
        for (j, column) in group.columns.iter().enumerate() {
            combined
                .row_mut(j + i * layout.group_width)
                .copy_from_slice(column);
        }
    }

    match padding {
        PaddingPolicy::Truncate => {
            combined.truncate_rows(layout.n);
            combined.transpose_in_place()?;
            Ok(combined)
        }
        PaddingPolicy::Keep => combined.transposed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(index: usize, columns: Vec<Vec<f64>>) -> ColumnGroup {
        let sources = (0..columns.len()).map(|j| Some(index * columns.len() + j)).collect();
        ColumnGroup {
            index,
            columns,
            sources,
        }
    }

    #[test]
    fn test_reassemble_four_by_four() {
        let layout = PartitionLayout::reference(4, 1).unwrap();
        let sorted = vec![group(0, vec![vec![1.0, 2.0, 3.0, 4.0]; 4])];

        let m = reassemble(&sorted, &layout, PaddingPolicy::Truncate).unwrap();
        assert_eq!(m.rows(), 4);
        for r in 0..4 {
            assert_eq!(m.row(r), &[(r + 1) as f64; 4]);
        }
    }

    #[test]
    fn test_reassemble_columns_keep_identity() {
        let layout = PartitionLayout::reference(4, 1).unwrap();
        let sorted = vec![group(
            0,
            vec![
                vec![0.0, 1.0, 2.0, 3.0],
                vec![10.0, 11.0, 12.0, 13.0],
                vec![20.0, 21.0, 22.0, 23.0],
                vec![30.0, 31.0, 32.0, 33.0],
            ],
        )];

        let m = reassemble(&sorted, &layout, PaddingPolicy::Truncate).unwrap();
        assert_eq!(m.column(2), vec![20.0, 21.0, 22.0, 23.0]);
        assert_eq!(m.row(1), &[1.0, 11.0, 21.0, 31.0]);
    }

    #[test]
    fn test_padding_policies() {
        let layout = PartitionLayout::reference(2, 1).unwrap();
        let sorted = vec![ColumnGroup {
            index: 0,
            columns: vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![0.0; 2], vec![0.0; 2]],
            sources: vec![Some(0), Some(1), None, None],
        }];

        let truncated = reassemble(&sorted, &layout, PaddingPolicy::Truncate).unwrap();
        assert_eq!((truncated.rows(), truncated.cols()), (2, 2));
        assert_eq!(truncated.row(0), &[1.0, 3.0]);

        let kept = reassemble(&sorted, &layout, PaddingPolicy::Keep).unwrap();
        assert_eq!((kept.rows(), kept.cols()), (2, 4));
        assert_eq!(kept.row(1), &[2.0, 4.0, 0.0, 0.0]);
    }

    #[test]
    fn test_wrong_group_count() {
        let layout = PartitionLayout::reference(10, 3).unwrap();
        let sorted = vec![group(0, vec![vec![0.0; 10]; 4])];
        assert!(reassemble(&sorted, &layout, PaddingPolicy::Truncate).is_err());
    }

    #[test]
    fn test_wrong_group_shape() {
        let layout = PartitionLayout::reference(4, 1).unwrap();
        let sorted = vec![group(0, vec![vec![0.0; 3]; 4])];
        assert!(reassemble(&sorted, &layout, PaddingPolicy::Truncate).is_err());
    }

    #[test]
    fn test_padding_policy_from_str() {
        assert_eq!("keep".parse::<PaddingPolicy>().unwrap(), PaddingPolicy::Keep);
        assert_eq!(
            "TRUNCATE".parse::<PaddingPolicy>().unwrap(),
            PaddingPolicy::Truncate
        );
        assert!("clip".parse::<PaddingPolicy>().is_err());
    }
}
