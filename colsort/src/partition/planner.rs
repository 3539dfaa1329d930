//! Partition planning
//!
//! Every participant derives the same layout from `(n, worker_count, group_width)`.
//! Nothing about the layout travels on the wire, so this must stay a pure
//! function of its inputs.

use crate::errors::{Result, SortError};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Group width of the reference configuration
pub const DEFAULT_GROUP_WIDTH: usize = 4;

/// How the padded columns of an n×n matrix are split into groups and workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionLayout {
    /// Matrix size (rows == original columns)
    pub n: usize,

    /// Number of participants sorting groups
    pub worker_count: usize,

    /// Columns per group
    pub group_width: usize,

    /// `n` rounded up to a multiple of `group_width`
    pub padded_columns: usize,

    /// `padded_columns / worker_count`, always a positive multiple of `group_width`
    pub columns_per_worker: usize,
}

/// Compute the partition layout for an n×n matrix
///
/// # Errors
/// Returns a configuration error when no uniform partition exists: a zero
/// argument, padded columns not divisible by the worker count, or columns
/// per worker not a positive multiple of the group width.
pub fn plan(n: usize, worker_count: usize, group_width: usize) -> Result<PartitionLayout> {
    if n == 0 {
        return Err(SortError::Config("matrix size must be positive".into()));
    }
    if worker_count == 0 {
        return Err(SortError::Config("worker count must be positive".into()));
    }
    if group_width == 0 {
        return Err(SortError::Config("group width must be positive".into()));
    }

    let padded_columns = padded_columns(n, group_width);

    if padded_columns % worker_count != 0 {
        return Err(SortError::Config(format!(
            "{} padded columns can't be split evenly across {} workers",
            padded_columns, worker_count
        )));
    }

    let columns_per_worker = padded_columns / worker_count;
    if columns_per_worker == 0 || columns_per_worker % group_width != 0 {
        return Err(SortError::Config(format!(
            "{} columns per worker is not a positive multiple of group width {} (n={}, workers={})",
            columns_per_worker, group_width, n, worker_count
        )));
    }

    Ok(PartitionLayout {
        n,
        worker_count,
        group_width,
        padded_columns,
        columns_per_worker,
    })
}

/// Round `n` up to the next multiple of `group_width`
pub fn padded_columns(n: usize, group_width: usize) -> usize {
    if n % group_width == 0 {
        n
    } else {
        n + (group_width - n % group_width)
    }
}

impl PartitionLayout {
    /// Layout with the reference group width of 4
    pub fn reference(n: usize, worker_count: usize) -> Result<Self> {
        plan(n, worker_count, DEFAULT_GROUP_WIDTH)
    }

    /// Groups each worker owns
    pub fn groups_per_worker(&self) -> usize {
        self.columns_per_worker / self.group_width
    }

    /// Total number of groups, which is also the number of rounds
    pub fn group_count(&self) -> usize {
        self.padded_columns / self.group_width
    }

    /// Values carried by one group on the wire
    pub fn group_len(&self) -> usize {
        self.group_width * self.n
    }

    /// Padded column range covered by `group`
    pub fn group_columns(&self, group: usize) -> Range<usize> {
        let start = group * self.group_width;
        start..start + self.group_width
    }

    /// Rank of the participant that sorts `group`
    pub fn owner_of(&self, group: usize) -> usize {
        group / self.groups_per_worker()
    }

    /// Groups owned by `rank`, in round order
    pub fn groups_for(&self, rank: usize) -> Range<usize> {
        let per = self.groups_per_worker();
        rank * per..(rank + 1) * per
    }

    /// Whether a padded column index is synthetic padding
    pub fn is_padding(&self, column: usize) -> bool {
        column >= self.n && column < self.padded_columns
    }

    /// Number of all-zero padding columns
    pub fn padding_columns(&self) -> usize {
        self.padded_columns - self.n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_of_four_has_no_padding() {
        let layout = PartitionLayout::reference(8, 2).unwrap();
        assert_eq!(layout.padded_columns, 8);
        assert_eq!(layout.columns_per_worker, 4);
        assert_eq!(layout.padding_columns(), 0);
        assert_eq!(layout.group_count(), 2);
    }

    #[test]
    fn test_ten_by_three() {
        let layout = PartitionLayout::reference(10, 3).unwrap();
        assert_eq!(layout.padded_columns, 12);
        assert_eq!(layout.columns_per_worker, 4);
        assert_eq!(layout.groups_per_worker(), 1);
        assert_eq!(layout.padding_columns(), 2);
        assert!(layout.is_padding(10));
        assert!(layout.is_padding(11));
        assert!(!layout.is_padding(9));
        assert_eq!(layout.group_columns(2), 8..12);
        assert_eq!(layout.owner_of(2), 2);
    }

    #[test]
    fn test_multiple_groups_per_worker() {
        let layout = PartitionLayout::reference(16, 2).unwrap();
        assert_eq!(layout.columns_per_worker, 8);
        assert_eq!(layout.groups_per_worker(), 2);
        assert_eq!(layout.group_count(), 4);
        assert_eq!(layout.owner_of(0), 0);
        assert_eq!(layout.owner_of(1), 0);
        assert_eq!(layout.owner_of(3), 1);
        assert_eq!(layout.groups_for(1), 2..4);
    }

    #[test]
    fn test_non_uniform_partitions_rejected() {
        // 12 / 2 = 6 columns per worker, not a multiple of 4
        assert!(matches!(plan(10, 2, 4), Err(SortError::Config(_))));
        // 4 / 3 doesn't divide
        assert!(matches!(plan(4, 3, 4), Err(SortError::Config(_))));
        // more workers than groups
        assert!(matches!(plan(4, 2, 4), Err(SortError::Config(_))));
    }

    #[test]
    fn test_zero_arguments_rejected() {
        assert!(plan(0, 1, 4).is_err());
        assert!(plan(4, 0, 4).is_err());
        assert!(plan(4, 1, 0).is_err());
    }

    #[test]
    fn test_custom_group_width() {
        let layout = plan(10, 5, 2).unwrap();
        assert_eq!(layout.padded_columns, 10);
        assert_eq!(layout.columns_per_worker, 2);
        assert_eq!(layout.group_len(), 20);
    }

    #[test]
    fn test_plan_is_pure() {
        for n in 1..=40 {
            for workers in 1..=8 {
                for width in 1..=6 {
                    let a = plan(n, workers, width);
                    let b = plan(n, workers, width);
                    match (a, b) {
                        (Ok(a), Ok(b)) => {
                            assert_eq!(a, b);
                            assert_eq!(a.padded_columns % width, 0);
                            assert!(a.padded_columns >= n);
                            assert!(a.padded_columns < n + width);
                            assert_eq!(a.columns_per_worker % width, 0);
                        }
                        (Err(_), Err(_)) => {}
                        _ => panic!("plan({}, {}, {}) not deterministic", n, workers, width),
                    }
                }
            }
        }
    }

    #[test]
    fn test_padded_columns_always_multiple() {
        for n in 1..100 {
            let padded = padded_columns(n, 4);
            assert_eq!(padded % 4, 0);
            assert!(padded >= n);
        }
    }
}
