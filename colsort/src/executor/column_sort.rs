/// Sort one column ascending, in place
///
/// Unstable: equal values are interchangeable. `total_cmp` keeps the sort
/// total, so the count and multiset of values are always preserved.
pub fn sort_column(column: &mut [f64]) {
    column.sort_unstable_by(f64::total_cmp);
}

/// Sort every column of a flattened column block in place
///
/// The block holds columns back to back, `rows` values each.
pub fn sort_block(block: &mut [f64], rows: usize) {
    if rows == 0 {
        return;
    }
    for column in block.chunks_mut(rows) {
        sort_column(column);
    }
}

/// Check that a column is in ascending order
pub fn is_sorted_ascending(column: &[f64]) -> bool {
    column.windows(2).all(|w| w[0] <= w[1])
}
