//! Column sort execution
//!
//! - `column_sort`: the local per-column sort each owner runs
//! - `coordinator`: the distribute/sort/collect rounds and their barriers
//!
//! The pipeline module wires these to the partitioner and reassembler.

pub mod column_sort;
pub mod coordinator;

pub use column_sort::{is_sorted_ascending, sort_block, sort_column};
pub use coordinator::DistributionCoordinator;
