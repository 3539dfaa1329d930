//! Column partitioning for the distributed sort
//!
//! - `planner`: padding and group/worker arithmetic, shared by every participant
//! - `partitioner`: matrix → column groups at the root
//! - `reassembler`: sorted column groups → matrix at the root

pub mod partitioner;
pub mod planner;
pub mod reassembler;

pub use partitioner::{partition, ColumnGroup};
pub use planner::{plan, PartitionLayout, DEFAULT_GROUP_WIDTH};
pub use reassembler::{reassemble, PaddingPolicy};
