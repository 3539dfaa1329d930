pub mod stats;

pub use stats::RunStats;
