pub mod config;
pub mod errors;
pub mod executor;
pub mod matrix;
pub mod network;
pub mod observability;
pub mod partition;
pub mod pipeline;
pub mod telemetry;

pub use config::Config;
pub use errors::{Result, SortError};
pub use executor::{sort_column, DistributionCoordinator};
pub use matrix::{format_matrix, load_matrix, Matrix, MatrixStage};
pub use network::{Communicator, GroupOptions, ParticipantContext, ProcessGroup, ROOT_RANK};
pub use observability::{init_production_logging, init_simple_logging, LogFormat};
pub use partition::{
    partition, plan, reassemble, ColumnGroup, PaddingPolicy, PartitionLayout, DEFAULT_GROUP_WIDTH,
};
pub use pipeline::{
    run_participant, sort_file, sort_matrix, MatrixSource, RootOutput, SortOutcome, SortSettings,
};
pub use telemetry::RunStats;
