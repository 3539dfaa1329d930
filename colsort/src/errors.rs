use thiserror::Error;

/// Errors that can occur while sorting a matrix across a process group.
#[derive(Error, Debug)]
pub enum SortError {
    /// Configuration error (no uniform partition, invalid config, shape mismatch)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error occurred (input file, config file, log directory)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input matrix file
    #[error("Input error: {0}")]
    Input(String),

    /// Backing storage for a matrix or group could not be reserved
    #[error("Allocation error: {0}")]
    Allocation(String),

    /// A participant received a frame inconsistent with the partition layout
    #[error("Protocol mismatch: {0}")]
    ProtocolMismatch(String),

    /// Frame serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// TOML deserialization error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A peer's channel closed underneath a collective call
    #[error("Transport error: {0}")]
    Transport(String),

    /// The process group was aborted by a participant
    #[error("Process group aborted: {0}")]
    Aborted(String),

    /// A collective receive did not complete in time
    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

/// Result type alias for column sort operations.
pub type Result<T> = std::result::Result<T, SortError>;

impl From<std::collections::TryReserveError> for SortError {
    fn from(e: std::collections::TryReserveError) -> Self {
        SortError::Allocation(e.to_string())
    }
}
