use crate::errors::{Result, SortError};
use crate::network::GroupOptions;
use crate::partition::{plan, PaddingPolicy, PartitionLayout, DEFAULT_GROUP_WIDTH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for a column sort run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub run: RunConfig,
    pub transport: TransportConfig,
    pub logging: LoggingConfig,
}

/// What to sort and how to split it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Delimited text file holding the input matrix
    pub input_path: String,
    /// Matrix size n (the input is n×n)
    pub matrix_size: usize,
    /// Number of participants, root included
    pub workers: usize,
    /// Columns per group
    pub group_width: usize,
    /// Field delimiter of the input file
    pub delimiter: char,
    /// What to do with zero padding columns in the output
    pub padding: PaddingPolicy,
    /// Print the matrix before and after sorting
    pub print_matrices: bool,
}

/// Process group settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Capacity of each participant's inbox
    pub channel_capacity: usize,
    /// Receive deadline in milliseconds; unset blocks until a frame or an abort
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_timeout_ms: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub log_format: String,
    pub log_to_file: bool,
    pub log_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            run: RunConfig {
                input_path: "10x10.csv".to_string(),
                matrix_size: 10,
                workers: 3,
                group_width: DEFAULT_GROUP_WIDTH,
                delimiter: ',',
                padding: PaddingPolicy::Truncate,
                print_matrices: true,
            },
            transport: TransportConfig {
                channel_capacity: 16,
                round_timeout_ms: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                log_format: "pretty".to_string(),
                log_to_file: false,
                log_dir: "~/.colsort/logs".to_string(),
            },
        }
    }
}

impl Config {
    /// Get default configuration file path: `~/.colsort/colsort.toml`
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| SortError::Config("Cannot determine home directory".into()))?;
        Ok(home.join(".colsort").join("colsort.toml"))
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "Loading configuration");

        let content = std::fs::read_to_string(path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to read config file");
            e
        })?;

        let config: Config = toml::from_str(&content)?;

        config.validate()?;

        tracing::info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration
    ///
    /// Includes the partition precondition, so a run that could never be
    /// split uniformly fails before any participant starts.
    pub fn validate(&self) -> Result<()> {
        if self.run.input_path.trim().is_empty() {
            return Err(SortError::Config("input_path must not be empty".into()));
        }

        if matches!(self.run.delimiter, '\n' | '\r') {
            return Err(SortError::Config(
                "delimiter must not be a line terminator".into(),
            ));
        }

        self.layout()?;

        if self.transport.channel_capacity == 0 {
            return Err(SortError::Config(
                "channel_capacity must be at least 1".into(),
            ));
        }

        if self.transport.round_timeout_ms == Some(0) {
            return Err(SortError::Config(
                "round_timeout_ms must be positive when set".into(),
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(SortError::Config(
                    "log level must be one of: trace, debug, info, warn, error".into(),
                ))
            }
        }

        match self.logging.log_format.as_str() {
            "pretty" | "json" => {}
            _ => {
                return Err(SortError::Config(
                    "log_format must be 'pretty' or 'json'".into(),
                ))
            }
        }

        Ok(())
    }

    /// Partition layout for this run
    pub fn layout(&self) -> Result<PartitionLayout> {
        plan(self.run.matrix_size, self.run.workers, self.run.group_width)
    }

    /// Process group options for this run
    pub fn group_options(&self) -> GroupOptions {
        GroupOptions {
            channel_capacity: self.transport.channel_capacity,
            recv_timeout: self.transport.round_timeout_ms.map(Duration::from_millis),
        }
    }

    /// Input path with `~` expanded
    pub fn input_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.run.input_path).as_ref())
    }

    /// Log directory with `~` expanded
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.logging.log_dir).as_ref())
    }

    /// Staging file `save` writes before renaming over `path`
    pub fn staging_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "colsort.toml".to_string());
        path.with_file_name(format!(".{}.partial", name))
    }

    /// Save configuration to file
    ///
    /// The TOML is written and synced to a hidden staging file next to
    /// `path`, then renamed over it, so a reader sees either the previous
    /// run settings or the new ones.
    pub fn save(&self, path: &Path) -> Result<()> {
        use std::io::Write;

        let toml_string = toml::to_string_pretty(self)?;
        let staging = Self::staging_path(path);

        tracing::info!(
            path = %path.display(),
            n = self.run.matrix_size,
            workers = self.run.workers,
            group_width = self.run.group_width,
            "Saving run configuration"
        );

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                tracing::error!(dir = %parent.display(), error = %e, "Cannot create colsort config directory");
                e
            })?;
        }

        let staged = std::fs::File::create(&staging).and_then(|mut file| {
            file.write_all(toml_string.as_bytes())?;
            file.sync_all()
        });
        if let Err(e) = staged {
            tracing::error!(staging = %staging.display(), error = %e, "Cannot stage run configuration");
            // Best effort: a half-written staging file is useless
            let _ = std::fs::remove_file(&staging);
            return Err(e.into());
        }

        std::fs::rename(&staging, path).map_err(|e| {
            tracing::error!(
                staging = %staging.display(),
                path = %path.display(),
                error = %e,
                "Cannot move staged configuration into place"
            );
            e
        })?;

        tracing::debug!(path = %path.display(), bytes = toml_string.len(), "Run configuration saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.run.matrix_size, 10);
        assert_eq!(config.run.workers, 3);
        assert_eq!(config.run.group_width, 4);
        assert_eq!(config.run.delimiter, ',');
        assert_eq!(config.run.padding, PaddingPolicy::Truncate);
        assert_eq!(config.transport.round_timeout_ms, None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_uniform_partition_rejected() {
        let mut config = Config::default();
        config.run.workers = 2;
        assert!(matches!(config.validate(), Err(SortError::Config(_))));
    }

    #[test]
    fn test_invalid_transport() {
        let mut config = Config::default();
        config.transport.channel_capacity = 0;
        assert!(config.validate().is_err());

        config.transport.channel_capacity = 4;
        config.transport.round_timeout_ms = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_logging() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "debug".to_string();
        config.logging.log_format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_group_options() {
        let mut config = Config::default();
        config.transport.round_timeout_ms = Some(1500);
        let options = config.group_options();
        assert_eq!(options.channel_capacity, 16);
        assert_eq!(options.recv_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("colsort.toml");

        let mut original = Config::default();
        original.run.padding = PaddingPolicy::Keep;
        original.transport.round_timeout_ms = Some(250);
        original.save(&config_path).expect("save should succeed");

        assert!(config_path.exists());

        let loaded = Config::load(&config_path).expect("load should succeed");

        assert_eq!(original.run.matrix_size, loaded.run.matrix_size);
        assert_eq!(loaded.run.padding, PaddingPolicy::Keep);
        assert_eq!(loaded.transport.round_timeout_ms, Some(250));
        assert_eq!(original.logging.level, loaded.logging.level);
    }

    #[test]
    fn test_load_without_timeout() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("colsort.toml");
        Config::default().save(&config_path).unwrap();

        let text = std::fs::read_to_string(&config_path).unwrap();
        assert!(!text.contains("round_timeout_ms"));
        assert!(text.contains("padding = \"truncate\""));

        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(loaded.transport.round_timeout_ms, None);
    }

    #[test]
    fn test_save_replaces_existing_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("runs").join("colsort.toml");

        Config::default().save(&config_path).unwrap();

        let mut wider = Config::default();
        wider.run.matrix_size = 16;
        wider.run.workers = 2;
        wider.save(&config_path).unwrap();

        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(loaded.run.matrix_size, 16);
        assert_eq!(loaded.run.workers, 2);

        let staging = Config::staging_path(&config_path);
        assert_eq!(staging.file_name().unwrap(), ".colsort.toml.partial");
        assert!(!staging.exists(), "staging file must not outlive save");
    }

    #[test]
    fn test_default_path() {
        let path = Config::default_path().unwrap();
        assert!(path.to_string_lossy().contains(".colsort"));
        assert!(path.to_string_lossy().ends_with("colsort.toml"));
    }
}
