use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Parse a configured format name, falling back to pretty
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Default log directory: `~/.colsort/logs`
pub fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".colsort")
        .join("logs")
}

fn env_filter(level: &str) -> EnvFilter {
    // RUST_LOG overrides the configured level
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging with a daily rotating file plus stderr
///
/// - Daily rotating log files in `log_dir/colsort.log` (default `~/.colsort/logs`)
/// - Stderr in the requested format, so stdout stays free for matrix output
/// - Configurable via RUST_LOG environment variable
pub fn init_production_logging(
    level: &str,
    format: LogFormat,
    log_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let log_dir = log_dir.unwrap_or_else(default_log_dir);

    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "colsort.log");
    let json = format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_line_number(false)
        }))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %level,
        "File logging initialized"
    );

    Ok(())
}

/// Initialize simple logging for CLI commands (stderr only)
pub fn init_simple_logging(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let json = format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_line_number(false)
        }))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
