//! colsort - Command Line Interface
//!
//! Sorts every column of an n×n matrix by scattering fixed-width column
//! groups over a group of in-process participants, sorting them locally and
//! gathering them back at the root.
//!
//! ## Commands
//! - `run` - Load the configured matrix, sort it, print before and after
//! - `plan` - Show the partition layout for a matrix size and worker count
//! - `init-config` - Write the default configuration file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colsort::{
    format_matrix, init_production_logging, init_simple_logging, plan, sort_file, Config,
    LogFormat, MatrixStage, PaddingPolicy, DEFAULT_GROUP_WIDTH,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Distributed column sort
#[derive(Parser, Debug)]
#[command(name = "colsort")]
#[command(about = "Sort every column of a matrix across a group of workers", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the input matrix, sort its columns and print the result
    Run {
        /// Configuration file path (default: ~/.colsort/colsort.toml when it exists)
        #[arg(short, long)]
        config: Option<String>,

        /// Input matrix file (overrides config)
        #[arg(short, long)]
        input: Option<String>,

        /// Matrix size n (overrides config)
        #[arg(short = 'n', long)]
        size: Option<usize>,

        /// Number of workers, root included (overrides config)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Columns per group (overrides config)
        #[arg(short, long)]
        group_width: Option<usize>,

        /// Keep zero padding columns in the output
        #[arg(long)]
        keep_padding: bool,

        /// Skip printing the matrices
        #[arg(short, long)]
        quiet: bool,

        /// Override log level (trace, debug, info, warn, error)
        #[arg(short, long)]
        log_level: Option<String>,
    },

    /// Show the partition layout without sorting anything
    Plan {
        /// Matrix size n
        #[arg(short = 'n', long, default_value = "10")]
        size: usize,

        /// Number of workers
        #[arg(short, long, default_value = "3")]
        workers: usize,

        /// Columns per group
        #[arg(short, long, default_value_t = DEFAULT_GROUP_WIDTH)]
        group_width: usize,
    },

    /// Write the default configuration file
    InitConfig {
        /// Where to write it (default: ~/.colsort/colsort.toml)
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            input,
            size,
            workers,
            group_width,
            keep_padding,
            quiet,
            log_level,
        } => {
            let mut config = load_config(config.as_deref())?;

            if let Some(input) = input {
                config.run.input_path = input;
            }
            if let Some(size) = size {
                config.run.matrix_size = size;
            }
            if let Some(workers) = workers {
                config.run.workers = workers;
            }
            if let Some(group_width) = group_width {
                config.run.group_width = group_width;
            }
            if keep_padding {
                config.run.padding = PaddingPolicy::Keep;
            }
            if quiet {
                config.run.print_matrices = false;
            }
            if let Some(level) = log_level {
                config.logging.level = level;
            }

            setup_logging(&config)?;
            cmd_run(config).await?;
        }

        Commands::Plan {
            size,
            workers,
            group_width,
        } => {
            // No logging for plan (pure display)
            cmd_plan(size, workers, group_width)?;
        }

        Commands::InitConfig { path, force } => {
            init_simple_logging("info", LogFormat::Pretty)?;
            cmd_init_config(path.as_deref(), force)?;
        }
    }

    Ok(())
}

/// Load the config from an explicit path, the default path, or built-in defaults
fn load_config(path: Option<&str>) -> Result<Config> {
    if let Some(path) = path {
        let expanded = shellexpand::tilde(path);
        let path = Path::new(expanded.as_ref());
        return Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let default_path = Config::default_path()?;
    if default_path.exists() {
        Config::load(&default_path)
            .with_context(|| format!("Failed to load config from {}", default_path.display()))
    } else {
        Ok(Config::default())
    }
}

fn setup_logging(config: &Config) -> Result<()> {
    let format = LogFormat::from_name(&config.logging.log_format);

    if config.logging.log_to_file {
        init_production_logging(&config.logging.level, format, Some(config.log_dir()))
    } else {
        init_simple_logging(&config.logging.level, format)
    }
}

async fn cmd_run(config: Config) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    info!(
        input = %config.input_path().display(),
        n = config.run.matrix_size,
        workers = config.run.workers,
        group_width = config.run.group_width,
        padding = ?config.run.padding,
        "Starting column sort"
    );

    let outcome = tokio::select! {
        outcome = sort_file(&config) => outcome.context("Column sort failed")?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, abandoning run");
            anyhow::bail!("interrupted");
        }
    };

    if config.run.print_matrices {
        print!("{}", format_matrix(&outcome.original, MatrixStage::Unsorted));
        print!("{}", format_matrix(&outcome.sorted, MatrixStage::Sorted));
    }

    for (rank, stats) in outcome.stats.iter().enumerate() {
        stats.print_summary(rank);
    }

    info!(
        rows = outcome.sorted.rows(),
        cols = outcome.sorted.cols(),
        "Column sort complete"
    );
    Ok(())
}

fn cmd_plan(size: usize, workers: usize, group_width: usize) -> Result<()> {
    let layout = plan(size, workers, group_width).context("No uniform partition")?;

    println!("Partition layout:");
    println!("{}", serde_json::to_string_pretty(&layout)?);
    println!();
    println!("Padding columns: {}", layout.padding_columns());
    println!("Rounds:          {}", layout.group_count());
    println!();

    for rank in 0..layout.worker_count {
        let columns: Vec<String> = layout
            .groups_for(rank)
            .map(|g| {
                let cols = layout.group_columns(g);
                format!("group {} (columns {}..{})", g, cols.start, cols.end)
            })
            .collect();
        println!("  rank {}: {}", rank, columns.join(", "));
    }

    Ok(())
}

fn cmd_init_config(path: Option<&str>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => PathBuf::from(shellexpand::tilde(path).as_ref()),
        None => Config::default_path()?,
    };

    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    Config::default()
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Generated default configuration at: {}", path.display());
    println!("\nEdit the configuration file and then sort with:");
    println!("  colsort run --config {}", path.display());
    Ok(())
}
