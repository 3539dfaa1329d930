//! End-to-end column sort over a process group
//!
//! Each participant runs [`run_participant`]: plan the layout, let the root
//! load and partition the matrix, run the distribution rounds, and let the
//! root reassemble. [`sort_matrix`] and [`sort_file`] wire a whole group up
//! in-process and hand back the root's result.

use crate::config::Config;
use crate::errors::{Result, SortError};
use crate::executor::DistributionCoordinator;
use crate::matrix::{load_matrix, Matrix};
use crate::network::{Communicator, GroupOptions, ProcessGroup};
use crate::partition::{partition, plan, reassemble, PaddingPolicy, PartitionLayout};
use crate::telemetry::RunStats;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Where the root participant gets its input matrix
#[derive(Debug, Clone)]
pub enum MatrixSource {
    /// Delimited text file
    File { path: PathBuf, delimiter: char },
    /// Matrix already in memory
    InMemory(Matrix),
}

/// Run parameters every participant agrees on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSettings {
    pub n: usize,
    pub group_width: usize,
    pub padding: PaddingPolicy,
}

/// What the root participant ends up with
#[derive(Debug, Clone)]
pub struct RootOutput {
    pub original: Matrix,
    pub sorted: Matrix,
}

/// Result of a whole in-process run
#[derive(Debug)]
pub struct SortOutcome {
    pub layout: PartitionLayout,
    pub original: Matrix,
    pub sorted: Matrix,
    /// Per-participant stats, indexed by rank
    pub stats: Vec<Arc<RunStats>>,
}

/// Run one participant's side of the column sort
///
/// Only the root (rank 0) gets a `source`; it returns `Some(RootOutput)`.
/// Every other participant returns `None`. Any local failure aborts the
/// whole group before the error is returned, so peers stop waiting.
#[instrument(skip(comm, source, stats), fields(rank = comm.rank()))]
pub async fn run_participant(
    mut comm: Communicator,
    settings: SortSettings,
    source: Option<MatrixSource>,
    stats: Arc<RunStats>,
) -> Result<Option<RootOutput>> {
    let result = participate(&mut comm, settings, source, stats).await;

    if let Err(e) = &result {
        if !matches!(e, SortError::Aborted(_)) {
            error!(error = %e, "Participant failed");
            comm.abort(format!("rank {} failed: {}", comm.rank(), e));
        }
    }

    result
}

async fn participate(
    comm: &mut Communicator,
    settings: SortSettings,
    source: Option<MatrixSource>,
    stats: Arc<RunStats>,
) -> Result<Option<RootOutput>> {
    // Every participant checks the layout before anything is sent
    let layout = plan(settings.n, comm.world_size(), settings.group_width)?;
    let coordinator = DistributionCoordinator::new(layout).with_stats(stats);

    if !comm.ctx().is_root() {
        coordinator.run(comm, None).await?;
        return Ok(None);
    }

    let source = source.ok_or_else(|| {
        SortError::Config("root participant needs an input matrix".into())
    })?;
    let original = load_source(source, settings.n).await?;
    let groups = partition(&original, &layout)?;

    info!(
        n = layout.n,
        workers = layout.worker_count,
        padded_columns = layout.padded_columns,
        groups = groups.len(),
        "Matrix partitioned"
    );

    let sorted_groups = coordinator
        .run(comm, Some(groups))
        .await?
        .ok_or_else(|| SortError::Config("root participant collected no groups".into()))?;

    let sorted = reassemble(&sorted_groups, &layout, settings.padding)?;
    info!(
        rows = sorted.rows(),
        cols = sorted.cols(),
        padding = ?settings.padding,
        "Matrix reassembled"
    );

    Ok(Some(RootOutput { original, sorted }))
}

async fn load_source(source: MatrixSource, n: usize) -> Result<Matrix> {
    match source {
        MatrixSource::InMemory(matrix) => Ok(matrix),
        MatrixSource::File { path, delimiter } => {
            tokio::task::spawn_blocking(move || load_matrix(&path, n, delimiter))
                .await
                .map_err(|e| SortError::Io(std::io::Error::other(e)))?
        }
    }
}

/// Sort an n×n matrix with `workers` in-process participants
pub async fn sort_matrix(
    matrix: Matrix,
    workers: usize,
    group_width: usize,
    padding: PaddingPolicy,
    options: GroupOptions,
) -> Result<SortOutcome> {
    let settings = SortSettings {
        n: matrix.rows(),
        group_width,
        padding,
    };
    run_group(settings, workers, MatrixSource::InMemory(matrix), options).await
}

/// Sort the matrix a configuration points at
pub async fn sort_file(config: &Config) -> Result<SortOutcome> {
    config.validate()?;

    let settings = SortSettings {
        n: config.run.matrix_size,
        group_width: config.run.group_width,
        padding: config.run.padding,
    };
    let source = MatrixSource::File {
        path: config.input_path(),
        delimiter: config.run.delimiter,
    };
    run_group(settings, config.run.workers, source, config.group_options()).await
}

async fn run_group(
    settings: SortSettings,
    workers: usize,
    source: MatrixSource,
    options: GroupOptions,
) -> Result<SortOutcome> {
    // Fail fast with the same error every participant would raise
    let layout = plan(settings.n, workers, settings.group_width)?;

    let group = ProcessGroup::new(workers, options)?;
    info!(run_id = %group.run_id(), workers = workers, "Launching process group");

    let stats: Vec<Arc<RunStats>> = (0..workers).map(|_| Arc::new(RunStats::new())).collect();
    let task_stats = stats.clone();
    let mut source = Some(source);

    let results = group
        .launch(|comm| {
            let rank = comm.rank();
            let source = if comm.ctx().is_root() {
                source.take()
            } else {
                None
            };
            run_participant(comm, settings, source, Arc::clone(&task_stats[rank]))
        })
        .await;

    let mut root = None;
    let mut first_failure = None;
    for (rank, result) in results.into_iter().enumerate() {
        match result {
            Ok(Some(output)) => root = Some(output),
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(rank = rank, error = %e, "Participant returned an error");
                // Prefer the error that caused the abort over the aborts it caused
                let replace = match &first_failure {
                    None => true,
                    Some(SortError::Aborted(_)) => !matches!(e, SortError::Aborted(_)),
                    Some(_) => false,
                };
                if replace {
                    first_failure = Some(e);
                }
            }
        }
    }

    if let Some(e) = first_failure {
        return Err(e);
    }

    let output =
        root.ok_or_else(|| SortError::Config("root participant returned no matrix".into()))?;

    Ok(SortOutcome {
        layout,
        original: output.original,
        sorted: output.sorted,
        stats,
    })
}
