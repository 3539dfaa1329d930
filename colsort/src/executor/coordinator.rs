//! Distribution rounds for the column sort
//!
//! Every participant runs the same loop, one round per column group:
//! 1. **Distribute**: the root sends group `i` to its owner (possibly itself)
//! 2. **Local sort**: the owner sorts each column of the block ascending
//! 3. **Collect**: the owner sends the sorted block back to the root
//! 4. **Barrier**: nobody starts round `i + 1` before everybody finished round `i`
//!
//! A final completion barrier runs after the last round, so the root never
//! reassembles before every round has been observed by the whole group.

use super::column_sort::sort_block;
use crate::errors::{Result, SortError};
use crate::network::{
    ColumnFrame, Communicator, FrameExpectation, FrameKind, ROOT_RANK,
};
use crate::partition::{ColumnGroup, PartitionLayout};
use crate::telemetry::RunStats;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Drives the distribute/sort/collect rounds for one participant
pub struct DistributionCoordinator {
    layout: PartitionLayout,
    stats: Arc<RunStats>,
}

impl DistributionCoordinator {
    pub fn new(layout: PartitionLayout) -> Self {
        Self {
            layout,
            stats: Arc::new(RunStats::new()),
        }
    }

    /// Share an existing stats tracker
    pub fn with_stats(mut self, stats: Arc<RunStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> &Arc<RunStats> {
        &self.stats
    }

    pub fn layout(&self) -> &PartitionLayout {
        &self.layout
    }

    /// Run every round collectively
    ///
    /// The root passes `Some(groups)` from the partitioner and gets back the
    /// sorted groups in round order. Every other participant passes `None`
    /// and gets back `None`.
    ///
    /// # Errors
    /// - `Config` if the group size disagrees with the layout or the root has no groups
    /// - any transport error from the process group (`Aborted`, `Timeout`,
    ///   `ProtocolMismatch`, ...)
    #[instrument(skip(self, comm, groups), fields(rank = comm.rank()))]
    pub async fn run(
        &self,
        comm: &mut Communicator,
        groups: Option<Vec<ColumnGroup>>,
    ) -> Result<Option<Vec<ColumnGroup>>> {
        let ctx = comm.ctx();
        let layout = self.layout;

        if ctx.world_size != layout.worker_count {
            return Err(SortError::Config(format!(
                "layout planned for {} workers, group has {} participants",
                layout.worker_count, ctx.world_size
            )));
        }

        let mut pending = if ctx.is_root() {
            let groups = groups.ok_or_else(|| {
                SortError::Config("root participant needs column groups to distribute".into())
            })?;
            if groups.len() != layout.group_count() {
                return Err(SortError::Config(format!(
                    "expected {} column groups, got {}",
                    layout.group_count(),
                    groups.len()
                )));
            }
            Some(groups.into_iter())
        } else {
            None
        };

        let mut sorted = Vec::new();
        if ctx.is_root() {
            sorted.try_reserve_exact(layout.group_count())?;
        }

        info!(
            rounds = layout.group_count(),
            group_width = layout.group_width,
            n = layout.n,
            "Starting distribution rounds"
        );

        for round in 0..layout.group_count() {
            let started = Instant::now();
            let owner = layout.owner_of(round);

            let in_flight = match pending.as_mut() {
                Some(groups) => Some(self.distribute(comm, groups.next(), round, owner).await?),
                None => None,
            };

            if ctx.rank == owner {
                self.sort_owned(comm, round).await?;
            }

            if let Some(group) = in_flight {
                sorted.push(self.collect(comm, group, round).await?);
            }

            comm.barrier().await?;
            self.stats.record_round(started.elapsed().as_micros() as u64);
            debug!(round = round, owner = owner, "Round complete");
        }

        comm.barrier().await?;
        info!(rounds = layout.group_count(), "All rounds collected");

        Ok(ctx.is_root().then_some(sorted))
    }

    /// Root: send group `round` to its owner, keeping the group for its metadata
    async fn distribute(
        &self,
        comm: &mut Communicator,
        group: Option<ColumnGroup>,
        round: usize,
        owner: usize,
    ) -> Result<ColumnGroup> {
        let group = group
            .filter(|g| g.index == round)
            .ok_or_else(|| SortError::Config(format!("column group {} is missing", round)))?;

        let frame = ColumnFrame::new(
            comm.run_id(),
            FrameKind::Distribute,
            to_u32(round, "round")?,
            to_u32(comm.rank(), "rank")?,
            to_u32(group.width(), "group width")?,
            to_u32(group.rows(), "rows")?,
            group.to_block()?,
        );

        let bytes = comm.send(owner, &frame).await?;
        self.stats.record_distribute(bytes);
        debug!(round = round, owner = owner, bytes = bytes, "Group distributed");
        Ok(group)
    }

    /// Owner: receive a block, sort each column, send it back to the root
    async fn sort_owned(&self, comm: &mut Communicator, round: usize) -> Result<()> {
        let expected = self.expectation(comm, FrameKind::Distribute, round)?;
        let mut frame = comm.recv(&expected).await?;

        sort_block(&mut frame.values, self.layout.n);
        self.stats
            .record_sort(self.layout.group_width, frame.values.len());

        let reply = ColumnFrame::new(
            frame.run_id,
            FrameKind::Collect,
            frame.round,
            to_u32(comm.rank(), "rank")?,
            frame.group_width,
            frame.rows,
            frame.values,
        );

        let bytes = comm.send(ROOT_RANK, &reply).await?;
        self.stats.record_collect(bytes);
        debug!(round = round, bytes = bytes, "Sorted block returned");
        Ok(())
    }

    /// Root: receive the sorted block for `round` and fold it into its group
    async fn collect(
        &self,
        comm: &mut Communicator,
        group: ColumnGroup,
        round: usize,
    ) -> Result<ColumnGroup> {
        let expected = self.expectation(comm, FrameKind::Collect, round)?;
        let frame = comm.recv(&expected).await?;
        group.with_block(frame.values)
    }

    fn expectation(
        &self,
        comm: &Communicator,
        kind: FrameKind,
        round: usize,
    ) -> Result<FrameExpectation> {
        // Distribute frames come from the root, collect frames from the group's owner
        let source = match kind {
            FrameKind::Distribute => ROOT_RANK,
            FrameKind::Collect => self.layout.owner_of(round),
        };
        Ok(FrameExpectation {
            run_id: comm.run_id(),
            kind,
            round: to_u32(round, "round")?,
            source_rank: to_u32(source, "rank")?,
            group_width: to_u32(self.layout.group_width, "group width")?,
            rows: to_u32(self.layout.n, "rows")?,
        })
    }
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| SortError::Config(format!("{} {} does not fit the frame header", what, value)))
}
