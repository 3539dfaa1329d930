//! In-process process group for the column sort collective
//!
//! Each participant runs as its own tokio task and owns:
//! - a bounded inbox of CBOR-encoded [`ColumnFrame`]s
//! - a sender into every participant's inbox (its own included)
//! - a handle on the group barrier
//! - a receiver for the group abort signal
//!
//! Every blocking call selects against the abort signal, so one failing
//! participant releases every peer instead of leaving them parked in a
//! collective call.

use super::column_protocol::{ColumnFrame, FrameExpectation};
use crate::errors::{Result, SortError};
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Barrier};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Rank of the designated root/coordinator
pub const ROOT_RANK: usize = 0;

type AbortSender = Arc<watch::Sender<Option<String>>>;

/// A participant's position in the process group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantContext {
    /// This participant's rank (0 to world_size-1)
    pub rank: usize,
    /// Total number of participants
    pub world_size: usize,
}

impl ParticipantContext {
    pub fn new(rank: usize, world_size: usize) -> Result<Self> {
        if world_size == 0 || rank >= world_size {
            return Err(SortError::Config(format!(
                "rank {} is outside a group of {}",
                rank, world_size
            )));
        }
        Ok(Self { rank, world_size })
    }

    pub fn is_root(&self) -> bool {
        self.rank == ROOT_RANK
    }
}

/// Options for building a process group
#[derive(Debug, Clone, Copy)]
pub struct GroupOptions {
    /// Capacity of each participant's inbox
    pub channel_capacity: usize,
    /// Deadline for a single receive; `None` blocks until a frame or an abort arrives
    pub recv_timeout: Option<Duration>,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            channel_capacity: 16,
            recv_timeout: None,
        }
    }
}

/// One participant's endpoint into the process group
pub struct Communicator {
    ctx: ParticipantContext,
    run_id: Uuid,
    inbox: mpsc::Receiver<Vec<u8>>,
    peers: Vec<mpsc::Sender<Vec<u8>>>,
    barrier: Arc<Barrier>,
    abort_tx: AbortSender,
    abort_rx: watch::Receiver<Option<String>>,
    recv_timeout: Option<Duration>,
}

impl Communicator {
    pub fn ctx(&self) -> ParticipantContext {
        self.ctx
    }

    pub fn rank(&self) -> usize {
        self.ctx.rank
    }

    pub fn world_size(&self) -> usize {
        self.ctx.world_size
    }

    /// Run identifier shared by the whole group
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Send a frame to `dest`, returning the encoded size in bytes
    pub async fn send(&mut self, dest: usize, frame: &ColumnFrame) -> Result<usize> {
        let peer = self.peers.get(dest).cloned().ok_or_else(|| {
            SortError::Config(format!(
                "rank {} is outside a group of {}",
                dest, self.ctx.world_size
            ))
        })?;

        let bytes = frame.to_cbor()?;
        let len = bytes.len();

        debug!(
            rank = self.ctx.rank,
            dest = dest,
            kind = ?frame.kind,
            round = frame.round,
            bytes = len,
            "Sending column frame"
        );

        tokio::select! {
            biased;
            reason = wait_for_abort(&mut self.abort_rx) => Err(SortError::Aborted(reason)),
            sent = peer.send(bytes) => sent.map(|_| len).map_err(|_| {
                SortError::Transport(format!("rank {} inbox is closed", dest))
            }),
        }
    }

    /// Receive the next frame and check it against `expected`
    ///
    /// # Errors
    /// - `Aborted` if the group is aborted while waiting
    /// - `Timeout` if a receive deadline is configured and expires
    /// - `Transport` if every sender is gone
    /// - `Serialization` / `ProtocolMismatch` for undecodable or unexpected frames
    pub async fn recv(&mut self, expected: &FrameExpectation) -> Result<ColumnFrame> {
        let rank = self.ctx.rank;
        let timeout = self.recv_timeout;
        let inbox = &mut self.inbox;
        let abort_rx = &mut self.abort_rx;

        let next = async {
            tokio::select! {
                biased;
                reason = wait_for_abort(abort_rx) => Err(SortError::Aborted(reason)),
                bytes = inbox.recv() => bytes.ok_or_else(|| {
                    SortError::Transport(format!("rank {} inbox has no senders left", rank))
                }),
            }
        };

        let bytes = match timeout {
            Some(limit) => tokio::time::timeout(limit, next)
                .await
                .map_err(|_| SortError::Timeout(limit.as_millis() as u64))??,
            None => next.await?,
        };

        let frame = ColumnFrame::from_cbor(&bytes)?;
        frame.validate(expected)?;

        debug!(
            rank = rank,
            source = frame.source_rank,
            kind = ?frame.kind,
            round = frame.round,
            "Received column frame"
        );
        Ok(frame)
    }

    /// Wait until every participant reaches this point
    pub async fn barrier(&mut self) -> Result<()> {
        let barrier = Arc::clone(&self.barrier);
        tokio::select! {
            biased;
            reason = wait_for_abort(&mut self.abort_rx) => Err(SortError::Aborted(reason)),
            _ = barrier.wait() => Ok(()),
        }
    }

    /// Abort the whole group. The first reason wins.
    pub fn abort(&self, reason: impl Into<String>) {
        raise_abort(&self.abort_tx, self.ctx.rank, reason.into());
    }

    /// Reason the group was aborted, if it was
    pub fn abort_reason(&self) -> Option<String> {
        self.abort_rx.borrow().clone()
    }
}

fn raise_abort(abort_tx: &AbortSender, rank: usize, reason: String) {
    let first = abort_tx.send_if_modified(|current| {
        if current.is_none() {
            *current = Some(reason.clone());
            true
        } else {
            false
        }
    });
    if first {
        error!(rank = rank, reason = %reason, "Aborting process group");
    }
}

async fn wait_for_abort(abort_rx: &mut watch::Receiver<Option<String>>) -> String {
    loop {
        let current = abort_rx.borrow_and_update().clone();
        if let Some(reason) = current {
            return reason;
        }
        if abort_rx.changed().await.is_err() {
            // Sender gone means nobody can abort any more
            std::future::pending::<()>().await;
        }
    }
}

/// A fixed-size group of participants wired together
pub struct ProcessGroup {
    run_id: Uuid,
    communicators: Vec<Communicator>,
    abort_tx: AbortSender,
}

impl ProcessGroup {
    /// Wire up `world_size` participants
    pub fn new(world_size: usize, options: GroupOptions) -> Result<Self> {
        if world_size == 0 {
            return Err(SortError::Config("process group needs at least one participant".into()));
        }
        if options.channel_capacity == 0 {
            return Err(SortError::Config("channel capacity must be at least 1".into()));
        }

        let run_id = Uuid::new_v4();
        let barrier = Arc::new(Barrier::new(world_size));
        let (abort_tx, abort_rx) = watch::channel(None);
        let abort_tx = Arc::new(abort_tx);

        let (senders, inboxes): (Vec<_>, Vec<_>) = (0..world_size)
            .map(|_| mpsc::channel(options.channel_capacity))
            .unzip();

        let communicators = inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| Communicator {
                ctx: ParticipantContext { rank, world_size },
                run_id,
                inbox,
                peers: senders.clone(),
                barrier: Arc::clone(&barrier),
                abort_tx: Arc::clone(&abort_tx),
                abort_rx: abort_rx.clone(),
                recv_timeout: options.recv_timeout,
            })
            .collect();

        debug!(run_id = %run_id, world_size = world_size, "Process group created");

        Ok(Self {
            run_id,
            communicators,
            abort_tx,
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn world_size(&self) -> usize {
        self.communicators.len()
    }

    /// Take the communicators to drive the participants by hand
    pub fn into_communicators(self) -> Vec<Communicator> {
        self.communicators
    }

    /// Spawn one task per participant and wait for all of them
    ///
    /// Results come back in rank order. A participant that fails with
    /// anything other than `Aborted`, or panics, aborts the group so the
    /// remaining participants return instead of waiting forever.
    pub async fn launch<F, Fut, T>(self, mut participant: F) -> Vec<Result<T>>
    where
        F: FnMut(Communicator) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let world_size = self.communicators.len();
        let abort_tx = self.abort_tx;

        let mut pending: FuturesUnordered<_> = self
            .communicators
            .into_iter()
            .enumerate()
            .map(|(rank, comm)| {
                let handle = tokio::spawn(participant(comm));
                async move { (rank, handle.await) }
            })
            .collect();

        let mut results: Vec<Option<Result<T>>> = (0..world_size).map(|_| None).collect();

        while let Some((rank, joined)) = pending.next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(rank = rank, error = %e, "Participant task did not complete");
                    Err(SortError::Aborted(format!("rank {} task failed: {}", rank, e)))
                }
            };

            // No-op when a participant already aborted with its own reason
            if let Err(e) = &result {
                raise_abort(&abort_tx, rank, format!("rank {} failed: {}", rank, e));
            }
            results[rank] = Some(result);
        }

        results.into_iter().flatten().collect()
    }
}
