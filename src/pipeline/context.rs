//! Pipeline context: channels, shared counters, and the per-worker digest-and-deliver step.

use crossbeam_channel::{Receiver, Sender, bounded, select};
use crossbeam_utils::sync::WaitGroup;
use log::trace;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use crate::engine::hashing::DigestEngine;
use crate::error::EnumerationError;
use crate::pipeline::cancel::CancellationToken;
use crate::types::{DigestResult, FileTask};

/// Enumeration outcome: number of tasks enumerated, or the terminal error.
pub type EnumerationOutcome = Result<usize, EnumerationError>;

/// Channels for one pipeline run. Results are unbuffered so a worker only hands over a result
/// when the consumer takes it; the outcome slot holds exactly one value and never blocks.
pub struct PipelineChannels {
    pub result_tx: Sender<DigestResult>,
    pub result_rx: Receiver<DigestResult>,
    pub outcome_tx: Sender<EnumerationOutcome>,
    pub outcome_rx: Receiver<EnumerationOutcome>,
}

pub fn create_pipeline_channels() -> PipelineChannels {
    let (result_tx, result_rx) = bounded::<DigestResult>(0);
    let (outcome_tx, outcome_rx) = bounded::<EnumerationOutcome>(1);
    PipelineChannels {
        result_tx,
        result_rx,
        outcome_tx,
        outcome_rx,
    }
}

/// Counters shared by the enumerator, workers, and closer. Read them for logging or to check
/// that an aborted run left nothing behind.
#[derive(Debug, Default)]
pub struct PipelineStats {
    workers_spawned: AtomicUsize,
    workers_finished: AtomicUsize,
    live_workers: AtomicUsize,
    peak_workers: AtomicUsize,
    active_digests: AtomicUsize,
    peak_digests: AtomicUsize,
    delivered: AtomicUsize,
    discarded: AtomicUsize,
    bytes: AtomicU64,
    closed: AtomicBool,
}

impl PipelineStats {
    pub fn workers_spawned(&self) -> usize {
        self.workers_spawned.load(Ordering::SeqCst)
    }

    pub fn workers_finished(&self) -> usize {
        self.workers_finished.load(Ordering::SeqCst)
    }

    /// Highest number of worker threads alive at the same time.
    pub fn peak_workers(&self) -> usize {
        self.peak_workers.load(Ordering::SeqCst)
    }

    /// Digest operations (open file handles included) in progress right now.
    pub fn active_digests(&self) -> usize {
        self.active_digests.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous digest operations seen so far.
    pub fn peak_digests(&self) -> usize {
        self.peak_digests.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    /// Results dropped because the run was cancelled before delivery.
    pub fn discarded(&self) -> usize {
        self.discarded.load(Ordering::SeqCst)
    }

    /// Bytes of successfully digested files (by enumeration size).
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::SeqCst)
    }

    /// True once the closer has released the result stream.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// True when the stream is closed and every spawned worker has terminated.
    pub fn is_quiescent(&self) -> bool {
        self.is_closed()
            && self.active_digests() == 0
            && self.workers_finished() == self.workers_spawned()
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn begin_digest(&self) -> ActiveDigest<'_> {
        let now = self.active_digests.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_digests.fetch_max(now, Ordering::SeqCst);
        ActiveDigest { stats: self }
    }
}

struct ActiveDigest<'a> {
    stats: &'a PipelineStats,
}

impl Drop for ActiveDigest<'_> {
    fn drop(&mut self) {
        self.stats.active_digests.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Held by every spawned worker for its whole life. Dropping it counts the worker as finished
/// and releases its share of the closer's wait group.
pub(crate) struct WorkerGuard {
    stats: Arc<PipelineStats>,
    _done: WaitGroup,
}

impl WorkerGuard {
    pub(crate) fn new(stats: &Arc<PipelineStats>, done: WaitGroup) -> Self {
        stats.workers_spawned.fetch_add(1, Ordering::SeqCst);
        let live = stats.live_workers.fetch_add(1, Ordering::SeqCst) + 1;
        stats.peak_workers.fetch_max(live, Ordering::SeqCst);
        Self {
            stats: Arc::clone(stats),
            _done: done,
        }
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.stats.live_workers.fetch_sub(1, Ordering::SeqCst);
        self.stats.workers_finished.fetch_add(1, Ordering::SeqCst);
    }
}

/// Everything a worker needs: the engine, the token, a result sender, and the counters.
#[derive(Clone)]
pub struct PipelineContext {
    pub engine: DigestEngine,
    pub token: CancellationToken,
    pub results: Sender<DigestResult>,
    pub stats: Arc<PipelineStats>,
}

impl PipelineContext {
    /// Digest `task` and deliver its result. Returns false when the run was cancelled and the
    /// caller should stop taking work.
    pub(crate) fn process(&self, task: FileTask) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        let outcome = {
            let _active = self.stats.begin_digest();
            self.engine.digest(&task, &self.token)
        };
        if outcome.is_ok() {
            self.stats.bytes.fetch_add(task.size_hint, Ordering::SeqCst);
        }
        self.deliver(DigestResult {
            path: task.path,
            outcome,
        })
    }

    /// Race the hand-off against cancellation; a cancelled run discards the result.
    fn deliver(&self, result: DigestResult) -> bool {
        if self.token.is_cancelled() {
            self.discard(&result);
            return false;
        }
        select! {
            send(self.results, result) -> sent => match sent {
                Ok(()) => {
                    self.stats.delivered.fetch_add(1, Ordering::SeqCst);
                    true
                }
                Err(unsent) => {
                    self.discard(&unsent.0);
                    false
                }
            },
            recv(self.token.signal()) -> _ => {
                self.stats.discarded.fetch_add(1, Ordering::SeqCst);
                false
            }
        }
    }

    fn discard(&self, result: &DigestResult) {
        trace!("discarding result for {}", result.path.display());
        self.stats.discarded.fetch_add(1, Ordering::SeqCst);
    }
}
