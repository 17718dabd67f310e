use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use crossbeam_utils::sync::WaitGroup;
use log::{debug, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::engine::hashing::DigestEngine;
use crate::error::{ConfigError, EnumerationError};
use crate::pipeline;
use crate::pipeline::cancel::CancelSource;
use crate::pipeline::context::{EnumerationOutcome, PipelineContext, PipelineStats};
use crate::pipeline::source::PathSource;
use crate::pipeline::strategy::dispatch;
use crate::types::{DigestResult, ExecutionMode};
use crate::utils::config::DIGESTERS_ENV;
use crate::utils::fd_limit::FdBudget;

/// Consumable result stream of one pipeline run.
///
/// Iterate to receive [`DigestResult`]s in completion order. Dropping the stream (or calling
/// [`close`](Self::close)) cancels the run: workers discard undelivered results and exit, and
/// enumeration stops at its next checkpoint.
pub struct DigestStream {
    results: Receiver<DigestResult>,
    outcome: Receiver<EnumerationOutcome>,
    cancel: CancelSource,
    closer: Option<JoinHandle<()>>,
    stats: Arc<PipelineStats>,
}

impl DigestStream {
    /// Shared counters for this run; stays valid after the stream is gone.
    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    /// Fire the cancellation token. No result is yielded afterwards.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop the run and return the enumeration outcome. Does not wait for in-flight digests.
    ///
    /// After a full drain this is the number of enumerated files, or the enumeration error
    /// that ended the walk early.
    pub fn close(mut self) -> EnumerationOutcome {
        self.cancel.cancel();
        self.take_outcome()
    }

    /// Like [`close`](Self::close), then block until every worker has terminated and the
    /// result stream is released.
    pub fn wait(mut self) -> EnumerationOutcome {
        self.cancel.cancel();
        let outcome = self.take_outcome();
        if let Some(closer) = self.closer.take()
            && closer.join().is_err()
        {
            warn!("closer thread panicked");
        }
        outcome
    }

    fn take_outcome(&mut self) -> EnumerationOutcome {
        // A missing outcome means the enumeration thread died before reporting.
        self.outcome.recv().unwrap_or(Err(EnumerationError::Cancelled))
    }
}

impl Iterator for DigestStream {
    type Item = DigestResult;

    fn next(&mut self) -> Option<DigestResult> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.results.recv().ok()
    }
}

impl Drop for DigestStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start the enumerate → digest → deliver pipeline and return its result stream.
///
/// Fails only on invalid configuration; enumeration and per-file errors arrive through the
/// stream.
pub fn run_pipeline(
    source: PathSource,
    engine: DigestEngine,
    mode: ExecutionMode,
    digesters: usize,
) -> Result<DigestStream> {
    if mode == ExecutionMode::Bounded {
        check_digesters(digesters)?;
    }
    debug!(
        "pipeline: {} mode={} digesters={} algorithms={:?}",
        source.describe(),
        mode,
        digesters,
        engine.algorithms()
    );

    let cancel = CancelSource::new();
    let channels = pipeline::create_pipeline_channels();
    let stats = Arc::new(PipelineStats::default());
    let done = WaitGroup::new();

    let ctx = PipelineContext {
        engine,
        token: cancel.token(),
        results: channels.result_tx.clone(),
        stats: Arc::clone(&stats),
    };

    let closer = spawn_closer(done.clone(), channels.result_tx, Arc::clone(&stats))
        .context("could not start the pipeline closer thread")?;
    spawn_enumerator(source, mode, digesters, ctx, done, channels.outcome_tx)
        .context("could not start the enumeration thread")?;

    Ok(DigestStream {
        results: channels.result_rx,
        outcome: channels.outcome_rx,
        cancel,
        closer: Some(closer),
        stats,
    })
}

fn check_digesters(digesters: usize) -> Result<()> {
    if digesters == 0 {
        return Err(ConfigError::Digesters {
            name: DIGESTERS_ENV,
            value: digesters.to_string(),
        }
        .into());
    }
    if let Some(budget) = FdBudget::detect()
        && !budget.admits(digesters)
    {
        warn!(
            "{} digesters exceed the open-file budget ({} of soft limit {}); expect EMFILE errors",
            digesters,
            budget.max_digesters(),
            budget.soft_limit()
        );
    }
    Ok(())
}

/// Enumeration thread: dispatch every task, release its own share of the wait group, then
/// publish the outcome in the single-slot channel.
fn spawn_enumerator(
    source: PathSource,
    mode: ExecutionMode,
    digesters: usize,
    ctx: PipelineContext,
    done: WaitGroup,
    outcome_tx: Sender<EnumerationOutcome>,
) -> std::io::Result<()> {
    thread::Builder::new().name("xhash-enumerate".to_string()).spawn(move || {
        let outcome = dispatch(&source, mode, digesters, &ctx, &done);
        match &outcome {
            Ok(count) => debug!("enumeration finished: {} file(s)", count),
            Err(err) => debug!("enumeration stopped: {}", err),
        }
        drop(ctx);
        drop(done);
        // Buffered slot, read at most once; never blocks.
        let _ = outcome_tx.send(outcome);
    })?;
    Ok(())
}

/// Closer thread: once enumeration and every worker are done, drop the last result sender so
/// the consumer's iteration ends.
fn spawn_closer(
    done: WaitGroup,
    result_tx: Sender<DigestResult>,
    stats: Arc<PipelineStats>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new().name("xhash-closer".to_string()).spawn(move || {
        done.wait();
        drop(result_tx);
        stats.mark_closed();
        debug!(
            "pipeline closed: {} delivered, {} discarded, {} bytes, peak {} concurrent digest(s)",
            stats.delivered(),
            stats.discarded(),
            stats.bytes(),
            stats.peak_digests()
        );
    })
}
