//! Execution strategies: how enumerated tasks are handed to digest workers.
//!
//! All three run on the enumeration thread and return the same [`EnumerationOutcome`]:
//! - serial digests inline, one file at a time;
//! - parallel spawns one worker per file, throttled to [`parallel_worker_cap`] live workers;
//! - bounded feeds a fixed pool through a rendezvous channel, so enumeration waits while
//!   every worker is busy.

use crossbeam_channel::{Receiver, bounded, select};
use crossbeam_utils::sync::WaitGroup;
use log::debug;
use std::thread;

use crate::error::EnumerationError;
use crate::pipeline::context::{EnumerationOutcome, PipelineContext, WorkerGuard};
use crate::pipeline::source::PathSource;
use crate::types::{ExecutionMode, FileTask};
use crate::utils::config::MAX_PARALLEL_WORKERS;
use crate::utils::fd_limit::FdBudget;

/// Live-worker ceiling for parallel mode: [`MAX_PARALLEL_WORKERS`], lowered to the open-file
/// budget when one is known.
pub fn parallel_worker_cap() -> usize {
    FdBudget::detect().map_or(MAX_PARALLEL_WORKERS, |budget| {
        MAX_PARALLEL_WORKERS.min(budget.max_digesters())
    })
}

/// One slot of the parallel-mode throttle, freed when the worker holding it exits.
struct Permit(Receiver<()>);

impl Drop for Permit {
    fn drop(&mut self) {
        let _ = self.0.try_recv();
    }
}

fn spawn_worker<F>(work: F) -> Result<(), EnumerationError>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name("xhash-digest".to_string())
        .spawn(work)
        .map(drop)
        .map_err(|source| EnumerationError::Spawn { source })
}

/// Enumerate `source` and dispatch every task according to `mode`. Workers hold clones of
/// `done` until they terminate.
pub fn dispatch(
    source: &PathSource,
    mode: ExecutionMode,
    digesters: usize,
    ctx: &PipelineContext,
    done: &WaitGroup,
) -> EnumerationOutcome {
    match mode {
        ExecutionMode::Serial => run_serial(source, ctx),
        ExecutionMode::Parallel => run_parallel(source, ctx, done),
        ExecutionMode::Bounded => run_bounded(source, digesters, ctx, done),
    }
}

fn run_serial(source: &PathSource, ctx: &PipelineContext) -> EnumerationOutcome {
    let mut count = 0_usize;
    for item in source.tasks() {
        if ctx.token.is_cancelled() {
            return Err(EnumerationError::Cancelled);
        }
        let task = item?;
        count += 1;
        if !ctx.process(task) {
            return Err(EnumerationError::Cancelled);
        }
    }
    Ok(count)
}

fn run_parallel(source: &PathSource, ctx: &PipelineContext, done: &WaitGroup) -> EnumerationOutcome {
    let cap = parallel_worker_cap();
    let (slot_tx, slot_rx) = bounded::<()>(cap);
    debug!("parallel mode: at most {} live workers", cap);

    let mut count = 0_usize;
    for item in source.tasks() {
        if ctx.token.is_cancelled() {
            return Err(EnumerationError::Cancelled);
        }
        let task = item?;
        count += 1;
        // Blocks while `cap` workers still hold undelivered results.
        select! {
            send(slot_tx, ()) -> sent => {
                if sent.is_err() {
                    return Err(EnumerationError::Cancelled);
                }
            },
            recv(ctx.token.signal()) -> _ => return Err(EnumerationError::Cancelled),
        }
        let permit = Permit(slot_rx.clone());
        let guard = WorkerGuard::new(&ctx.stats, done.clone());
        let ctx = ctx.clone();
        spawn_worker(move || {
            // Locals drop in reverse: the result sender, then the guard, then the slot.
            let _permit = permit;
            let _guard = guard;
            let ctx = ctx;
            ctx.process(task);
        })?;
    }
    Ok(count)
}

fn run_bounded(
    source: &PathSource,
    digesters: usize,
    ctx: &PipelineContext,
    done: &WaitGroup,
) -> EnumerationOutcome {
    let (task_tx, task_rx) = bounded::<FileTask>(0);
    for _ in 0..digesters {
        let guard = WorkerGuard::new(&ctx.stats, done.clone());
        let task_rx = task_rx.clone();
        let ctx = ctx.clone();
        spawn_worker(move || {
            let _guard = guard;
            let ctx = ctx;
            loop {
                select! {
                    recv(task_rx) -> task => match task {
                        Ok(task) => {
                            if !ctx.process(task) {
                                break;
                            }
                        }
                        // Enumeration finished and dropped the sender.
                        Err(_) => break,
                    },
                    recv(ctx.token.signal()) -> _ => break,
                }
            }
        })?;
    }
    drop(task_rx);
    debug!("bounded pool started with {} digesters", digesters);

    let mut count = 0_usize;
    for item in source.tasks() {
        let task = item?;
        count += 1;
        select! {
            send(task_tx, task) -> sent => {
                if sent.is_err() {
                    return Err(EnumerationError::Cancelled);
                }
            },
            recv(ctx.token.signal()) -> _ => return Err(EnumerationError::Cancelled),
        }
    }
    Ok(count)
}
