//! Single-fire cancellation: one [`CancelSource`] owned by the coordinator, many
//! [`CancellationToken`] readers in the enumerator, workers, and broadcasters.
//!
//! Firing drops the only sender of an otherwise silent channel. Every clone of the receiver
//! then reports disconnection, so a blocked `select!` on a send can race against it, and the
//! atomic flag serves cheap polling at checkpoints.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

struct Shared {
    fired: AtomicBool,
    sender: Mutex<Option<Sender<()>>>,
}

/// Writer side. Firing is monotonic; repeated calls are no-ops.
pub struct CancelSource {
    shared: Arc<Shared>,
    signal: Receiver<()>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, rx) = bounded::<()>(0);
        Self {
            shared: Arc::new(Shared {
                fired: AtomicBool::new(false),
                sender: Mutex::new(Some(tx)),
            }),
            signal: rx,
        }
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            shared: Arc::clone(&self.shared),
            signal: self.signal.clone(),
        }
    }

    pub fn cancel(&self) {
        if self.shared.fired.swap(true, Ordering::SeqCst) {
            return;
        }
        // Dropping the sender disconnects every receiver clone.
        let sender = match self.shared.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(sender);
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.fired.load(Ordering::SeqCst)
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Reader side, cloned into every task.
#[derive(Clone)]
pub struct CancellationToken {
    shared: Arc<Shared>,
    signal: Receiver<()>,
}

impl CancellationToken {
    /// A token that never fires. For one-off engine calls outside a pipeline.
    pub fn never() -> Self {
        // The sender lives in the shared state, so it outlives the dropped source.
        CancelSource::new().token()
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.fired.load(Ordering::SeqCst)
    }

    /// Becomes ready (disconnected) once cancelled. Use in `select!` as `recv(token.signal())`.
    pub fn signal(&self) -> &Receiver<()> {
        &self.signal
    }
}
