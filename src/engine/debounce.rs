//! Debounced scheduling of the dispatch loop
//!
//! Many independent events want "run the dispatch loop soon": a completed
//! fetch, a newly discovered request, the shutdown-drain pulse. Arming one
//! loop invocation per event would pile up duplicate ticks under load, so
//! the debouncer keeps at most one invocation pending at any instant.

use crate::engine::core::EngineEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Coalesces wake-up requests into at most one pending dispatch-loop tick
///
/// `schedule` arms a tick if none is armed; further calls are no-ops until
/// the engine consumes the tick with [`Debouncer::take`]. `cancel` disarms a
/// pending tick: the queued event still arrives, but `take` returns false
/// and the engine ignores it.
#[derive(Clone)]
pub(crate) struct Debouncer {
    tx: mpsc::UnboundedSender<EngineEvent>,
    armed: Arc<AtomicBool>,
}

impl Debouncer {
    pub(crate) fn new(tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Debouncer {
            tx,
            armed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Arms one dispatch-loop invocation if none is pending
    pub(crate) fn schedule(&self) {
        if !self.armed.swap(true, Ordering::SeqCst) {
            // Send failure means the engine loop has already exited
            let _ = self.tx.send(EngineEvent::Tick);
        }
    }

    /// Disarms a pending invocation if present
    pub(crate) fn cancel(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    /// Consumes the armed flag; the tick is only acted on when this is true
    pub(crate) fn take(&self) -> bool {
        self.armed.swap(false, Ordering::SeqCst)
    }
}
