//! Session lifecycle signals
//!
//! Observability collaborators can subscribe to the bus before the engine
//! starts and will see the session bind and the final teardown. Emission is
//! fire-and-forget: a bus with no subscribers drops the signal.

use crate::protocol::SessionId;
use tokio::sync::broadcast;

/// Lifecycle signals emitted at well-defined points of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    /// The engine bound a work source and entered its main loop
    Started { session: SessionId },
    /// The fetch layer has been torn down and the session is fully closed
    Closed { session: SessionId },
}

/// Broadcast bus for [`SessionSignal`]
#[derive(Debug, Clone)]
pub struct SignalBus {
    tx: broadcast::Sender<SessionSignal>,
}

impl SignalBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        SignalBus { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.tx.subscribe()
    }

    pub fn emit(&self, signal: SessionSignal) {
        // An error only means nobody is listening
        let _ = self.tx.send(signal);
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        SignalBus::new(16)
    }
}
