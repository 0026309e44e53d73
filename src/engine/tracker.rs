//! In-flight request tracking and the closing flag
//!
//! The tracker owns the set of requests currently between dispatch and
//! completion, the session's one-way closing flag, and the watchdog pulse
//! that keeps the dispatch loop draining once shutdown has begun.

use crate::engine::core::EngineEvent;
use crate::engine::debounce::Debouncer;
use crate::protocol::RequestId;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;

pub(crate) struct InFlightTracker {
    in_progress: HashSet<RequestId>,
    closing: bool,
    debouncer: Debouncer,
}

impl InFlightTracker {
    pub(crate) fn new(debouncer: Debouncer) -> Self {
        InFlightTracker {
            in_progress: HashSet::new(),
            closing: false,
            debouncer,
        }
    }

    /// Records a request entering flight. Paired with exactly one
    /// `remove_request` per request, whatever the outcome.
    pub(crate) fn add_request(&mut self, id: RequestId) {
        let inserted = self.in_progress.insert(id);
        debug_assert!(inserted, "request {:?} tracked twice", id);
    }

    /// Records a request leaving flight and re-evaluates whether a pending
    /// shutdown can now complete.
    pub(crate) fn remove_request(&mut self, id: RequestId) {
        let removed = self.in_progress.remove(&id);
        debug_assert!(removed, "request {:?} was not in flight", id);
        self.maybe_stop();
    }

    /// Marks the session closing. One-way: never reverts.
    pub(crate) fn close(&mut self) {
        self.closing = true;
        self.maybe_stop();
    }

    pub(crate) fn is_closing(&self) -> bool {
        self.closing
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_progress.len()
    }

    /// Starts the periodic pulse. The pulse only re-arms the dispatch loop
    /// while the session is closing; normal operation relies entirely on
    /// event-driven wakeups. The task exits once the engine loop is gone.
    pub(crate) fn start_watchdog(
        &self,
        interval: Duration,
        tx: mpsc::UnboundedSender<EngineEvent>,
    ) {
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.tick().await;
            loop {
                timer.tick().await;
                if tx.send(EngineEvent::Heartbeat).is_err() {
                    break;
                }
            }
        });
    }

    /// Once closing and fully drained, the pending dispatch tick serves no
    /// purpose; disarm it so teardown is not re-scheduled.
    fn maybe_stop(&mut self) {
        if self.closing && self.in_progress.is_empty() {
            self.debouncer.cancel();
        }
    }
}
