//! Session counters
//!
//! Plain atomic counters incremented by the engine and the default pipeline,
//! logged once at session close. Readable at any time through the shared
//! `Arc<EngineStats>`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one engine session
#[derive(Debug, Default)]
pub struct EngineStats {
    /// Requests accepted by crawl() and pushed to the pending queue
    pub requests_enqueued: AtomicU64,
    /// Requests handed to the fetch layer
    pub requests_dispatched: AtomicU64,
    /// Fetches that produced a terminal response
    pub requests_succeeded: AtomicU64,
    /// Fetches that failed (isolated, never fatal)
    pub requests_failed: AtomicU64,
    /// Fetches that produced a follow-up request instead of a response
    pub follow_ups: AtomicU64,
    /// Items produced by parse callbacks
    pub items_scraped: AtomicU64,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_requests_enqueued(&self) {
        self.requests_enqueued.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_requests_dispatched(&self) {
        self.requests_dispatched.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_requests_succeeded(&self) {
        self.requests_succeeded.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_requests_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_follow_ups(&self) {
        self.follow_ups.fetch_add(1, Ordering::SeqCst);
    }

    pub fn add_items_scraped(&self, count: u64) {
        self.items_scraped.fetch_add(count, Ordering::SeqCst);
    }

    /// Logs a one-line summary of the session
    pub fn log_summary(&self) {
        tracing::info!(
            "Session stats: enqueued={}, dispatched={}, succeeded={}, failed={}, follow_ups={}, items_scraped={}",
            self.requests_enqueued.load(Ordering::SeqCst),
            self.requests_dispatched.load(Ordering::SeqCst),
            self.requests_succeeded.load(Ordering::SeqCst),
            self.requests_failed.load(Ordering::SeqCst),
            self.follow_ups.load(Ordering::SeqCst),
            self.items_scraped.load(Ordering::SeqCst),
        );
    }
}
