//! Processing pipeline contract and the default callback runner
//!
//! The engine hands each terminal response (with its originating request) to
//! the pipeline and consults `is_idle` as one of the five idleness
//! conditions. The default `ScrapeRunner` executes the request's parse
//! callback on a spawned task and feeds any follow-up requests back through
//! the engine handle.

use crate::engine::core::EngineHandle;
use crate::protocol::{Request, Response};
use crate::stats::EngineStats;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Consumes completed responses; may discover new requests
///
/// `enqueue_scrape` is always called from a deferred context, after the
/// engine has settled the in-flight bookkeeping for the originating request.
/// Implementations that report busy from `is_idle` must call
/// [`EngineHandle::nudge`] once that work drains, or a pending idle-close
/// will never be re-evaluated.
pub trait ProcessingPipeline: Send + Sync {
    fn enqueue_scrape(&self, response: Response, request: Request, engine: &EngineHandle);

    /// True when the pipeline has no in-flight work of its own
    fn is_idle(&self) -> bool;
}

/// Default pipeline: runs parse callbacks and re-injects their requests
pub struct ScrapeRunner {
    in_flight: Arc<AtomicUsize>,
    stats: Arc<EngineStats>,
}

impl ScrapeRunner {
    pub fn new(stats: Arc<EngineStats>) -> Self {
        ScrapeRunner {
            in_flight: Arc::new(AtomicUsize::new(0)),
            stats,
        }
    }
}

struct ScrapeGuard(Arc<AtomicUsize>);

impl Drop for ScrapeGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ProcessingPipeline for ScrapeRunner {
    fn enqueue_scrape(&self, response: Response, request: Request, engine: &EngineHandle) {
        // Count before spawning so an idle check between enqueue and first
        // poll of the task still sees the work
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = ScrapeGuard(Arc::clone(&self.in_flight));

        let stats = Arc::clone(&self.stats);
        let engine = engine.clone();
        tokio::spawn(async move {
            if let Some(callback) = request.callback.clone() {
                let output = callback(&response);
                stats.add_items_scraped(output.items.len() as u64);
                for item in &output.items {
                    tracing::debug!("Scraped item: {}", item);
                }
                for follow_up in output.requests {
                    engine.crawl(follow_up);
                }
            } else {
                tracing::debug!("No callback for {}, dropping response", request.url);
            }

            // The count must drop before the nudge, or the re-armed idle
            // check still sees this scrape in flight
            drop(guard);
            engine.nudge();
        });
    }

    fn is_idle(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) == 0
    }
}
