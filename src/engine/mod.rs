//! Engine module: dispatch, throttling, tracking, and shutdown
//!
//! This module contains the coordination core, including:
//! - The debounced dispatch loop and its event channel
//! - In-flight tracking and the closing watchdog
//! - The queue, fetch-layer, pipeline, and work-source contracts
//! - The HTTP fetch layer and default pipeline implementations

mod core;
mod debounce;
mod fetch;
mod pipeline;
mod queue;
mod source;
mod tracker;

pub use self::core::{Engine, EngineHandle};
pub use fetch::{build_http_client, is_transient_status, FetchLayer, HttpFetchLayer};
pub use pipeline::{ProcessingPipeline, ScrapeRunner};
pub use queue::{MemoryQueue, PendingQueue, PriorityQueue};
pub use source::{BootstrapSink, ConfigSource, SeedStream, WorkSource};

use crate::config::Config;
use crate::stats::EngineStats;
use crate::Result;
use std::sync::Arc;
use tracing::info;

/// Runs a complete session from a config file's engine and seed sections
///
/// Wires the HTTP fetch layer, a FIFO queue, and the default pipeline to an
/// engine, binds a work source over the configured seeds, and runs until
/// the session closes. With `close_if_idle` the session closes itself once
/// quiescent; otherwise it stays open until interrupted.
pub async fn run(config: Config, close_if_idle: bool) -> Result<Arc<EngineStats>> {
    let client = build_http_client(&config.user_agent, config.engine.request_timeout())?;
    let fetch = Arc::new(HttpFetchLayer::new(
        client,
        config.engine.max_concurrent_fetches as usize,
    ));
    let stats = Arc::new(EngineStats::new());
    let pipeline = Arc::new(ScrapeRunner::new(Arc::clone(&stats)));

    let source = ConfigSource::new(&config.user_agent.crawler_name, config.seed.clone());
    let engine = Engine::new(
        config.engine.clone(),
        fetch,
        Box::new(MemoryQueue::new()),
        pipeline,
        Arc::clone(&stats),
    );

    let handle = engine.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, closing session");
            handle.close();
        }
    });

    engine.start(Box::new(source), close_if_idle).await?;
    Ok(stats)
}
