//! Driftnet: a crawl orchestration engine
//!
//! This crate implements the coordination core of a crawler: a work source
//! produces requests, a bounded-concurrency fetch layer executes them, a
//! processing pipeline consumes the results (and may discover new requests),
//! and the engine ties it all together with backpressure, idle detection,
//! and orderly shutdown.

pub mod config;
pub mod engine;
pub mod protocol;
pub mod signals;
pub mod stats;

use thiserror::Error;

/// Main error type for driftnet operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Redirect from {url} produced no usable location")]
    BadRedirect { url: String },

    #[error("Bootstrap request failed: {0}")]
    Bootstrap(String),

    #[error("Seed source error: {0}")]
    SeedSource(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for driftnet operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use engine::{Engine, EngineHandle, FetchLayer, PendingQueue, ProcessingPipeline, WorkSource};
pub use protocol::{FetchOutcome, ParseOutput, Request, RequestId, Response, Session, SessionId};
pub use signals::{SessionSignal, SignalBus};
pub use stats::EngineStats;
