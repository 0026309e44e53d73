//! Configuration module for driftnet
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use driftnet::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Concurrency ceiling: {}", config.engine.max_concurrent_fetches);
//! ```

mod parser;
mod types;

// Re-export types
pub use types::{Config, EngineConfig, SeedEntry, UserAgentConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
