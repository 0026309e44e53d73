use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for driftnet
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub seed: Vec<SeedEntry>,
}

/// Engine coordination configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of concurrently outstanding fetches
    #[serde(rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: u32,

    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout-secs", default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Pause between declaring the session closing and tearing it down
    /// (milliseconds), absorbing requests injected by in-flight callbacks
    #[serde(rename = "grace-delay-ms", default = "default_grace_delay")]
    pub grace_delay_ms: u64,

    /// Watchdog pulse interval during the shutdown drain (milliseconds)
    #[serde(rename = "heartbeat-interval-ms", default = "default_heartbeat")]
    pub heartbeat_interval_ms: u64,
}

fn default_timeout() -> u64 {
    30
}

fn default_grace_delay() -> u64 {
    3000
}

fn default_heartbeat() -> u64 {
    5000
}

impl EngineConfig {
    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// A seed URL to feed into the engine at startup
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    pub url: String,

    /// Lower values are dispatched first by priority-aware queues
    #[serde(default)]
    pub priority: u32,
}
