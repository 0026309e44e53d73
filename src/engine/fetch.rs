//! Fetch layer contract and the HTTP implementation
//!
//! The engine only talks to the [`FetchLayer`] trait: one fetch per request,
//! an admission-control signal, an outstanding-fetch count for idleness, and
//! an async close. `HttpFetchLayer` implements it on reqwest with manual
//! redirect handling: a redirect comes back as a follow-up request instead
//! of being chased inside the transport.

use crate::config::UserAgentConfig;
use crate::protocol::{FetchOutcome, Request, Response};
use crate::{EngineError, Result};
use async_trait::async_trait;
use reqwest::{header, redirect::Policy, Client, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Performs one fetch per request and reports its own load
#[async_trait]
pub trait FetchLayer: Send + Sync {
    /// Fetches one request. Suspends only at the network boundary; the
    /// dispatch loop never awaits this directly.
    async fn fetch(&self, request: Request) -> Result<FetchOutcome>;

    /// True while the concurrency ceiling is reached. The dispatch loop
    /// stops drawing new work while true and re-checks every tick.
    fn needs_slowdown(&self) -> bool;

    /// Count of currently outstanding fetches, used only for idleness
    fn active(&self) -> usize;

    /// Releases transport resources
    async fn close(&self);
}

/// Builds an HTTP client with the crawler's identity and timeouts
///
/// User agent format: `CrawlerName/Version (+ContactURL; ContactEmail)`.
/// Redirects are not followed by the client; the fetch layer surfaces them
/// as follow-up requests.
pub fn build_http_client(config: &UserAgentConfig, timeout: Duration) -> Result<Client> {
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    let client = Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()?;
    Ok(client)
}

/// HTTP fetch layer on reqwest with a fixed concurrency ceiling
pub struct HttpFetchLayer {
    client: Client,
    max_concurrent: usize,
    active: Arc<AtomicUsize>,
}

impl HttpFetchLayer {
    pub fn new(client: Client, max_concurrent: usize) -> Self {
        HttpFetchLayer {
            client,
            max_concurrent,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }
}

// Decrements the active count however the fetch ends
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        ActiveGuard(counter)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FetchLayer for HttpFetchLayer {
    async fn fetch(&self, request: Request) -> Result<FetchOutcome> {
        let _guard = ActiveGuard::new(Arc::clone(&self.active));
        let url = request.url.clone();

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url.as_str(), e))?;

        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| EngineError::BadRedirect {
                    url: url.to_string(),
                })?;
            let next = url.join(location)?;
            tracing::debug!("Redirect {} -> {}", url, next);
            return Ok(FetchOutcome::FollowUp(request.follow_up(next)));
        }

        if !status.is_success() {
            return Err(EngineError::Fetch {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| classify_error(url.as_str(), e))?;

        Ok(FetchOutcome::Page(Response {
            url: final_url,
            status: status.as_u16(),
            body,
        }))
    }

    fn needs_slowdown(&self) -> bool {
        self.active.load(Ordering::SeqCst) >= self.max_concurrent
    }

    fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        // reqwest's client releases its pool when dropped; nothing to wait on
        tracing::debug!("HTTP fetch layer closed");
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> EngineError {
    if error.is_timeout() {
        EngineError::Timeout {
            url: url.to_string(),
        }
    } else {
        EngineError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

/// True for status classes that are usually worth retrying (5xx and 429)
pub fn is_transient_status(status: u16) -> bool {
    matches!(
        StatusCode::from_u16(status),
        Ok(code) if code.is_server_error() || code == StatusCode::TOO_MANY_REQUESTS
    )
}
