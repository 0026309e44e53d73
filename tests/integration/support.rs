//! Shared test doubles for engine scenarios

use async_trait::async_trait;
use driftnet::config::EngineConfig;
use driftnet::protocol::{FetchOutcome, Request, Response, Session};
use driftnet::{EngineError, FetchLayer, WorkSource};
use driftnet::engine::SeedStream;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use url::Url;

pub fn test_engine_config() -> EngineConfig {
    EngineConfig {
        max_concurrent_fetches: 8,
        request_timeout_secs: 5,
        grace_delay_ms: 50,
        heartbeat_interval_ms: 20,
    }
}

pub fn test_url(path: &str) -> Url {
    Url::parse(&format!("https://crawl.test{}", path)).unwrap()
}

/// Fetch layer that succeeds instantly, except for configured failing paths
pub struct MockFetch {
    pub slowdown: AtomicBool,
    active: AtomicUsize,
    fail_paths: Mutex<HashSet<String>>,
}

impl MockFetch {
    pub fn new() -> Self {
        MockFetch {
            slowdown: AtomicBool::new(false),
            active: AtomicUsize::new(0),
            fail_paths: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_path(self, path: &str) -> Self {
        self.fail_paths.lock().unwrap().insert(path.to_string());
        self
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FetchLayer for MockFetch {
    async fn fetch(&self, request: Request) -> driftnet::Result<FetchOutcome> {
        self.active.fetch_add(1, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);

        let path = request.url.path().to_string();
        if self.fail_paths.lock().unwrap().contains(&path) {
            return Err(EngineError::Fetch {
                url: request.url.to_string(),
                message: "HTTP 500".to_string(),
            });
        }

        Ok(FetchOutcome::Page(Response {
            url: request.url.clone(),
            status: 200,
            body: format!("body of {}", path),
        }))
    }

    fn needs_slowdown(&self) -> bool {
        self.slowdown.load(Ordering::SeqCst)
    }

    fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    async fn close(&self) {}
}

/// Work source over a fixed list of paths
pub struct ListSource {
    paths: Vec<&'static str>,
}

impl ListSource {
    pub fn new(paths: Vec<&'static str>) -> Self {
        ListSource { paths }
    }
}

impl WorkSource for ListSource {
    fn name(&self) -> &str {
        "list"
    }

    fn seed_requests(&mut self, session: &Session) -> SeedStream {
        let session_id = session.id();
        let paths = std::mem::take(&mut self.paths);
        Box::new(
            paths
                .into_iter()
                .map(move |path| Ok(Request::new(test_url(path), session_id))),
        )
    }
}

/// Work source yielding two fixed seeds followed by an endless tail
pub struct InfiniteSource;

impl WorkSource for InfiniteSource {
    fn name(&self) -> &str {
        "infinite"
    }

    fn seed_requests(&mut self, session: &Session) -> SeedStream {
        let session_id = session.id();
        let head = ["/a", "/b"]
            .into_iter()
            .map(move |path| Ok(Request::new(test_url(path), session_id)));
        let tail = (0u64..).map(move |n| {
            Ok(Request::new(
                test_url(&format!("/n/{}", n)),
                session_id,
            ))
        });
        Box::new(head.chain(tail))
    }
}
