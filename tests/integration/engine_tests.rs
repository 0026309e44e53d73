//! End-to-end engine scenarios with mock collaborators

use crate::support::{test_engine_config, test_url, InfiniteSource, ListSource, MockFetch};
use driftnet::engine::{MemoryQueue, ScrapeRunner, SeedStream};
use driftnet::protocol::{ParseFn, ParseOutput, Request, Session};
use driftnet::{Engine, EngineError, EngineStats, SessionSignal, WorkSource};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;

fn build_engine(fetch: Arc<MockFetch>) -> (Engine, Arc<EngineStats>) {
    let stats = Arc::new(EngineStats::new());
    let pipeline = Arc::new(ScrapeRunner::new(Arc::clone(&stats)));
    let engine = Engine::new(
        test_engine_config(),
        fetch,
        Box::new(MemoryQueue::new()),
        pipeline,
        Arc::clone(&stats),
    );
    (engine, stats)
}

#[tokio::test]
async fn test_finite_crawl_closes_exactly_once() {
    let fetch = Arc::new(MockFetch::new());
    let (engine, stats) = build_engine(fetch);
    let mut signals = engine.signals().subscribe();

    let source = ListSource::new(vec!["/a", "/b"]);
    timeout(Duration::from_secs(5), engine.start(Box::new(source), true))
        .await
        .expect("engine did not close")
        .unwrap();

    assert_eq!(stats.requests_dispatched.load(Ordering::SeqCst), 2);
    assert_eq!(stats.requests_succeeded.load(Ordering::SeqCst), 2);

    assert!(matches!(
        signals.recv().await.unwrap(),
        SessionSignal::Started { .. }
    ));
    assert!(matches!(
        signals.recv().await.unwrap(),
        SessionSignal::Closed { .. }
    ));
    assert!(signals.try_recv().is_err());
}

#[tokio::test]
async fn test_fetch_failure_is_isolated() {
    let fetch = Arc::new(MockFetch::new().fail_path("/x"));
    let (engine, stats) = build_engine(fetch);

    let source = ListSource::new(vec!["/x", "/y"]);
    timeout(Duration::from_secs(5), engine.start(Box::new(source), true))
        .await
        .expect("engine did not close")
        .unwrap();

    // "/x" failed, was cleaned up, and "/y" still completed normally
    assert_eq!(stats.requests_dispatched.load(Ordering::SeqCst), 2);
    assert_eq!(stats.requests_failed.load(Ordering::SeqCst), 1);
    assert_eq!(stats.requests_succeeded.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_infinite_seeds_keep_engine_running() {
    let fetch = Arc::new(MockFetch::new());
    let (engine, stats) = build_engine(fetch);
    let mut signals = engine.signals().subscribe();
    let handle = engine.handle();

    let run = tokio::spawn(engine.start(Box::new(InfiniteSource), false));

    // Wait until well past the two fixed seeds
    timeout(Duration::from_secs(5), async {
        while stats.requests_dispatched.load(Ordering::SeqCst) < 5 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("engine stopped drawing seeds");

    assert!(matches!(
        signals.try_recv().unwrap(),
        SessionSignal::Started { .. }
    ));
    // Never reached closing on its own
    assert!(signals.try_recv().is_err());

    handle.close();
    timeout(Duration::from_secs(5), run)
        .await
        .expect("engine did not close")
        .unwrap()
        .unwrap();

    assert!(matches!(
        signals.recv().await.unwrap(),
        SessionSignal::Closed { .. }
    ));
}

#[tokio::test]
async fn test_double_close_produces_one_teardown() {
    let fetch = Arc::new(MockFetch::new());
    let (engine, _stats) = build_engine(fetch);
    let mut signals = engine.signals().subscribe();
    let handle = engine.handle();

    let run = tokio::spawn(engine.start(Box::new(ListSource::new(vec![])), false));
    tokio::time::sleep(Duration::from_millis(20)).await;

    handle.close();
    handle.close();

    timeout(Duration::from_secs(5), run)
        .await
        .expect("engine did not close")
        .unwrap()
        .unwrap();

    let mut closed = 0;
    while let Ok(signal) = signals.try_recv() {
        if matches!(signal, SessionSignal::Closed { .. }) {
            closed += 1;
        }
    }
    assert_eq!(closed, 1);
}

/// One seed whose callback discovers a second request
struct LinkedSource;

impl WorkSource for LinkedSource {
    fn name(&self) -> &str {
        "linked"
    }

    fn seed_requests(&mut self, session: &Session) -> SeedStream {
        let session_id = session.id();
        let callback: ParseFn = Arc::new(move |response| {
            let mut output = ParseOutput::default();
            output.items.push(response.url.to_string());
            if response.url.path() == "/a" {
                output
                    .requests
                    .push(Request::new(test_url("/b"), session_id));
            }
            output
        });
        Box::new(std::iter::once(Ok(
            Request::new(test_url("/a"), session_id).with_callback(callback)
        )))
    }
}

#[tokio::test]
async fn test_pipeline_discovered_request_is_crawled() {
    let fetch = Arc::new(MockFetch::new());
    let (engine, stats) = build_engine(fetch);

    timeout(
        Duration::from_secs(5),
        engine.start(Box::new(LinkedSource), true),
    )
    .await
    .expect("engine did not close")
    .unwrap();

    assert_eq!(stats.requests_dispatched.load(Ordering::SeqCst), 2);
    assert_eq!(stats.requests_succeeded.load(Ordering::SeqCst), 2);
    assert_eq!(stats.items_scraped.load(Ordering::SeqCst), 1);
}

/// Source with a bootstrap request whose callback emits one item
struct BootstrapSource {
    path: &'static str,
}

impl WorkSource for BootstrapSource {
    fn name(&self) -> &str {
        "bootstrap"
    }

    fn bootstrap_requests(&mut self, session: &Session) -> Vec<Request> {
        let callback: ParseFn = Arc::new(|response| ParseOutput {
            items: vec![format!("bootstrapped {}", response.url.path())],
            requests: Vec::new(),
        });
        vec![Request::new(test_url(self.path), session.id()).with_callback(callback)]
    }

    fn seed_requests(&mut self, session: &Session) -> SeedStream {
        let _ = session;
        Box::new(std::iter::empty())
    }
}

#[tokio::test]
async fn test_bootstrap_items_reach_the_sink() {
    let fetch = Arc::new(MockFetch::new());
    let (mut engine, _stats) = build_engine(fetch);

    let collected = Arc::new(Mutex::new(Vec::new()));
    let sink_target = Arc::clone(&collected);
    engine.set_bootstrap_sink(Box::new(move |item| {
        sink_target.lock().unwrap().push(item);
    }));

    let source = BootstrapSource { path: "/prep" };
    timeout(Duration::from_secs(5), engine.start(Box::new(source), true))
        .await
        .expect("engine did not close")
        .unwrap();

    assert_eq!(
        collected.lock().unwrap().as_slice(),
        ["bootstrapped /prep"]
    );
}

#[tokio::test]
async fn test_bootstrap_failure_aborts_startup() {
    let fetch = Arc::new(MockFetch::new().fail_path("/prep"));
    let (engine, stats) = build_engine(fetch);

    let source = BootstrapSource { path: "/prep" };
    let result = timeout(Duration::from_secs(5), engine.start(Box::new(source), true))
        .await
        .expect("startup did not settle");

    assert!(matches!(result, Err(EngineError::Bootstrap(_))));
    assert_eq!(stats.requests_dispatched.load(Ordering::SeqCst), 0);
}
