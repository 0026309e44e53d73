//! The engine: dispatch loop, idle detection, and shutdown sequencing
//!
//! All coordination state (the pending queue, the in-flight sets, the
//! debouncer) lives on the engine task and is mutated only there. Spawned
//! fetches, pipeline tasks, and external callers communicate exclusively by
//! posting events onto the engine's channel, so the bookkeeping needs no
//! locks and the dispatch loop's invocations are strictly serialized.

use crate::config::EngineConfig;
use crate::engine::debounce::Debouncer;
use crate::engine::fetch::FetchLayer;
use crate::engine::pipeline::ProcessingPipeline;
use crate::engine::queue::PendingQueue;
use crate::engine::source::{BootstrapSink, SeedStream, WorkSource};
use crate::engine::tracker::InFlightTracker;
use crate::protocol::{FetchOutcome, Request, RequestId, Response, Session};
use crate::signals::{SessionSignal, SignalBus};
use crate::stats::EngineStats;
use crate::{EngineError, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Engine lifecycle: no transition skips a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Created,
    Running,
    Closing,
    Closed,
}

/// Events posted to the engine task
pub(crate) enum EngineEvent {
    /// Debounced dispatch-loop invocation
    Tick,
    /// A spawned fetch finished, with whatever it produced
    FetchDone {
        request: Request,
        outcome: Result<FetchOutcome>,
    },
    /// Route a settled response to the pipeline
    Scrape { response: Response, request: Request },
    /// A new request from outside the dispatch loop
    Crawl { request: Request },
    /// Re-arm the dispatch loop (e.g. pipeline work drained)
    Nudge,
    /// Watchdog pulse
    Heartbeat,
    /// External shutdown request
    CloseRequested,
    /// Grace delay elapsed; tear the session down
    Teardown,
    Pause,
    Unpause,
}

/// Cheap cloneable handle for injecting requests and driving shutdown
/// from outside the engine task
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineHandle {
    /// Feeds a request into the engine. Silently dropped if the session has
    /// already fully closed (late pipeline discoveries race teardown).
    pub fn crawl(&self, request: Request) {
        if self.tx.send(EngineEvent::Crawl { request }).is_err() {
            debug!("Engine gone, dropping late request");
        }
    }

    /// Requests an orderly shutdown. Calling this on an engine that never
    /// ran or has already closed is a programming error.
    pub fn close(&self) {
        self.tx
            .send(EngineEvent::CloseRequested)
            .unwrap_or_else(|_| panic!("Engine not running"));
    }

    /// Re-arms the dispatch loop. Pipelines call this when their in-flight
    /// work drains so a pending idle-close is re-evaluated.
    pub fn nudge(&self) {
        let _ = self.tx.send(EngineEvent::Nudge);
    }

    /// Suspends the dispatch loop; queued and in-flight work is unaffected
    pub fn pause(&self) {
        let _ = self.tx.send(EngineEvent::Pause);
    }

    /// Resumes the dispatch loop
    pub fn unpause(&self) {
        let _ = self.tx.send(EngineEvent::Unpause);
    }
}

/// The crawl orchestration engine
///
/// Construct with the collaborators, optionally subscribe to
/// [`Engine::signals`], then consume it with [`Engine::start`].
pub struct Engine {
    config: EngineConfig,
    fetch: Arc<dyn FetchLayer>,
    queue: Box<dyn PendingQueue>,
    pipeline: Arc<dyn ProcessingPipeline>,
    signals: SignalBus,
    stats: Arc<EngineStats>,
    tx: mpsc::UnboundedSender<EngineEvent>,
    rx: mpsc::UnboundedReceiver<EngineEvent>,
    debouncer: Debouncer,
    tracker: InFlightTracker,
    /// Dispatch-local set of requests handed to the fetch layer
    downloading: HashSet<RequestId>,
    seeds: Option<SeedStream>,
    session: Option<Session>,
    state: EngineState,
    close_if_idle: bool,
    paused: bool,
    bootstrap_sink: Option<BootstrapSink>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        fetch: Arc<dyn FetchLayer>,
        queue: Box<dyn PendingQueue>,
        pipeline: Arc<dyn ProcessingPipeline>,
        stats: Arc<EngineStats>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::new(tx.clone());
        let tracker = InFlightTracker::new(debouncer.clone());
        Engine {
            config,
            fetch,
            queue,
            pipeline,
            signals: SignalBus::default(),
            stats,
            tx,
            rx,
            debouncer,
            tracker,
            downloading: HashSet::new(),
            seeds: None,
            session: None,
            state: EngineState::Created,
            close_if_idle: true,
            paused: false,
            bootstrap_sink: None,
        }
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn signals(&self) -> &SignalBus {
        &self.signals
    }

    /// Receives the item output of bootstrap-request callbacks
    pub fn set_bootstrap_sink(&mut self, sink: BootstrapSink) {
        self.bootstrap_sink = Some(sink);
    }

    /// Binds the work source and runs the session to completion
    ///
    /// With `close_if_idle` the engine tears itself down once the session
    /// is globally quiescent; otherwise it runs until [`EngineHandle::close`].
    pub async fn start(mut self, mut source: Box<dyn WorkSource>, close_if_idle: bool) -> Result<()> {
        assert!(
            self.state == EngineState::Created,
            "Engine already started"
        );

        let session = Session::new(source.name());
        info!("Session started: {}", session);
        self.state = EngineState::Running;
        self.close_if_idle = close_if_idle;
        self.signals.emit(SessionSignal::Started {
            session: session.id(),
        });

        self.run_bootstrap(source.as_mut(), &session).await?;

        self.seeds = Some(source.seed_requests(&session));
        self.session = Some(session);

        self.tracker
            .start_watchdog(self.config.heartbeat_interval(), self.tx.clone());
        self.debouncer.schedule();

        loop {
            let event = match self.rx.recv().await {
                Some(event) => event,
                None => break,
            };
            self.handle_event(event).await;
            if self.state == EngineState::Closed {
                break;
            }
        }

        Ok(())
    }

    /// Drains the source's preparatory requests sequentially, before the
    /// main loop. Any failure is fatal to session startup.
    async fn run_bootstrap(&mut self, source: &mut dyn WorkSource, session: &Session) -> Result<()> {
        let requests = source.bootstrap_requests(session);
        if requests.is_empty() {
            return Ok(());
        }

        info!("Draining {} bootstrap requests", requests.len());
        for request in requests {
            assert_eq!(
                request.session(),
                session.id(),
                "Bootstrap request for foreign session: {:?}",
                request
            );

            let outcome = self
                .fetch
                .fetch(request.clone())
                .await
                .map_err(|e| EngineError::Bootstrap(e.to_string()))?;

            let response = match outcome {
                FetchOutcome::Page(response) => response,
                FetchOutcome::FollowUp(_) => {
                    return Err(EngineError::Bootstrap(format!(
                        "bootstrap fetch for {} did not produce a terminal response",
                        request.url
                    )));
                }
            };

            if let Some(callback) = &request.callback {
                let output = callback(&response);
                if let Some(sink) = self.bootstrap_sink.as_mut() {
                    for item in output.items {
                        sink(item);
                    }
                }
            }
        }
        Ok(())
    }

    async fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Tick => {
                if self.debouncer.take() {
                    self.dispatch();
                }
            }
            EngineEvent::FetchDone { request, outcome } => {
                self.on_fetch_done(request, outcome);
            }
            EngineEvent::Scrape { response, request } => {
                let handle = self.handle();
                self.pipeline.enqueue_scrape(response, request, &handle);
            }
            EngineEvent::Crawl { request } => {
                self.crawl(request);
            }
            EngineEvent::Nudge => {
                self.debouncer.schedule();
            }
            EngineEvent::Heartbeat => {
                // The pulse only nudges the loop during the shutdown drain;
                // normal operation is purely event-driven
                if self.tracker.is_closing() {
                    self.debouncer.schedule();
                }
            }
            EngineEvent::CloseRequested => {
                self.begin_close("shutdown");
            }
            EngineEvent::Teardown => {
                self.teardown().await;
            }
            EngineEvent::Pause => {
                self.paused = true;
            }
            EngineEvent::Unpause => {
                self.paused = false;
                self.debouncer.schedule();
            }
        }
    }

    /// One dispatch-loop invocation
    ///
    /// Re-entrant safe: re-evaluates current state every time it runs and
    /// assumes nothing survived from the previous invocation.
    fn dispatch(&mut self) {
        if self.paused || self.state == EngineState::Closed {
            return;
        }

        // Drain the queue up to the concurrency ceiling
        while !self.fetch.needs_slowdown() {
            match self.queue.pop() {
                Some(request) => self.dispatch_one(request),
                None => break,
            }
        }

        // Pull at most one seed per tick
        let slow = self.fetch.needs_slowdown();
        let pulled = if slow {
            None
        } else {
            self.seeds.as_mut().map(|cursor| cursor.next())
        };
        match pulled {
            Some(Some(Ok(request))) => self.crawl(request),
            Some(Some(Err(e))) => {
                self.seeds = None;
                error!("Error while obtaining seed requests: {}", e);
            }
            Some(None) => {
                self.seeds = None;
                debug!("Seed source exhausted");
            }
            None => {}
        }

        if self.close_if_idle && self.is_idle() {
            self.ready_to_close();
        }
    }

    /// Launches one concurrent fetch for a request
    fn dispatch_one(&mut self, request: Request) {
        let id = request.id();
        self.downloading.insert(id);
        self.tracker.add_request(id);
        self.stats.increment_requests_dispatched();

        let fetch = Arc::clone(&self.fetch);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = fetch.fetch(request.clone()).await;
            // The completion event is the unconditional cleanup path; it
            // must be posted whatever the outcome
            let _ = tx.send(EngineEvent::FetchDone { request, outcome });
        });
    }

    /// Settles bookkeeping for a completed fetch, then routes its outcome
    fn on_fetch_done(&mut self, request: Request, outcome: Result<FetchOutcome>) {
        let id = request.id();
        self.downloading.remove(&id);
        self.tracker.remove_request(id);

        match outcome {
            Ok(FetchOutcome::FollowUp(next)) => {
                self.stats.increment_follow_ups();
                debug!("Fetch for {} produced follow-up {}", request.url, next.url);
                self.crawl(next);
            }
            Ok(FetchOutcome::Page(response)) => {
                self.stats.increment_requests_succeeded();
                // Deferred, not inline: the pipeline must observe this
                // request's in-flight bookkeeping as already settled
                let _ = self.tx.send(EngineEvent::Scrape { response, request });
            }
            Err(e) => {
                self.stats.increment_requests_failed();
                error!("Fetch failed for {}: {}", request.url, e);
            }
        }

        // Unconditional re-arm, after the scrape event is queued so the next
        // tick's idle check already sees the pipeline's pending work
        self.debouncer.schedule();
    }

    /// Accepts a request into the pending queue and re-arms the loop
    ///
    /// The request must belong to the bound session; a mismatch is caller
    /// misuse and halts the engine.
    fn crawl(&mut self, request: Request) {
        let session = self.session.as_ref().expect("Engine session not bound");
        assert_eq!(
            request.session(),
            session.id(),
            "Request for foreign session: {:?}",
            request
        );
        self.queue.push(request);
        self.stats.increment_requests_enqueued();
        self.debouncer.schedule();
    }

    /// The five quiescence conditions, evaluated fresh every time
    fn is_idle(&self) -> bool {
        self.downloading.is_empty()
            && self.pipeline.is_idle()
            && self.fetch.active() == 0
            && self.seeds.is_none()
            && !self.queue.has_pending()
    }

    /// Idle-with-auto-close path into shutdown sequencing
    fn ready_to_close(&mut self) {
        if !self.is_idle() {
            return;
        }
        if self.tracker.is_closing() {
            return;
        }
        self.begin_close("finished");
    }

    /// `Running -> Closing`; idempotent while already closing
    fn begin_close(&mut self, reason: &str) {
        assert!(
            self.state == EngineState::Running || self.state == EngineState::Closing,
            "Engine not running"
        );
        if self.state == EngineState::Closing {
            return;
        }

        if let Some(session) = &self.session {
            info!("Closing session {} ({})", session, reason);
        }
        self.state = EngineState::Closing;
        self.tracker.close();

        // Grace delay before teardown absorbs requests injected by
        // in-flight callbacks racing the idle check
        let tx = self.tx.clone();
        let delay = self.config.grace_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(EngineEvent::Teardown);
        });
    }

    /// `Closing -> Closed` once the fetch layer has settled
    async fn teardown(&mut self) {
        if self.state != EngineState::Closing {
            return;
        }

        self.fetch.close().await;
        self.state = EngineState::Closed;

        if let Some(session) = &self.session {
            self.signals.emit(SessionSignal::Closed {
                session: session.id(),
            });
            info!("Session closed: {}", session);
        }
        self.stats.log_summary();
    }
}
