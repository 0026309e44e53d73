//! Request and response types shared across the engine
//!
//! A `Request` is an opaque work item: a target URL, the session it belongs
//! to, and an optional parse callback invoked on its eventual `Response`.
//! A fetch produces a `FetchOutcome`: either a terminal `Response` or a
//! follow-up `Request` (e.g. a redirect surfaced by the fetch layer).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use url::Url;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a request for the engine's bookkeeping sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

/// Identity of one bound engine run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

/// One bound run of the engine against a single work source
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    name: String,
}

impl Session {
    pub fn new(name: &str) -> Self {
        Session {
            id: SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.to_string(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Output of a parse callback: scraped items plus follow-up requests
#[derive(Default)]
pub struct ParseOutput {
    pub items: Vec<String>,
    pub requests: Vec<Request>,
}

/// Parse callback attached to a request, invoked with its response
pub type ParseFn = Arc<dyn Fn(&Response) -> ParseOutput + Send + Sync>;

/// A unit of fetch work bound to a session
///
/// Identity is the `RequestId`; the engine never deduplicates by URL.
#[derive(Clone)]
pub struct Request {
    id: RequestId,
    session: SessionId,
    pub url: Url,
    /// Lower values are dispatched first by priority-aware queues
    pub priority: u32,
    pub callback: Option<ParseFn>,
}

impl Request {
    pub fn new(url: Url, session: SessionId) -> Self {
        Request {
            id: RequestId(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)),
            session,
            url,
            priority: 0,
            callback: None,
        }
    }

    pub fn with_callback(mut self, callback: ParseFn) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Derives a follow-up request carrying this request's session and
    /// callback, but a fresh identity. Used by the fetch layer when a
    /// redirect points somewhere new.
    pub fn follow_up(&self, url: Url) -> Request {
        Request {
            id: RequestId(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)),
            session: self.session,
            url,
            priority: self.priority,
            callback: self.callback.clone(),
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("url", &self.url.as_str())
            .field("priority", &self.priority)
            .finish()
    }
}

/// Terminal artifact of a successful fetch
#[derive(Debug, Clone)]
pub struct Response {
    /// Final URL after any follow-up hops
    pub url: Url,
    pub status: u16,
    pub body: String,
}

/// The two tagged outcomes of one fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    /// A terminal artifact, routed to the processing pipeline
    Page(Response),
    /// A follow-up request, re-injected into the engine directly
    FollowUp(Request),
}
