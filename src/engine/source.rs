//! Work source contract
//!
//! A work source is the single identity bound to an engine session. It
//! yields a lazy, possibly infinite sequence of seed requests, and may
//! expose a bootstrap sequence of preparatory requests that the engine
//! drains one at a time before entering the main loop.

use crate::config::SeedEntry;
use crate::protocol::{Request, Session};
use crate::{EngineError, Result};
use url::Url;

/// Lazy cursor over seed requests; advanced at most one element per
/// dispatch tick and discarded permanently on exhaustion or error.
pub type SeedStream = Box<dyn Iterator<Item = Result<Request>> + Send>;

/// Receives the item output of bootstrap-request callbacks
pub type BootstrapSink = Box<dyn FnMut(String) + Send>;

/// Produces the requests for one engine session
pub trait WorkSource: Send {
    /// Name used for the session identity and logging
    fn name(&self) -> &str;

    /// Preparatory requests drained to completion before the main loop.
    /// A failure here aborts session startup.
    fn bootstrap_requests(&mut self, session: &Session) -> Vec<Request> {
        let _ = session;
        Vec::new()
    }

    /// The main seed sequence
    fn seed_requests(&mut self, session: &Session) -> SeedStream;
}

/// Work source over the `[[seed]]` entries of a config file
pub struct ConfigSource {
    name: String,
    seeds: Vec<SeedEntry>,
}

impl ConfigSource {
    pub fn new(name: &str, seeds: Vec<SeedEntry>) -> Self {
        ConfigSource {
            name: name.to_string(),
            seeds,
        }
    }
}

impl WorkSource for ConfigSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn seed_requests(&mut self, session: &Session) -> SeedStream {
        let session_id = session.id();
        let seeds = std::mem::take(&mut self.seeds);
        Box::new(seeds.into_iter().map(move |entry| {
            let url = Url::parse(&entry.url)
                .map_err(|e| EngineError::SeedSource(format!("{}: {}", entry.url, e)))?;
            Ok(Request::new(url, session_id).with_priority(entry.priority))
        }))
    }
}
