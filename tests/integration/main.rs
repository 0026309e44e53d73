//! Integration tests for the engine
//!
//! Engine scenarios run against in-process mock fetch layers and work
//! sources; the HTTP fetch layer is tested against wiremock servers.

mod engine_tests;
mod fetch_tests;
mod support;
