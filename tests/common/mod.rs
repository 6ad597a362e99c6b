//! Common test utilities for inktrace integration tests
//!
//! Shared builders for timelines, configs and span inspection.

#![allow(dead_code)]

use inktrace::phrase_service::MockClient;
use inktrace::{AnnotationSource, Config, HistoryEntry, SessionController, Span};
use std::sync::Arc;
use std::time::Duration;

/// Build a timeline from `(value, time)` pairs.
pub fn entries(raw: &[(&str, u64)]) -> Vec<HistoryEntry> {
    raw.iter().map(|(v, t)| HistoryEntry::new(*v, *t)).collect()
}

/// Default config with a couple of pinned lexicon scores.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.lexicon.overrides.insert("rain".to_string(), -0.4);
    config.lexicon.overrides.insert("sunshine".to_string(), 0.7);
    config
}

/// Controller backed by a mock phrase service answering `body` after `delay`.
pub fn controller_with_service(body: &str, delay: Duration) -> (SessionController, Arc<MockClient>) {
    let client = Arc::new(MockClient::with_body(body).with_delay(delay));
    let controller = SessionController::with_phrase_service(&test_config(), client.clone())
        .expect("controller builds from test config");
    (controller, client)
}

pub fn concat(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

/// `(text, source)` for every annotated span, in order.
pub fn annotated(spans: &[Span]) -> Vec<(String, AnnotationSource)> {
    spans
        .iter()
        .filter_map(|s| s.source().map(|src| (s.text.clone(), src)))
        .collect()
}
