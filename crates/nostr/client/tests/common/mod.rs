//! Shared helpers for nostr-client integration tests

#![allow(dead_code)]

use nostr::{Event, EventTemplate, KIND_SHORT_TEXT_NOTE, Keys};
use nostr_client::{MockConnector, MockRelay, PoolConfig, RelayPool};
use std::sync::{Arc, Once};
use std::time::Duration;

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// A pool over mock relays, one per URL, connected before returning.
pub async fn mock_pool(config: PoolConfig, urls: &[&str]) -> (RelayPool, Vec<MockRelay>) {
    init_tracing();
    let connector = MockConnector::new();
    let relays: Vec<MockRelay> = urls.iter().map(|url| connector.relay(url)).collect();

    let pool = RelayPool::with_connector(config, Arc::new(connector));
    for url in urls {
        pool.add_relay(url).await.unwrap();
    }
    pool.connect_all(Duration::from_secs(1)).await;
    (pool, relays)
}

/// A signed text note.
pub fn note(keys: &Keys, created_at: u64, content: &str) -> Event {
    keys.sign(&EventTemplate {
        created_at,
        kind: KIND_SHORT_TEXT_NOTE,
        tags: vec![],
        content: content.to_string(),
    })
    .unwrap()
}

/// Event with a chosen id, for ordering tests that need exact ids.
pub fn raw_event(id: &str, created_at: u64, content: &str) -> Event {
    Event {
        id: id.to_string(),
        pubkey: "b".repeat(64),
        created_at,
        kind: KIND_SHORT_TEXT_NOTE,
        tags: vec![],
        content: content.to_string(),
        sig: "c".repeat(128),
    }
}
