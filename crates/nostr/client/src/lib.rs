//! Nostr relay aggregation client.
//!
//! This crate provides:
//! - Message parsing and filters (NIP-01 relay protocol)
//! - WebSocket connections to Nostr relays behind the [`RelayTransport`] trait
//! - A relay pool tracking the connection state of every relay
//! - Query fan-out: one filter to every connected relay, merged and deduplicated
//! - Publish fan-out: one event to every connected relay, with per-relay outcomes
//! - Feeds, threads, profiles and contact lists on top of both ([`SocialClient`])
//!
//! # Example
//!
//! ```rust,no_run
//! use nostr_client::{Filter, PoolConfig, RelayPool};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> nostr_client::Result<()> {
//!     // Create a relay pool with the default relays
//!     let pool = RelayPool::new(PoolConfig::default());
//!     pool.add_configured_relays().await?;
//!
//!     // Connect, giving slow relays five seconds
//!     for status in pool.connect_all(Duration::from_secs(5)).await {
//!         println!("{}: {:?}", status.url, status.state);
//!     }
//!
//!     // Fetch the ten newest text notes across all connected relays
//!     let filter = Filter::new().kinds(vec![1]).limit(10);
//!     let result = pool.query(&filter).await?;
//!     for event in &result.events {
//!         println!("{} {}", event.created_at, event.content);
//!     }
//!     for relay in result.timed_out() {
//!         println!("{} did not finish in time", relay);
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod message;
mod pool;
mod publish;
mod query;
mod relay;
mod social;
mod transport;

// Re-export main types
pub use config::{PoolConfig, RELAYS_ENV, validate_relay_url};
pub use error::{ClientError, Result};
pub use message::{ClientMessage, Filter, MessageError, RelayMessage};
pub use pool::{CONNECT_TIMEOUT_REASON, ConnectionState, PoolEvent, RelayEndpoint, RelayPool, RelayStatus};
pub use publish::{PublishOptions, PublishOutcome, PublishResult};
pub use query::{QueryOptions, QueryResult, RelayQueryOutcome};
pub use relay::{RelayConnection, generate_subscription_id};
pub use social::{
    FOLLOWER_SCAN_LIMIT, FeedPage, MAX_FILTER_AUTHORS, Note, ProfileCache, REPLY_OVERFETCH,
    SocialClient, THREAD_EVENT_LIMIT, Thread, ThreadNode,
};
pub use transport::{
    EventSink, MockConnector, MockRelay, PublishConfirmation, RelayConnector, RelayTransport,
    WebSocketConnector,
};

/// Relays used when no configuration names any.
pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay.damus.io",
    "wss://nos.lol",
    "wss://nostr.wine",
    "wss://relay.snort.social",
];

/// Create a relay pool holding the default relays, not yet connected.
pub async fn default_pool() -> Result<RelayPool> {
    let pool = RelayPool::new(PoolConfig::default());
    pool.add_configured_relays().await?;
    Ok(pool)
}
