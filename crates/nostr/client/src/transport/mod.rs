//! Relay transport abstraction.
//!
//! The pool talks to relays only through [`RelayTransport`]. Two
//! implementations exist: the WebSocket [`RelayConnection`](crate::RelayConnection)
//! and the scripted in-memory [`MockRelay`] used by tests.
//!
//! # Design
//!
//! Transports perform single request/response exchanges and never enforce
//! their own deadlines. The fan-out wraps each call in a timeout and drops the
//! future when it expires, so every transport must leave itself consistent
//! when a `fetch` or `publish` future is dropped part-way.

mod mock;

pub use mock::{MockConnector, MockRelay};

use crate::error::Result;
use crate::message::Filter;
use async_trait::async_trait;
use nostr::Event;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// Relay acknowledgement of a published event (`OK` message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfirmation {
    /// Event ID that was published
    pub event_id: String,
    /// Whether the relay accepted the event
    pub accepted: bool,
    /// Message from the relay (usually empty if accepted, reason if rejected)
    pub message: String,
}

/// Destination for events streamed by one relay during a fetch.
///
/// Every sink of one fan-out feeds the same channel, so the receiving side
/// observes events in global arrival order.
pub struct EventSink {
    relay_url: Arc<str>,
    tx: mpsc::UnboundedSender<(Arc<str>, Event)>,
    count: AtomicUsize,
}

impl EventSink {
    pub fn new(relay_url: impl Into<Arc<str>>, tx: mpsc::UnboundedSender<(Arc<str>, Event)>) -> Self {
        Self {
            relay_url: relay_url.into(),
            tx,
            count: AtomicUsize::new(0),
        }
    }

    /// Forward one event. Returns false once the receiving side is gone.
    pub fn send(&self, event: Event) -> bool {
        if self.tx.send((Arc::clone(&self.relay_url), event)).is_ok() {
            self.count.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Events forwarded so far.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }
}

/// A connection to a single relay.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Relay URL as registered in the pool.
    fn url(&self) -> &str;

    /// Open the connection. A no-op when already connected.
    async fn connect(&self) -> Result<()>;

    /// Close the connection, failing any outstanding requests.
    async fn disconnect(&self) -> Result<()>;

    /// Whether the connection is currently usable.
    fn is_connected(&self) -> bool;

    /// Stream the relay's stored events matching `filter` into `sink`,
    /// returning at end of stored events (`EOSE`).
    ///
    /// A relay-side `CLOSED` surfaces as [`ClientError::Subscription`](crate::ClientError::Subscription).
    async fn fetch(&self, filter: &Filter, sink: &EventSink) -> Result<()>;

    /// Send `event` and wait for the relay's `OK`.
    async fn publish(&self, event: &Event) -> Result<PublishConfirmation>;
}

/// Opens transports for relay URLs.
pub trait RelayConnector: Send + Sync {
    /// Create an unconnected transport for `url`.
    fn open(&self, url: &str) -> Result<Arc<dyn RelayTransport>>;
}

/// Connector producing WebSocket [`RelayConnection`](crate::RelayConnection)s.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

impl RelayConnector for WebSocketConnector {
    fn open(&self, url: &str) -> Result<Arc<dyn RelayTransport>> {
        Ok(Arc::new(crate::relay::RelayConnection::new(url)?))
    }
}
