//! Mock relays for testing.
//!
//! A [`MockRelay`] holds stored events and scripted behaviour (delays,
//! failures, relays that never answer). Clones share state, so a test keeps a
//! handle to inspect what the pool did while the pool owns another.

use super::{EventSink, PublishConfirmation, RelayConnector, RelayTransport};
use crate::error::{ClientError, Result};
use crate::message::Filter;
use async_trait::async_trait;
use nostr::{Event, sort_events};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// How a mock relay answers a publish.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum PublishBehavior {
    #[default]
    Accept,
    Reject(String),
    Fail(String),
    Hang,
}

#[derive(Debug, Default)]
struct MockRelayInner {
    connected: bool,
    events: Vec<Event>,
    connect_failure: Option<String>,
    connect_hangs: bool,
    connect_delay: Duration,
    fetch_failure: Option<String>,
    fetch_delay: Duration,
    hang_after_stream: bool,
    publish: PublishBehavior,
    publish_delay: Duration,
    published: Vec<Event>,
    connect_attempts: usize,
    fetches: Vec<Filter>,
}

/// Scripted in-memory relay.
#[derive(Debug, Clone)]
pub struct MockRelay {
    url: String,
    inner: Arc<Mutex<MockRelayInner>>,
}

impl MockRelay {
    /// Create a mock relay that connects, answers queries and accepts events.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            inner: Arc::new(Mutex::new(MockRelayInner::default())),
        }
    }

    /// Store events to be served by queries.
    pub fn add_events(&self, events: impl IntoIterator<Item = Event>) {
        self.inner.lock().events.extend(events);
    }

    /// Make every connect attempt fail with `reason`.
    pub fn fail_connect(&self, reason: &str) {
        self.inner.lock().connect_failure = Some(reason.to_string());
    }

    /// Make every connect attempt hang forever.
    pub fn hang_connect(&self) {
        self.inner.lock().connect_hangs = true;
    }

    /// Delay each connect attempt.
    pub fn set_connect_delay(&self, delay: Duration) {
        self.inner.lock().connect_delay = delay;
    }

    /// Make queries fail as if the relay sent `CLOSED` with `reason`.
    pub fn fail_fetch(&self, reason: &str) {
        self.inner.lock().fetch_failure = Some(reason.to_string());
    }

    /// Delay before stored events start streaming.
    pub fn set_fetch_delay(&self, delay: Duration) {
        self.inner.lock().fetch_delay = delay;
    }

    /// Stream stored events but never send `EOSE`.
    pub fn hang_after_stream(&self) {
        self.inner.lock().hang_after_stream = true;
    }

    /// Answer publishes with `OK false` and `reason`.
    pub fn reject_publish(&self, reason: &str) {
        self.inner.lock().publish = PublishBehavior::Reject(reason.to_string());
    }

    /// Fail publishes with a transport error.
    pub fn fail_publish(&self, error: &str) {
        self.inner.lock().publish = PublishBehavior::Fail(error.to_string());
    }

    /// Never answer publishes.
    pub fn hang_publish(&self) {
        self.inner.lock().publish = PublishBehavior::Hang;
    }

    /// Delay each publish acknowledgement.
    pub fn set_publish_delay(&self, delay: Duration) {
        self.inner.lock().publish_delay = delay;
    }

    /// Events received through publish, in order.
    pub fn published(&self) -> Vec<Event> {
        self.inner.lock().published.clone()
    }

    /// Filters received through fetch, in order.
    pub fn fetches(&self) -> Vec<Filter> {
        self.inner.lock().fetches.clone()
    }

    /// Number of connect attempts.
    pub fn connect_attempts(&self) -> usize {
        self.inner.lock().connect_attempts
    }

    /// Simulate the relay dropping the connection.
    pub fn drop_connection(&self) {
        self.inner.lock().connected = false;
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.inner.lock().connected {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }
}

#[async_trait]
impl RelayTransport for MockRelay {
    fn url(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<()> {
        let (hangs, delay, failure) = {
            let mut inner = self.inner.lock();
            inner.connect_attempts += 1;
            (inner.connect_hangs, inner.connect_delay, inner.connect_failure.clone())
        };

        if hangs {
            std::future::pending::<()>().await;
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = failure {
            return Err(ClientError::WebSocket(reason));
        }

        self.inner.lock().connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.inner.lock().connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.lock().connected
    }

    async fn fetch(&self, filter: &Filter, sink: &EventSink) -> Result<()> {
        self.ensure_connected()?;

        let (delay, failure, hang, mut matching) = {
            let mut inner = self.inner.lock();
            inner.fetches.push(filter.clone());
            let matching: Vec<Event> = inner
                .events
                .iter()
                .filter(|e| filter.matches(e))
                .cloned()
                .collect();
            (
                inner.fetch_delay,
                inner.fetch_failure.clone(),
                inner.hang_after_stream,
                matching,
            )
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = failure {
            return Err(ClientError::Subscription(reason));
        }

        // Relays serve the newest events first and apply the limit themselves
        sort_events(&mut matching);
        if let Some(limit) = filter.limit {
            matching.truncate(limit as usize);
        }
        for event in matching {
            sink.send(event);
        }

        if hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn publish(&self, event: &Event) -> Result<PublishConfirmation> {
        self.ensure_connected()?;

        let (behavior, delay) = {
            let mut inner = self.inner.lock();
            inner.published.push(event.clone());
            (inner.publish.clone(), inner.publish_delay)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let (accepted, message) = match behavior {
            PublishBehavior::Accept => (true, String::new()),
            PublishBehavior::Reject(reason) => (false, reason),
            PublishBehavior::Fail(error) => return Err(ClientError::WebSocket(error)),
            PublishBehavior::Hang => {
                std::future::pending::<()>().await;
                return Err(ClientError::ConnectionClosed);
            }
        };

        if accepted {
            let mut inner = self.inner.lock();
            if !inner.events.iter().any(|e| e.id == event.id) {
                inner.events.push(event.clone());
            }
        }

        Ok(PublishConfirmation {
            event_id: event.id.clone(),
            accepted,
            message,
        })
    }
}

/// Connector handing out [`MockRelay`]s by URL.
///
/// A URL that was never configured gets a fresh, well-behaved relay.
#[derive(Debug, Default, Clone)]
pub struct MockConnector {
    relays: Arc<Mutex<HashMap<String, MockRelay>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The relay served for `url`, created on first use.
    pub fn relay(&self, url: &str) -> MockRelay {
        self.relays
            .lock()
            .entry(url.to_string())
            .or_insert_with(|| MockRelay::new(url))
            .clone()
    }
}

impl RelayConnector for MockConnector {
    fn open(&self, url: &str) -> Result<Arc<dyn RelayTransport>> {
        Ok(Arc::new(self.relay(url)))
    }
}
