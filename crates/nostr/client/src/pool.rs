//! Relay pool for managing connections to multiple Nostr relays.
//!
//! The pool owns one endpoint per relay URL and tracks its connection state.
//! Query and publish fan-outs (see [`crate::query`] and [`crate::publish`])
//! snapshot the connected endpoints when they start, so adding or removing a
//! relay never disturbs a fan-out already in flight.

use crate::config::{PoolConfig, validate_relay_url};
use crate::error::{ClientError, Result};
use crate::transport::{RelayConnector, RelayTransport, WebSocketConnector};
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

/// Reason recorded for an endpoint still connecting when `connect_all` gives up.
pub const CONNECT_TIMEOUT_REASON: &str = "timeout";

/// Connection state of one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Never connected, or disconnected on request
    Disconnected,
    /// A connection attempt is in progress
    Connecting,
    /// Connected and ready
    Connected,
    /// The last connection attempt failed, or the connection dropped
    Failed,
}

/// Point-in-time status of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayStatus {
    pub url: String,
    pub state: ConnectionState,
    pub last_error: Option<String>,
}

/// Events emitted by the relay pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    /// A relay was added to the pool
    Added { relay_url: String },
    /// A relay connected
    Connected { relay_url: String },
    /// A connection attempt failed
    ConnectionFailed { relay_url: String, error: String },
    /// A relay was disconnected on request
    Disconnected { relay_url: String },
    /// A relay was removed from the pool
    Removed { relay_url: String },
}

#[derive(Debug)]
struct EndpointState {
    state: ConnectionState,
    last_error: Option<String>,
}

/// A relay registered in the pool.
pub struct RelayEndpoint {
    url: String,
    transport: Arc<dyn RelayTransport>,
    state: Mutex<EndpointState>,
}

impl RelayEndpoint {
    fn new(url: String, transport: Arc<dyn RelayTransport>) -> Self {
        Self {
            url,
            transport,
            state: Mutex::new(EndpointState {
                state: ConnectionState::Disconnected,
                last_error: None,
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn transport(&self) -> &Arc<dyn RelayTransport> {
        &self.transport
    }

    /// Current status, folding in a connection the transport has since lost.
    pub fn status(&self) -> RelayStatus {
        let mut guard = self.state.lock();
        if guard.state == ConnectionState::Connected && !self.transport.is_connected() {
            guard.state = ConnectionState::Failed;
            guard.last_error = Some("connection closed".to_string());
        }
        RelayStatus {
            url: self.url.clone(),
            state: guard.state,
            last_error: guard.last_error.clone(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status().state == ConnectionState::Connected
    }

    fn set_state(&self, state: ConnectionState, last_error: Option<String>) {
        let mut guard = self.state.lock();
        guard.state = state;
        guard.last_error = last_error;
    }
}

/// A pool of Nostr relay connections.
pub struct RelayPool {
    /// Configuration the pool was built with
    config: PoolConfig,
    /// Opens transports for newly added relays
    connector: Arc<dyn RelayConnector>,
    /// Endpoints indexed by URL
    relays: Arc<RwLock<HashMap<String, Arc<RelayEndpoint>>>>,
    /// Broadcast channel for pool events
    events_tx: broadcast::Sender<PoolEvent>,
}

impl RelayPool {
    /// Create an empty pool using WebSocket connections.
    ///
    /// The relays listed in `config` are not added; call
    /// [`add_configured_relays`](Self::add_configured_relays) for that.
    pub fn new(config: PoolConfig) -> Self {
        Self::with_connector(config, Arc::new(WebSocketConnector))
    }

    /// Create an empty pool using a custom connector.
    pub fn with_connector(config: PoolConfig, connector: Arc<dyn RelayConnector>) -> Self {
        let (events_tx, _) = broadcast::channel(1000);
        Self {
            config,
            connector,
            relays: Arc::new(RwLock::new(HashMap::new())),
            events_tx,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Subscribe to pool events.
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.events_tx.subscribe()
    }

    fn emit(&self, event: PoolEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Add a relay to the pool in the `Disconnected` state.
    pub async fn add_relay(&self, url: &str) -> Result<()> {
        validate_relay_url(url)?;

        let mut relays = self.relays.write().await;
        if relays.contains_key(url) {
            return Err(ClientError::DuplicateRelay(url.to_string()));
        }

        let transport = self.connector.open(url)?;
        relays.insert(
            url.to_string(),
            Arc::new(RelayEndpoint::new(url.to_string(), transport)),
        );
        drop(relays);

        info!("Added relay to pool: {}", url);
        self.emit(PoolEvent::Added {
            relay_url: url.to_string(),
        });
        Ok(())
    }

    /// Add every relay from the configuration, skipping ones already present.
    pub async fn add_configured_relays(&self) -> Result<()> {
        for url in &self.config.relays {
            match self.add_relay(url).await {
                Ok(()) | Err(ClientError::DuplicateRelay(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Remove a relay from the pool.
    ///
    /// Fan-outs that already snapshotted the relay finish with it; the
    /// connection closes once the last of them lets go.
    pub async fn remove_relay(&self, url: &str) -> Result<()> {
        let removed = self.relays.write().await.remove(url);
        match removed {
            Some(_) => {
                info!("Removed relay from pool: {}", url);
                self.emit(PoolEvent::Removed {
                    relay_url: url.to_string(),
                });
                Ok(())
            }
            None => Err(ClientError::UnknownRelay(url.to_string())),
        }
    }

    /// Get all relay URLs in the pool, sorted.
    pub async fn relay_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.relays.read().await.keys().cloned().collect();
        urls.sort();
        urls
    }

    /// Status of every endpoint, sorted by URL.
    pub async fn statuses(&self) -> Vec<RelayStatus> {
        let mut statuses: Vec<RelayStatus> = self
            .relays
            .read()
            .await
            .values()
            .map(|endpoint| endpoint.status())
            .collect();
        statuses.sort_by(|a, b| a.url.cmp(&b.url));
        statuses
    }

    /// Status of one endpoint.
    pub async fn status(&self, url: &str) -> Option<RelayStatus> {
        self.relays.read().await.get(url).map(|e| e.status())
    }

    /// URLs of connected relays, sorted.
    pub async fn connected_relays(&self) -> Vec<String> {
        let mut urls: Vec<String> = self
            .connected_endpoints()
            .await
            .iter()
            .map(|e| e.url.clone())
            .collect();
        urls.sort();
        urls
    }

    pub async fn connected_count(&self) -> usize {
        self.connected_endpoints().await.len()
    }

    /// Snapshot of the endpoints connected right now.
    pub(crate) async fn connected_endpoints(&self) -> Vec<Arc<RelayEndpoint>> {
        self.relays
            .read()
            .await
            .values()
            .filter(|endpoint| endpoint.is_connected())
            .cloned()
            .collect()
    }

    /// Connect every endpoint that is not already connected, concurrently.
    ///
    /// Returns once every attempt has settled or `timeout` elapses. Attempts
    /// still running at that point are abandoned and their endpoints marked
    /// `Failed` with reason `"timeout"`.
    pub async fn connect_all(&self, timeout: Duration) -> Vec<RelayStatus> {
        let deadline = Instant::now() + timeout;

        let pending: Vec<Arc<RelayEndpoint>> = self
            .relays
            .read()
            .await
            .values()
            .filter(|endpoint| !endpoint.is_connected())
            .cloned()
            .collect();

        for endpoint in &pending {
            endpoint.set_state(ConnectionState::Connecting, None);
        }

        let attempts = pending.iter().map(|endpoint| async move {
            debug!("Connecting to relay: {}", endpoint.url);
            match timeout_at(deadline, endpoint.transport.connect()).await {
                Ok(Ok(())) => {
                    endpoint.set_state(ConnectionState::Connected, None);
                    self.emit(PoolEvent::Connected {
                        relay_url: endpoint.url.clone(),
                    });
                }
                Ok(Err(e)) => {
                    warn!("Failed to connect to {}: {}", endpoint.url, e);
                    endpoint.set_state(ConnectionState::Failed, Some(e.to_string()));
                    self.emit(PoolEvent::ConnectionFailed {
                        relay_url: endpoint.url.clone(),
                        error: e.to_string(),
                    });
                }
                Err(_) => {
                    warn!("Timed out connecting to {}", endpoint.url);
                    endpoint.set_state(
                        ConnectionState::Failed,
                        Some(CONNECT_TIMEOUT_REASON.to_string()),
                    );
                    self.emit(PoolEvent::ConnectionFailed {
                        relay_url: endpoint.url.clone(),
                        error: CONNECT_TIMEOUT_REASON.to_string(),
                    });
                }
            }
        });
        join_all(attempts).await;

        let statuses = self.statuses().await;
        let connected = statuses
            .iter()
            .filter(|s| s.state == ConnectionState::Connected)
            .count();
        info!("Connected to {}/{} relays", connected, statuses.len());
        statuses
    }

    /// Connect using the configured connect timeout.
    pub async fn connect(&self) -> Vec<RelayStatus> {
        self.connect_all(self.config.connect_timeout()).await
    }

    /// Disconnect from all relays. Endpoints stay in the pool.
    pub async fn disconnect_all(&self) {
        let endpoints: Vec<Arc<RelayEndpoint>> =
            self.relays.read().await.values().cloned().collect();

        let closes = endpoints.iter().map(|endpoint| async move {
            if let Err(e) = endpoint.transport.disconnect().await {
                warn!("Error disconnecting from {}: {}", endpoint.url, e);
            }
            endpoint.set_state(ConnectionState::Disconnected, None);
            self.emit(PoolEvent::Disconnected {
                relay_url: endpoint.url.clone(),
            });
        });
        join_all(closes).await;
    }
}
