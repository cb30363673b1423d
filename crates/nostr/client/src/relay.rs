//! Single relay connection over WebSocket.
//!
//! A connected relay runs two background tasks: a writer draining an outgoing
//! queue into the socket, and a reader routing incoming messages. `EVENT`,
//! `EOSE` and `CLOSED` are routed to the fetch that owns the subscription id;
//! `OK` is routed to every publish waiting on that event id. Both routing
//! tables sit behind synchronous locks so a dropped request can unregister
//! itself from `Drop`. Each socket gets fresh tables, so a reconnect never
//! shares state with the socket it replaced.

use crate::error::{ClientError, Result};
use crate::message::{ClientMessage, Filter, RelayMessage};
use crate::transport::{EventSink, PublishConfirmation, RelayTransport};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use nostr::Event;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Generate a short random subscription ID.
pub fn generate_subscription_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

/// Messages routed to an in-flight fetch.
#[derive(Debug)]
enum SubscriptionMessage {
    Event(Event),
    Eose,
    Closed(String),
}

type ConfirmationSender = oneshot::Sender<PublishConfirmation>;

/// Routing state of one socket, shared with its reader task.
#[derive(Default)]
struct Routes {
    connected: AtomicBool,
    subscriptions: Mutex<HashMap<String, mpsc::UnboundedSender<SubscriptionMessage>>>,
    /// Waiters per event id, tagged so each can unregister only itself
    pending_confirmations: Mutex<HashMap<String, Vec<(u64, ConfirmationSender)>>>,
    next_waiter: AtomicU64,
}

impl Routes {
    fn await_confirmation(&self, event_id: &str) -> (u64, oneshot::Receiver<PublishConfirmation>) {
        let (tx, rx) = oneshot::channel();
        let waiter = self.next_waiter.fetch_add(1, Ordering::Relaxed);
        self.pending_confirmations
            .lock()
            .entry(event_id.to_string())
            .or_default()
            .push((waiter, tx));
        (waiter, rx)
    }

    fn forget_confirmation(&self, event_id: &str, waiter: u64) {
        let mut pending = self.pending_confirmations.lock();
        if let Some(waiters) = pending.get_mut(event_id) {
            waiters.retain(|(id, _)| *id != waiter);
            if waiters.is_empty() {
                pending.remove(event_id);
            }
        }
    }

    /// Drop every route so waiting requests observe the connection closing.
    fn fail_all(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.subscriptions.lock().clear();
        self.pending_confirmations.lock().clear();
    }

    fn dispatch(&self, url: &str, msg: RelayMessage) {
        match msg {
            RelayMessage::Event {
                subscription_id,
                event,
            } => self.route(&subscription_id, SubscriptionMessage::Event(event)),
            RelayMessage::Eose { subscription_id } => {
                self.route(&subscription_id, SubscriptionMessage::Eose)
            }
            RelayMessage::Closed {
                subscription_id,
                message,
            } => self.route(&subscription_id, SubscriptionMessage::Closed(message)),
            RelayMessage::Ok {
                event_id,
                success,
                message,
            } => {
                let waiters = self.pending_confirmations.lock().remove(&event_id);
                if let Some(waiters) = waiters {
                    let confirmation = PublishConfirmation {
                        event_id,
                        accepted: success,
                        message,
                    };
                    for (_, tx) in waiters {
                        let _ = tx.send(confirmation.clone());
                    }
                } else {
                    debug!("Unsolicited OK from {} for {}", url, event_id);
                }
            }
            RelayMessage::Notice { message } => {
                info!("Notice from {}: {}", url, message);
            }
        }
    }

    fn route(&self, subscription_id: &str, msg: SubscriptionMessage) {
        let subs = self.subscriptions.lock();
        match subs.get(subscription_id) {
            Some(tx) => {
                let _ = tx.send(msg);
            }
            None => debug!("Message for unknown subscription {}", subscription_id),
        }
    }
}

/// Background tasks and routing state of one live socket.
struct Link {
    routes: Arc<Routes>,
    outgoing: mpsc::UnboundedSender<Message>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Link {
    fn shutdown(self) {
        self.routes.fail_all();
        let _ = self.outgoing.send(Message::Close(None));
        self.reader.abort();
        // The writer exits on its own once the close frame is flushed and
        // every outgoing sender is gone.
        drop(self.writer);
    }
}

/// WebSocket connection to a Nostr relay.
pub struct RelayConnection {
    url: Url,
    url_str: String,
    link: Mutex<Option<Link>>,
}

impl RelayConnection {
    /// Create a new relay connection (does not connect yet)
    pub fn new(url: &str) -> Result<Self> {
        let parsed = crate::config::validate_relay_url(url)?;
        Ok(Self {
            url: parsed,
            url_str: url.to_string(),
            link: Mutex::new(None),
        })
    }

    /// Queue and routes of the current socket, if it is still up.
    fn outgoing(&self) -> Result<(mpsc::UnboundedSender<Message>, Arc<Routes>)> {
        self.link
            .lock()
            .as_ref()
            .filter(|link| link.routes.connected.load(Ordering::SeqCst))
            .map(|link| (link.outgoing.clone(), Arc::clone(&link.routes)))
            .ok_or(ClientError::NotConnected)
    }

    /// Make `link` the current socket, shutting down the one it replaces.
    fn install(&self, link: Link) {
        let previous = self.link.lock().replace(link);
        if let Some(previous) = previous {
            previous.shutdown();
        }
    }

    fn send(outgoing: &mpsc::UnboundedSender<Message>, msg: &ClientMessage) -> Result<()> {
        let text = msg.to_json()?;
        outgoing
            .send(Message::text(text))
            .map_err(|_| ClientError::ConnectionClosed)
    }
}

#[async_trait]
impl RelayTransport for RelayConnection {
    fn url(&self) -> &str {
        &self.url_str
    }

    async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        info!("Connecting to relay: {}", self.url);
        if self.url.scheme() == "wss" {
            // Fails harmlessly once a provider is installed
            let _ = rustls::crypto::ring::default_provider().install_default();
        }
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| ClientError::WebSocket(e.to_string()))?;
        let (mut sink, mut stream) = ws_stream.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();

        let writer_url = self.url_str.clone();
        let writer = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = sink.send(msg).await {
                    debug!("Send to {} failed: {}", writer_url, e);
                    break;
                }
                if closing {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // Marked before the reader starts so a socket that dies at once is
        // never left flagged as connected.
        let routes = Arc::new(Routes::default());
        routes.connected.store(true, Ordering::SeqCst);

        let reader_routes = Arc::clone(&routes);
        let pong_tx = out_tx.clone();
        let reader_url = self.url_str.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => match RelayMessage::from_json(&text) {
                        Ok(msg) => reader_routes.dispatch(&reader_url, msg),
                        Err(e) => debug!("Ignoring message from {}: {}", reader_url, e),
                    },
                    Ok(Message::Ping(data)) => {
                        let _ = pong_tx.send(Message::Pong(data));
                    }
                    Ok(Message::Close(_)) => {
                        info!("Relay {} closed connection", reader_url);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("WebSocket error from {}: {}", reader_url, e);
                        break;
                    }
                }
            }
            reader_routes.fail_all();
        });

        self.install(Link {
            routes,
            outgoing: out_tx,
            reader,
            writer,
        });

        info!("Connected to relay: {}", self.url);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let link = self.link.lock().take();
        if let Some(link) = link {
            info!("Disconnecting from relay: {}", self.url);
            link.shutdown();
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.link
            .lock()
            .as_ref()
            .is_some_and(|link| link.routes.connected.load(Ordering::SeqCst))
    }

    async fn fetch(&self, filter: &Filter, sink: &EventSink) -> Result<()> {
        let (outgoing, routes) = self.outgoing()?;
        let (tx, mut rx) = mpsc::unbounded_channel();

        let subscription_id = {
            let mut subs = routes.subscriptions.lock();
            let mut id = generate_subscription_id();
            while subs.contains_key(&id) {
                id = generate_subscription_id();
            }
            subs.insert(id.clone(), tx);
            id
        };
        let mut guard = SubscriptionGuard {
            routes,
            outgoing: outgoing.clone(),
            subscription_id: subscription_id.clone(),
            closed_by_relay: false,
        };

        Self::send(
            &outgoing,
            &ClientMessage::Req {
                subscription_id: subscription_id.clone(),
                filters: vec![filter.clone()],
            },
        )?;
        debug!("REQ {} sent to {}", subscription_id, self.url);

        while let Some(msg) = rx.recv().await {
            match msg {
                SubscriptionMessage::Event(event) => {
                    if !filter.matches(&event) {
                        debug!("Dropping non-matching event {} from {}", event.id, self.url);
                        continue;
                    }
                    if !sink.send(event) {
                        return Ok(());
                    }
                }
                SubscriptionMessage::Eose => {
                    debug!("EOSE {} from {}", subscription_id, self.url);
                    return Ok(());
                }
                SubscriptionMessage::Closed(reason) => {
                    guard.closed_by_relay = true;
                    return Err(ClientError::Subscription(reason));
                }
            }
        }

        Err(ClientError::ConnectionClosed)
    }

    async fn publish(&self, event: &Event) -> Result<PublishConfirmation> {
        let (outgoing, routes) = self.outgoing()?;
        let (waiter, rx) = routes.await_confirmation(&event.id);
        let _guard = ConfirmationGuard {
            routes,
            event_id: event.id.clone(),
            waiter,
        };

        Self::send(&outgoing, &ClientMessage::Event(event.clone()))?;
        debug!("EVENT {} sent to {}", event.id, self.url);

        rx.await.map_err(|_| ClientError::ConnectionClosed)
    }
}

impl Drop for RelayConnection {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().take() {
            link.shutdown();
        }
    }
}

/// Unregisters a fetch's subscription and sends `CLOSE` when the fetch ends,
/// whether it finished or was abandoned.
struct SubscriptionGuard {
    routes: Arc<Routes>,
    outgoing: mpsc::UnboundedSender<Message>,
    subscription_id: String,
    closed_by_relay: bool,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.routes.subscriptions.lock().remove(&self.subscription_id);
        if !self.closed_by_relay {
            let close = ClientMessage::Close {
                subscription_id: self.subscription_id.clone(),
            };
            if let Ok(text) = close.to_json() {
                let _ = self.outgoing.send(Message::text(text));
            }
        }
    }
}

/// Unregisters a publish's pending confirmation when the publish ends,
/// leaving other publishes of the same event waiting.
struct ConfirmationGuard {
    routes: Arc<Routes>,
    event_id: String,
    waiter: u64,
}

impl Drop for ConfirmationGuard {
    fn drop(&mut self) {
        self.routes.forget_confirmation(&self.event_id, self.waiter);
    }
}
