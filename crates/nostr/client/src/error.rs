//! Client error types

use crate::publish::PublishResult;
use thiserror::Error;

/// Client error type
#[derive(Error, Debug)]
pub enum ClientError {
    /// Relay URL is already registered in the pool
    #[error("Relay already in pool: {0}")]
    DuplicateRelay(String),

    /// Relay URL is not registered in the pool
    #[error("Relay not in pool: {0}")]
    UnknownRelay(String),

    /// A fan-out was attempted with no connected relays
    #[error("No connected relays")]
    NoConnectedRelays,

    /// Two relays returned different content under the same event id
    #[error("Integrity violation for event {event_id}: {first_relay} and {conflicting_relay} disagree")]
    IntegrityViolation {
        event_id: String,
        first_relay: String,
        conflicting_relay: String,
    },

    /// Fewer relays accepted a publish than the policy requires
    #[error("Insufficient acceptance: {accepted} of {required} required relays accepted")]
    InsufficientAcceptance {
        required: usize,
        accepted: usize,
        result: PublishResult,
    },

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Timeout error
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Not connected
    #[error("Not connected to relay")]
    NotConnected,

    /// Connection dropped while a request was outstanding
    #[error("Connection closed")]
    ConnectionClosed,

    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Subscription closed by the relay
    #[error("Subscription closed by relay: {0}")]
    Subscription(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Relay message error
    #[error("Message error: {0}")]
    Message(#[from] crate::message::MessageError),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Signing or event construction error
    #[error("Nostr error: {0}")]
    Nostr(#[from] nostr::Nip01Error),

    /// Malformed public key, secret key or event id
    #[error("Invalid key or id: {0}")]
    Key(#[from] nostr::Nip19Error),

    /// A read that a write depends on did not finish on enough relays
    #[error("Incomplete read: {0}")]
    IncompleteRead(String),

    /// A referenced event could not be found on any connected relay
    #[error("Event not found: {0}")]
    EventNotFound(String),
}

/// Client result type
pub type Result<T> = std::result::Result<T, ClientError>;
