//! Publish fan-out.
//!
//! A signed event goes to every connected relay at once and each relay's
//! answer is recorded. Signature checks are the caller's job; deletion
//! requests and every other kind travel the same path.

use crate::error::{ClientError, Result};
use crate::pool::RelayPool;
use futures::future::join_all;
use nostr::Event;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

/// How one relay answered a publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// `OK true`
    Accepted,
    /// `OK false` with the relay's reason, or a transport error while sending
    Rejected(String),
    /// No answer before the deadline
    TimedOut,
}

/// Per-relay outcome of one publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    pub event_id: String,
    pub outcomes: BTreeMap<String, PublishOutcome>,
}

impl PublishResult {
    /// Number of relays that accepted the event.
    pub fn accepted_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| **o == PublishOutcome::Accepted)
            .count()
    }

    /// Relays that accepted the event.
    pub fn accepted_relays(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| **o == PublishOutcome::Accepted)
            .map(|(url, _)| url.as_str())
            .collect()
    }

    /// Whether at least `quorum` relays accepted.
    pub fn meets(&self, quorum: usize) -> bool {
        self.accepted_count() >= quorum
    }
}

/// Acceptance policy and deadlines for one publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOptions {
    /// Budget for each relay's acknowledgement
    pub timeout: Duration,
    /// Absolute deadline for the whole call; caps every relay's budget
    pub deadline: Option<Instant>,
    /// Acceptances required for success; values below 1 count as 1
    pub quorum: usize,
}

impl PublishOptions {
    /// At-least-one policy.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
            quorum: 1,
        }
    }

    pub fn quorum(mut self, quorum: usize) -> Self {
        self.quorum = quorum;
        self
    }

    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

impl RelayPool {
    /// Publish using the configured timeout and `min_write_confirmations`.
    pub async fn publish(&self, event: &Event) -> Result<PublishResult> {
        let config = self.config();
        self.publish_with(
            event,
            PublishOptions::new(config.publish_timeout()).quorum(config.min_write_confirmations),
        )
        .await
    }

    /// Send `event` to every connected relay and collect their answers.
    ///
    /// Fails with [`ClientError::NoConnectedRelays`] when nothing is
    /// connected, and with [`ClientError::InsufficientAcceptance`] when fewer
    /// than `options.quorum` relays accept; that error still carries the full
    /// per-relay result.
    pub async fn publish_with(&self, event: &Event, options: PublishOptions) -> Result<PublishResult> {
        let start = Instant::now();
        let endpoints = self.connected_endpoints().await;
        if endpoints.is_empty() {
            return Err(ClientError::NoConnectedRelays);
        }

        let own = start + options.timeout;
        let deadline = options.deadline.map_or(own, |caller| caller.min(own));

        let sends = endpoints.iter().map(|endpoint| async move {
            let outcome = match timeout_at(deadline, endpoint.transport().publish(event)).await {
                Ok(Ok(confirmation)) if confirmation.accepted => PublishOutcome::Accepted,
                Ok(Ok(confirmation)) => {
                    debug!("{} rejected {}: {}", endpoint.url(), event.id, confirmation.message);
                    PublishOutcome::Rejected(confirmation.message)
                }
                Ok(Err(e)) => {
                    warn!("Publish to {} failed: {}", endpoint.url(), e);
                    PublishOutcome::Rejected(e.to_string())
                }
                Err(_) => {
                    debug!("Publish to {} timed out", endpoint.url());
                    PublishOutcome::TimedOut
                }
            };
            (endpoint.url().to_string(), outcome)
        });

        let result = PublishResult {
            event_id: event.id.clone(),
            outcomes: join_all(sends).await.into_iter().collect(),
        };

        let required = options.quorum.max(1);
        let accepted = result.accepted_count();
        info!(
            "Published {} to {}/{} relays",
            event.id,
            accepted,
            result.outcomes.len()
        );

        if accepted < required {
            return Err(ClientError::InsufficientAcceptance {
                required,
                accepted,
                result,
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(outcomes: &[(&str, PublishOutcome)]) -> PublishResult {
        PublishResult {
            event_id: "e1".to_string(),
            outcomes: outcomes
                .iter()
                .map(|(url, o)| (url.to_string(), o.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_accepted_count_and_quorum() {
        let r = result(&[
            ("wss://a", PublishOutcome::Accepted),
            ("wss://b", PublishOutcome::Rejected("blocked".to_string())),
            ("wss://c", PublishOutcome::TimedOut),
            ("wss://d", PublishOutcome::Accepted),
        ]);

        assert_eq!(r.accepted_count(), 2);
        assert_eq!(r.accepted_relays(), vec!["wss://a", "wss://d"]);
        assert!(r.meets(2));
        assert!(!r.meets(3));
    }

    #[test]
    fn test_options_builder() {
        let options = PublishOptions::new(Duration::from_secs(10));
        assert_eq!(options.quorum, 1);
        assert!(options.deadline.is_none());
        assert_eq!(options.quorum(3).quorum, 3);
    }
}
