//! Query fan-out.
//!
//! One filter goes to every connected relay at once. Events from all relays
//! flow through a single channel, so the first copy of an id to arrive is the
//! one kept. The merged set is ordered newest first with ties broken by id.

use crate::error::{ClientError, Result};
use crate::message::Filter;
use crate::pool::RelayPool;
use crate::transport::EventSink;
use futures::future::join_all;
use nostr::{Event, sort_events};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

/// Deadlines for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Budget for each relay, measured from the start of the call
    pub timeout: Duration,
    /// Absolute deadline for the whole call; caps every relay's budget
    pub deadline: Option<Instant>,
}

impl QueryOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn relay_deadline(&self, start: Instant) -> Instant {
        let own = start + self.timeout;
        match self.deadline {
            Some(caller) if caller < own => caller,
            _ => own,
        }
    }
}

/// How one relay's part of a query ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayQueryOutcome {
    /// Reached end of stored events after streaming this many events
    Completed(usize),
    /// Errored (relay `CLOSED`, dropped connection, ...)
    Failed(String),
    /// Still streaming when its deadline passed
    TimedOut,
}

/// Merged result of a query fan-out.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// One event per id, newest first, ties broken by id ascending
    pub events: Vec<Event>,
    /// What happened at each relay of the snapshot
    pub outcomes: BTreeMap<String, RelayQueryOutcome>,
}

impl QueryResult {
    /// Relays that ran out of time.
    pub fn timed_out(&self) -> Vec<&str> {
        self.relays_where(|o| *o == RelayQueryOutcome::TimedOut)
    }

    /// Relays that errored.
    pub fn failed(&self) -> Vec<&str> {
        self.relays_where(|o| matches!(o, RelayQueryOutcome::Failed(_)))
    }

    /// Whether at least one relay reached end of stored events.
    pub fn any_completed(&self) -> bool {
        self.outcomes
            .values()
            .any(|o| matches!(o, RelayQueryOutcome::Completed(_)))
    }

    /// Whether every relay reached end of stored events.
    pub fn is_complete(&self) -> bool {
        self.outcomes
            .values()
            .all(|o| matches!(o, RelayQueryOutcome::Completed(_)))
    }

    fn relays_where(&self, pred: impl Fn(&RelayQueryOutcome) -> bool) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| pred(o))
            .map(|(url, _)| url.as_str())
            .collect()
    }
}

/// Keeps the first copy of every id and rejects conflicting later copies.
#[derive(Default)]
struct Merger {
    events: Vec<Event>,
    /// id -> (index into events, relay that delivered it first)
    seen: HashMap<String, (usize, Arc<str>)>,
}

impl Merger {
    fn push(&mut self, relay: Arc<str>, event: Event) -> Result<()> {
        match self.seen.get(&event.id) {
            Some((index, first_relay)) => {
                if !self.events[*index].same_payload(&event) {
                    return Err(ClientError::IntegrityViolation {
                        event_id: event.id,
                        first_relay: first_relay.to_string(),
                        conflicting_relay: relay.to_string(),
                    });
                }
            }
            None => {
                self.seen
                    .insert(event.id.clone(), (self.events.len(), relay));
                self.events.push(event);
            }
        }
        Ok(())
    }

    fn finish(mut self, limit: Option<u64>) -> Vec<Event> {
        sort_events(&mut self.events);
        if let Some(limit) = limit {
            self.events.truncate(limit as usize);
        }
        self.events
    }
}

impl RelayPool {
    /// Run `filter` against every connected relay using the configured timeout.
    pub async fn query(&self, filter: &Filter) -> Result<QueryResult> {
        self.query_with(filter, QueryOptions::new(self.config().query_timeout()))
            .await
    }

    /// Run `filter` against every connected relay.
    ///
    /// Fails only when no relay is connected, or when two relays return
    /// different content under one id. Relays that error or run out of time
    /// are recorded in [`QueryResult::outcomes`]; events a relay streamed
    /// before running out of time are kept.
    pub async fn query_with(&self, filter: &Filter, options: QueryOptions) -> Result<QueryResult> {
        let start = Instant::now();
        let endpoints = self.connected_endpoints().await;
        if endpoints.is_empty() {
            return Err(ClientError::NoConnectedRelays);
        }

        let deadline = options.relay_deadline(start);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let fetches = endpoints.iter().map(|endpoint| {
            let sink = EventSink::new(endpoint.url(), tx.clone());
            async move {
                let outcome =
                    match timeout_at(deadline, endpoint.transport().fetch(filter, &sink)).await {
                        Ok(Ok(())) => RelayQueryOutcome::Completed(sink.count()),
                        Ok(Err(e)) => {
                            warn!("Query failed on {}: {}", endpoint.url(), e);
                            RelayQueryOutcome::Failed(e.to_string())
                        }
                        Err(_) => {
                            debug!(
                                "Query timed out on {} after {} events",
                                endpoint.url(),
                                sink.count()
                            );
                            RelayQueryOutcome::TimedOut
                        }
                    };
                (endpoint.url().to_string(), outcome)
            }
        });
        let outcomes: BTreeMap<String, RelayQueryOutcome> = join_all(fetches).await.into_iter().collect();
        drop(tx);

        let mut merger = Merger::default();
        while let Some((relay, event)) = rx.recv().await {
            merger.push(relay, event)?;
        }
        let events = merger.finish(filter.limit);

        debug!(
            "Query returned {} events from {} relays in {:?}",
            events.len(),
            outcomes.len(),
            start.elapsed()
        );
        Ok(QueryResult { events, outcomes })
    }

    /// Merged events of a query, dropping per-relay outcomes.
    pub async fn fetch_events(&self, filter: &Filter) -> Result<Vec<Event>> {
        Ok(self.query(filter).await?.events)
    }
}
