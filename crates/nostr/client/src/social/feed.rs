//! Feeds of text notes.

use super::{MAX_FILTER_AUTHORS, REPLY_OVERFETCH, SocialClient, normalize_pubkeys};
use crate::error::Result;
use crate::message::Filter;
use nostr::{
    Event, KIND_SHORT_TEXT_NOTE, ProfileMetadata, event_id_from_str, public_key_from_str,
    reply_parent_id,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// A text note with what a reader needs to display it.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub event: Event,
    /// Author's profile, when one was found
    pub author: Option<ProfileMetadata>,
    /// Number of replies found on the connected relays
    pub reply_count: usize,
    /// The note this one replies to, when requested and found
    pub parent: Option<Box<Note>>,
}

impl Note {
    pub fn id(&self) -> &str {
        &self.event.id
    }

    /// Display name from the profile, or an abbreviated pubkey.
    pub fn author_name(&self) -> String {
        match self.author.as_ref().and_then(ProfileMetadata::best_name) {
            Some(name) => name.to_string(),
            None => {
                // Relays can hand back malformed pubkeys, so cut on chars
                let short: String = self.event.pubkey.chars().take(8).collect();
                format!("{}...", short)
            }
        }
    }

    pub fn is_reply(&self) -> bool {
        self.event.has_tag("e")
    }
}

/// One page of a feed, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedPage {
    pub notes: Vec<Note>,
    /// `until` for the next page; `None` once the relays returned nothing
    pub next_until: Option<u64>,
}

/// Profiles and reply counts gathered for a batch of events.
#[derive(Debug, Default)]
pub(super) struct Annotations {
    pub(super) profiles: HashMap<String, ProfileMetadata>,
    pub(super) reply_counts: HashMap<String, usize>,
}

impl Annotations {
    pub(super) fn note(&self, event: Event) -> Note {
        Note {
            author: self.profiles.get(&event.pubkey).cloned(),
            reply_count: self.reply_counts.get(&event.id).copied().unwrap_or(0),
            parent: None,
            event,
        }
    }
}

/// Cursor for the page after `events`: one second before the oldest.
fn cursor(events: &[Event]) -> Option<u64> {
    events.last().map(|e| e.created_at.saturating_sub(1))
}

fn notes_filter(limit: u64, until: Option<u64>) -> Filter {
    let filter = Filter::new().kinds(vec![KIND_SHORT_TEXT_NOTE]).limit(limit);
    match until {
        Some(until) => filter.until(until),
        None => filter,
    }
}

impl SocialClient {
    /// Recent notes from everyone.
    pub async fn global_feed(&self, limit: u64, until: Option<u64>) -> Result<FeedPage> {
        let events = self.pool.fetch_events(&notes_filter(limit, until)).await?;
        let next_until = cursor(&events);
        Ok(FeedPage {
            notes: self.enrich(events, false).await?,
            next_until,
        })
    }

    /// Top-level notes (no `e` tags) from `authors`.
    ///
    /// Malformed keys are skipped and at most [`MAX_FILTER_AUTHORS`] authors
    /// are queried.
    pub async fn feed(&self, authors: &[String], limit: u64, until: Option<u64>) -> Result<FeedPage> {
        let mut authors = normalize_pubkeys(authors);
        if authors.is_empty() {
            return Ok(FeedPage::default());
        }
        authors.truncate(MAX_FILTER_AUTHORS);

        let filter = notes_filter(limit, until).authors(authors);
        let events = self.pool.fetch_events(&filter).await?;
        // Replies were scanned too, so the cursor moves past them
        let next_until = cursor(&events);

        let top_level: Vec<Event> = events.into_iter().filter(|e| !e.has_tag("e")).collect();
        Ok(FeedPage {
            notes: self.enrich(top_level, false).await?,
            next_until,
        })
    }

    /// Top-level notes from the accounts `user` follows, and from `user`.
    pub async fn home_feed(&self, user: &str, limit: u64, until: Option<u64>) -> Result<FeedPage> {
        let user = public_key_from_str(user)?;
        let mut authors = self.following(&user).await?;
        // First, so the author cap never drops the user's own notes
        authors.insert(0, user);
        debug!("Home feed over {} authors", authors.len());
        self.feed(&authors, limit, until).await
    }

    /// Replies written by `authors`, each with the note it answers.
    ///
    /// Over-fetches by [`REPLY_OVERFETCH`] since top-level notes are discarded.
    pub async fn replies_feed(&self, authors: &[String], limit: u64, until: Option<u64>) -> Result<FeedPage> {
        let mut authors = normalize_pubkeys(authors);
        if authors.is_empty() {
            return Ok(FeedPage::default());
        }
        authors.truncate(MAX_FILTER_AUTHORS);

        let filter = notes_filter(limit.saturating_mul(REPLY_OVERFETCH), until).authors(authors);
        let events = self.pool.fetch_events(&filter).await?;

        let mut replies: Vec<Event> = events.iter().filter(|e| e.has_tag("e")).cloned().collect();
        let next_until = if replies.len() as u64 > limit {
            replies.truncate(limit as usize);
            cursor(&replies)
        } else {
            cursor(&events)
        };

        Ok(FeedPage {
            notes: self.enrich(replies, true).await?,
            next_until,
        })
    }

    /// Notes by others that tag `user`.
    pub async fn notifications(&self, user: &str, limit: u64, until: Option<u64>) -> Result<FeedPage> {
        let user = public_key_from_str(user)?;
        let filter = notes_filter(limit, until).pubkey_refs(vec![user.clone()]);
        let events = self.pool.fetch_events(&filter).await?;
        let next_until = cursor(&events);

        let mentions: Vec<Event> = events.into_iter().filter(|e| e.pubkey != user).collect();
        Ok(FeedPage {
            notes: self.enrich(mentions, true).await?,
            next_until,
        })
    }

    /// Every note by one author, replies included, with their parents.
    pub async fn user_posts(&self, pubkey: &str, limit: u64, until: Option<u64>) -> Result<FeedPage> {
        let pubkey = public_key_from_str(pubkey)?;
        let filter = notes_filter(limit, until).authors(vec![pubkey]);
        let events = self.pool.fetch_events(&filter).await?;
        let next_until = cursor(&events);
        Ok(FeedPage {
            notes: self.enrich(events, true).await?,
            next_until,
        })
    }

    /// Events by id. Malformed ids are skipped; ids no relay has are absent.
    pub async fn notes_by_id(&self, ids: &[String]) -> Result<HashMap<String, Event>> {
        let mut seen = HashSet::new();
        let mut wanted = Vec::new();
        for input in ids {
            match event_id_from_str(input) {
                Ok(id) => {
                    if seen.insert(id.clone()) {
                        wanted.push(id);
                    }
                }
                Err(e) => warn!("Skipping event id {:?}: {}", input, e),
            }
        }
        if wanted.is_empty() {
            return Ok(HashMap::new());
        }

        let events = self.pool.fetch_events(&Filter::new().ids(wanted)).await?;
        Ok(events
            .into_iter()
            .filter(|e| seen.contains(&e.id))
            .map(|e| (e.id.clone(), e))
            .collect())
    }

    /// Count kind 1 replies to each of `ids`.
    ///
    /// A reply counts once, toward the first of its `e` tags that names one
    /// of `ids`.
    pub async fn reply_counts(&self, ids: &[String]) -> Result<HashMap<String, usize>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let filter = Filter::new()
            .kinds(vec![KIND_SHORT_TEXT_NOTE])
            .event_refs(ids.to_vec());
        let replies = self.pool.fetch_events(&filter).await?;

        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for reply in &replies {
            if let Some(target) = reply.tag_values("e").find(|id| wanted.contains(id)) {
                *counts.entry(target.to_string()).or_default() += 1;
            }
        }
        Ok(counts)
    }

    /// Gather author profiles and reply counts for `events`.
    pub(super) async fn annotate(&self, events: &[&Event]) -> Result<Annotations> {
        if events.is_empty() {
            return Ok(Annotations::default());
        }

        let pubkeys: Vec<String> = events.iter().map(|e| e.pubkey.clone()).collect();
        let ids: Vec<String> = events.iter().map(|e| e.id.clone()).collect();
        let (profiles, reply_counts) =
            futures::try_join!(self.profiles(&pubkeys), self.reply_counts(&ids))?;

        Ok(Annotations {
            profiles,
            reply_counts,
        })
    }

    /// Turn events into notes, optionally attaching the note each replies to.
    pub(super) async fn enrich(&self, events: Vec<Event>, with_parents: bool) -> Result<Vec<Note>> {
        let parents = if with_parents {
            let parent_ids: Vec<String> = events
                .iter()
                .filter_map(|e| reply_parent_id(e).map(str::to_string))
                .collect();
            self.notes_by_id(&parent_ids).await?
        } else {
            HashMap::new()
        };

        let mut all: Vec<&Event> = events.iter().collect();
        all.extend(parents.values());
        let annotations = self.annotate(&all).await?;

        let notes = events
            .into_iter()
            .map(|event| {
                let parent = reply_parent_id(&event)
                    .and_then(|id| parents.get(id))
                    .map(|p| Box::new(annotations.note(p.clone())));
                Note {
                    parent,
                    ..annotations.note(event)
                }
            })
            .collect();
        Ok(notes)
    }
}
