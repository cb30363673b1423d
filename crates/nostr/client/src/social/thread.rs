//! Threads: a note and the replies around it, assembled into a tree.

use super::feed::{Annotations, Note};
use super::{SocialClient, THREAD_EVENT_LIMIT};
use crate::error::{ClientError, Result};
use crate::message::Filter;
use nostr::{Event, KIND_SHORT_TEXT_NOTE, event_id_from_str, reply_parent_id, thread_root_id};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A note and its direct replies, each with their own replies.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadNode {
    pub note: Note,
    /// Oldest first
    pub replies: Vec<ThreadNode>,
}

impl ThreadNode {
    /// Number of replies below this node, at any depth.
    pub fn descendant_count(&self) -> usize {
        self.replies
            .iter()
            .map(|r| 1 + r.descendant_count())
            .sum()
    }
}

/// A conversation centred on one note.
#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    /// Root of the conversation; the focus note's own id when it is top-level
    pub root_id: String,
    /// The requested note, with its parent attached, and every reply below it
    pub focus: ThreadNode,
}

/// Builds the reply tree from a parent -> children index.
struct TreeBuilder<'a> {
    children: HashMap<&'a str, Vec<&'a Event>>,
    annotations: &'a Annotations,
    visited: HashSet<&'a str>,
}

impl<'a> TreeBuilder<'a> {
    fn new(events: &'a [Event], annotations: &'a Annotations) -> Self {
        let mut children: HashMap<&str, Vec<&Event>> = HashMap::new();
        for event in events {
            if let Some(parent) = reply_parent_id(event) {
                children.entry(parent).or_default().push(event);
            }
        }
        for siblings in children.values_mut() {
            siblings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        }

        Self {
            children,
            annotations,
            visited: HashSet::new(),
        }
    }

    fn node(&mut self, event: &'a Event) -> ThreadNode {
        self.visited.insert(&event.id);

        let mut replies = Vec::new();
        let children = self.children.get(event.id.as_str()).cloned().unwrap_or_default();
        for child in children {
            // Ids are hashes, but a relay can still send a crafted cycle
            if !self.visited.contains(child.id.as_str()) {
                replies.push(self.node(child));
            }
        }

        ThreadNode {
            note: self.annotations.note(event.clone()),
            replies,
        }
    }
}

impl SocialClient {
    /// The note `id` (hex or `note1...`), its parent, and every reply below it.
    ///
    /// Replies are gathered from kind 1 events tagging the note or its
    /// thread root, up to [`THREAD_EVENT_LIMIT`]. Each reply hangs under its
    /// `reply`-marked parent, else its last `e` tag; replies whose parent was
    /// not fetched are left out.
    pub async fn thread(&self, id: &str) -> Result<Thread> {
        let id = event_id_from_str(id)?;
        let focus = self
            .notes_by_id(std::slice::from_ref(&id))
            .await?
            .remove(&id)
            .ok_or_else(|| ClientError::EventNotFound(id.clone()))?;

        let root_id = thread_root_id(&focus).unwrap_or(&focus.id).to_string();
        let mut refs = vec![id.clone()];
        if root_id != id {
            refs.push(root_id.clone());
        }

        let filter = Filter::new()
            .kinds(vec![KIND_SHORT_TEXT_NOTE])
            .event_refs(refs)
            .limit(THREAD_EVENT_LIMIT);
        let mut events: Vec<Event> = self
            .pool
            .fetch_events(&filter)
            .await?
            .into_iter()
            .filter(|e| e.id != id)
            .collect();
        debug!("Thread {} has {} related events", id, events.len());

        let parent = match reply_parent_id(&focus) {
            Some(parent_id) => match events.iter().find(|e| e.id == parent_id) {
                Some(parent) => Some(parent.clone()),
                None => self
                    .notes_by_id(&[parent_id.to_string()])
                    .await?
                    .remove(parent_id),
            },
            None => None,
        };

        let mut all: Vec<&Event> = events.iter().collect();
        all.push(&focus);
        all.extend(parent.as_ref());
        let annotations = self.annotate(&all).await?;

        events.push(focus);
        let focus_index = events.len() - 1;
        let mut builder = TreeBuilder::new(&events, &annotations);
        let mut focus_node = builder.node(&events[focus_index]);
        focus_node.note.parent = parent.map(|p| Box::new(annotations.note(p)));

        Ok(Thread {
            root_id,
            focus: focus_node,
        })
    }
}
