//! NIP-10: Text Notes and Threads
//!
//! Defines conventions for replies, mentions, and threading in kind 1 text notes
//! using e-tags with markers (root, reply, mention) and p-tags for participants.
//!
//! See: <https://github.com/nostr-protocol/nips/blob/master/10.md>

use crate::nip01::{Event, KIND_SHORT_TEXT_NOTE};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during NIP-10 operations
#[derive(Debug, Error)]
pub enum Nip10Error {
    #[error("invalid event kind: expected 1, got {0}")]
    InvalidKind(u16),

    #[error("invalid e-tag format: {0}")]
    InvalidETag(String),
}

/// E-tag marker types for thread structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ETagMarker {
    /// The root event of a thread
    Root,

    /// The immediate parent event being replied to
    Reply,

    /// A mentioned event (not part of reply chain)
    Mention,
}

impl ETagMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            ETagMarker::Root => "root",
            ETagMarker::Reply => "reply",
            ETagMarker::Mention => "mention",
        }
    }
}

impl FromStr for ETagMarker {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(ETagMarker::Root),
            "reply" => Ok(ETagMarker::Reply),
            "mention" => Ok(ETagMarker::Mention),
            _ => Err(()),
        }
    }
}

/// An e-tag reference to another event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventReference {
    /// Event ID being referenced
    pub event_id: String,

    /// Recommended relay URL (optional)
    pub relay_url: Option<String>,

    /// Marker indicating role in thread (optional)
    pub marker: Option<ETagMarker>,

    /// Author's public key (optional but recommended)
    pub author_pubkey: Option<String>,
}

impl EventReference {
    /// Reference with a marker and no relay hint.
    pub fn marked(event_id: impl Into<String>, marker: ETagMarker) -> Self {
        Self {
            event_id: event_id.into(),
            relay_url: None,
            marker: Some(marker),
            author_pubkey: None,
        }
    }

    /// Parse an event reference from an e-tag
    pub fn from_tag(tag: &[String]) -> Result<Self, Nip10Error> {
        if tag.is_empty() || tag[0] != "e" {
            return Err(Nip10Error::InvalidETag(
                "tag must start with 'e'".to_string(),
            ));
        }

        if tag.len() < 2 {
            return Err(Nip10Error::InvalidETag(
                "e-tag must have at least event ID".to_string(),
            ));
        }

        let non_empty = |i: usize| tag.get(i).filter(|s| !s.is_empty());

        Ok(Self {
            event_id: tag[1].clone(),
            relay_url: non_empty(2).cloned(),
            marker: non_empty(3).and_then(|m| ETagMarker::from_str(m).ok()),
            author_pubkey: non_empty(4).cloned(),
        })
    }

    /// Convert to an e-tag array
    pub fn to_tag(&self) -> Vec<String> {
        let mut tag = vec!["e".to_string(), self.event_id.clone()];

        // Relay slot is positional, so it is kept (empty) when a marker follows
        tag.push(self.relay_url.clone().unwrap_or_default());

        if let Some(ref marker) = self.marker {
            tag.push(marker.as_str().to_string());

            if let Some(ref pubkey) = self.author_pubkey {
                tag.push(pubkey.clone());
            }
        }

        tag
    }
}

/// A text note with thread/reply metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNote {
    pub event: Event,
    pub event_references: Vec<EventReference>,
    pub mentioned_pubkeys: Vec<String>,
}

impl TextNote {
    /// Create a text note from an event
    pub fn from_event(event: Event) -> Result<Self, Nip10Error> {
        if event.kind != KIND_SHORT_TEXT_NOTE {
            return Err(Nip10Error::InvalidKind(event.kind));
        }

        let event_references = event
            .tags
            .iter()
            .filter(|t| !t.is_empty() && t[0] == "e")
            .map(|t| EventReference::from_tag(t))
            .collect::<Result<Vec<_>, _>>()?;

        let mentioned_pubkeys = event.tag_values("p").map(str::to_string).collect();

        Ok(Self {
            event,
            event_references,
            mentioned_pubkeys,
        })
    }

    /// Check if this is a reply to another event
    pub fn is_reply(&self) -> bool {
        !self.event_references.is_empty()
    }

    /// Get the root event of the thread (if this is a reply)
    pub fn get_thread_root(&self) -> Option<&EventReference> {
        self.event_references
            .iter()
            .find(|r| r.marker == Some(ETagMarker::Root))
            // Deprecated positional form: first e-tag is the root
            .or_else(|| self.event_references.first())
    }

    /// Get the immediate parent being replied to (if this is a reply)
    pub fn get_reply_target(&self) -> Option<&EventReference> {
        self.event_references
            .iter()
            .find(|r| r.marker == Some(ETagMarker::Reply))
            // Deprecated positional form: last e-tag is the parent
            .or_else(|| self.event_references.last())
    }

    /// Get the author's public key
    pub fn author_pubkey(&self) -> &str {
        &self.event.pubkey
    }
}

/// Id of the event `event` replies to: the `reply` marker, else the last e-tag.
///
/// Works on any kind and never fails; malformed e-tags are ignored.
pub fn reply_parent_id(event: &Event) -> Option<&str> {
    let e_tags: Vec<&Vec<String>> = event
        .tags
        .iter()
        .filter(|t| t.len() >= 2 && t[0] == "e")
        .collect();

    e_tags
        .iter()
        .find(|t| t.get(3).map(String::as_str) == Some("reply"))
        .or_else(|| e_tags.last())
        .map(|t| t[1].as_str())
}

/// Id of the thread root `event` belongs to: the `root` marker, else the first e-tag.
pub fn thread_root_id(event: &Event) -> Option<&str> {
    let mut e_tags = event.tags.iter().filter(|t| t.len() >= 2 && t[0] == "e");
    let first = e_tags.clone().next();

    e_tags
        .find(|t| t.get(3).map(String::as_str) == Some("root"))
        .or(first)
        .map(|t| t[1].as_str())
}

/// Tags for a reply to `parent`.
///
/// A reply to a top-level note marks the parent as root. A reply deeper in a
/// thread keeps the parent's root and marks the parent as reply. The parent's
/// author is always tagged.
pub fn reply_tags(parent: &Event) -> Vec<Vec<String>> {
    let mut tags = Vec::new();

    match thread_root_id(parent) {
        Some(root) => {
            tags.push(EventReference::marked(root, ETagMarker::Root).to_tag());
            tags.push(EventReference::marked(&parent.id, ETagMarker::Reply).to_tag());
        }
        None => {
            tags.push(EventReference::marked(&parent.id, ETagMarker::Root).to_tag());
        }
    }

    tags.push(vec!["p".to_string(), parent.pubkey.clone()]);
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_event(tags: Vec<Vec<String>>) -> Event {
        Event {
            id: "note_id".to_string(),
            pubkey: "author_pubkey".to_string(),
            created_at: 1234567890,
            kind: KIND_SHORT_TEXT_NOTE,
            tags,
            content: "Hello Nostr!".to_string(),
            sig: "test_sig".to_string(),
        }
    }

    fn e(id: &str) -> Vec<String> {
        vec!["e".to_string(), id.to_string()]
    }

    fn e_marked(id: &str, marker: &str) -> Vec<String> {
        vec![
            "e".to_string(),
            id.to_string(),
            String::new(),
            marker.to_string(),
        ]
    }

    #[test]
    fn test_etag_marker_from_str() {
        assert_eq!(ETagMarker::from_str("root"), Ok(ETagMarker::Root));
        assert_eq!(ETagMarker::from_str("reply"), Ok(ETagMarker::Reply));
        assert_eq!(ETagMarker::from_str("mention"), Ok(ETagMarker::Mention));
        assert!(ETagMarker::from_str("unknown").is_err());
    }

    #[test]
    fn test_event_reference_round_trip() {
        let tag = vec![
            "e".to_string(),
            "abc".to_string(),
            "wss://relay.com".to_string(),
            "reply".to_string(),
            "pk".to_string(),
        ];
        let eref = EventReference::from_tag(&tag).unwrap();
        assert_eq!(eref.marker, Some(ETagMarker::Reply));
        assert_eq!(eref.author_pubkey.as_deref(), Some("pk"));
        assert_eq!(eref.to_tag(), tag);
    }

    #[test]
    fn test_text_note_rejects_wrong_kind() {
        let mut event = create_test_event(vec![]);
        event.kind = 3;
        assert!(matches!(
            TextNote::from_event(event),
            Err(Nip10Error::InvalidKind(3))
        ));
    }

    #[test]
    fn test_marked_root_and_reply() {
        let event = create_test_event(vec![
            e_marked("reply_id", "reply"),
            e_marked("root_id", "root"),
            vec!["p".to_string(), "someone".to_string()],
        ]);
        let note = TextNote::from_event(event.clone()).unwrap();

        assert!(note.is_reply());
        assert_eq!(note.get_thread_root().unwrap().event_id, "root_id");
        assert_eq!(note.get_reply_target().unwrap().event_id, "reply_id");
        assert_eq!(note.mentioned_pubkeys, vec!["someone".to_string()]);

        assert_eq!(thread_root_id(&event), Some("root_id"));
        assert_eq!(reply_parent_id(&event), Some("reply_id"));
    }

    #[test]
    fn test_positional_fallback() {
        let event = create_test_event(vec![e("first"), e("middle"), e("last")]);
        let note = TextNote::from_event(event.clone()).unwrap();

        assert_eq!(note.get_thread_root().unwrap().event_id, "first");
        assert_eq!(note.get_reply_target().unwrap().event_id, "last");
        assert_eq!(thread_root_id(&event), Some("first"));
        assert_eq!(reply_parent_id(&event), Some("last"));
    }

    #[test]
    fn test_top_level_note_has_no_thread() {
        let event = create_test_event(vec![vec!["t".to_string(), "nostr".to_string()]]);
        assert!(!TextNote::from_event(event.clone()).unwrap().is_reply());
        assert_eq!(thread_root_id(&event), None);
        assert_eq!(reply_parent_id(&event), None);
    }

    #[test]
    fn test_reply_tags_to_top_level_note() {
        let parent = create_test_event(vec![]);
        let tags = reply_tags(&parent);
        assert_eq!(
            tags,
            vec![
                e_marked("note_id", "root"),
                vec!["p".to_string(), "author_pubkey".to_string()],
            ]
        );
    }

    #[test]
    fn test_reply_tags_inside_thread() {
        let parent = create_test_event(vec![e_marked("root_id", "root")]);
        let tags = reply_tags(&parent);
        assert_eq!(
            tags,
            vec![
                e_marked("root_id", "root"),
                e_marked("note_id", "reply"),
                vec!["p".to_string(), "author_pubkey".to_string()],
            ]
        );
    }
}
