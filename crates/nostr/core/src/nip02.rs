//! NIP-02: Follow List (Contact List and Petnames)
//!
//! Users publish their follow list as a kind 3 event. Each followed profile is a
//! "p" tag with optional relay URL and petname. A new list replaces the old one
//! wholesale, so follow and unfollow rebuild the previous list with one change.
//!
//! See: <https://github.com/nostr-protocol/nips/blob/master/02.md>

use crate::nip01::{Event, EventTemplate, KIND_CONTACTS, unix_now};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during NIP-02 operations
#[derive(Debug, Error)]
pub enum Nip02Error {
    #[error("invalid event kind: expected 3, got {0}")]
    InvalidKind(u16),

    #[error("invalid p-tag format: {0}")]
    InvalidPTag(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
}

/// A single contact in a follow list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// The public key of the followed profile (32-byte hex)
    pub pubkey: String,

    /// Optional relay URL where this profile can be found
    pub relay_url: Option<String>,

    /// Optional local petname for this contact
    pub petname: Option<String>,
}

impl Contact {
    /// Create a new contact with just a public key
    pub fn new(pubkey: impl Into<String>) -> Self {
        Self {
            pubkey: pubkey.into(),
            relay_url: None,
            petname: None,
        }
    }

    /// Convert contact to a p-tag array
    pub fn to_tag(&self) -> Vec<String> {
        let mut tag = vec!["p".to_string(), self.pubkey.clone()];

        if self.relay_url.is_some() || self.petname.is_some() {
            tag.push(self.relay_url.clone().unwrap_or_default());
        }
        if let Some(ref petname) = self.petname {
            tag.push(petname.clone());
        }

        tag
    }

    /// Parse a contact from a p-tag array
    pub fn from_tag(tag: &[String]) -> Result<Self, Nip02Error> {
        if tag.is_empty() || tag[0] != "p" {
            return Err(Nip02Error::InvalidPTag(
                "tag must start with 'p'".to_string(),
            ));
        }

        if tag.len() < 2 {
            return Err(Nip02Error::InvalidPTag(
                "p-tag must have at least pubkey".to_string(),
            ));
        }

        let pubkey = tag[1].clone();
        if pubkey.len() != 64 || !pubkey.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Nip02Error::InvalidPublicKey(format!(
                "pubkey must be 64-character hex, got: {}",
                pubkey
            )));
        }

        let non_empty = |i: usize| tag.get(i).filter(|s| !s.is_empty()).cloned();

        Ok(Self {
            pubkey,
            relay_url: non_empty(2),
            petname: non_empty(3),
        })
    }
}

/// Contact list (follow list) event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactList {
    pub event: Event,
    pub contacts: Vec<Contact>,
}

impl ContactList {
    /// Parse a contact list from a kind 3 event.
    ///
    /// Malformed p-tags are skipped rather than rejected; lists in the wild
    /// routinely carry a few.
    pub fn from_event(event: Event) -> Result<Self, Nip02Error> {
        if event.kind != KIND_CONTACTS {
            return Err(Nip02Error::InvalidKind(event.kind));
        }

        let mut contacts: Vec<Contact> = Vec::new();
        for tag in &event.tags {
            if let Ok(contact) = Contact::from_tag(tag)
                && !contacts.iter().any(|c| c.pubkey == contact.pubkey)
            {
                contacts.push(contact);
            }
        }

        Ok(Self { event, contacts })
    }

    /// Get all contacts in the list
    pub fn get_contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Check if a public key is in the contact list
    pub fn contains(&self, pubkey: &str) -> bool {
        self.contacts.iter().any(|c| c.pubkey == pubkey)
    }

    /// Get all public keys in the contact list
    pub fn get_pubkeys(&self) -> Vec<String> {
        self.contacts.iter().map(|c| c.pubkey.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

fn lists_pubkey(tags: &[Vec<String>], pubkey: &str) -> bool {
    tags.iter()
        .any(|t| t.len() >= 2 && t[0] == "p" && t[1] == pubkey)
}

/// Build the contact list that follows `pubkey` on top of `previous`.
///
/// Existing content and every other tag are carried over unchanged. Returns
/// `None` when `pubkey` is already followed.
pub fn follow_template(previous: Option<&Event>, pubkey: &str) -> Option<EventTemplate> {
    let (mut tags, content) = match previous {
        Some(event) => (event.tags.clone(), event.content.clone()),
        None => (Vec::new(), String::new()),
    };

    if lists_pubkey(&tags, pubkey) {
        return None;
    }
    tags.push(Contact::new(pubkey).to_tag());

    Some(EventTemplate {
        created_at: unix_now(),
        kind: KIND_CONTACTS,
        tags,
        content,
    })
}

/// Build the contact list that drops `pubkey` from `previous`.
///
/// Returns `None` when there is no previous list or it does not list `pubkey`.
pub fn unfollow_template(previous: Option<&Event>, pubkey: &str) -> Option<EventTemplate> {
    let event = previous?;
    if !lists_pubkey(&event.tags, pubkey) {
        return None;
    }

    let tags = event
        .tags
        .iter()
        .filter(|t| !(t.len() >= 2 && t[0] == "p" && t[1] == pubkey))
        .cloned()
        .collect();

    Some(EventTemplate {
        created_at: unix_now(),
        kind: KIND_CONTACTS,
        tags,
        content: event.content.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_event(tags: Vec<Vec<String>>) -> Event {
        Event {
            id: "test".to_string(),
            pubkey: "test_pubkey".to_string(),
            created_at: 1234567890,
            kind: KIND_CONTACTS,
            tags,
            content: "{\"wss://relay.example.com\":{\"read\":true}}".to_string(),
            sig: "test_sig".to_string(),
        }
    }

    fn p(pubkey: &str) -> Vec<String> {
        vec!["p".to_string(), pubkey.to_string()]
    }

    #[test]
    fn test_contact_to_tag() {
        let mut contact = Contact::new("a".repeat(64));
        assert_eq!(contact.to_tag().len(), 2);

        contact.petname = Some("bob".to_string());
        let tag = contact.to_tag();
        assert_eq!(tag, vec!["p".to_string(), "a".repeat(64), String::new(), "bob".to_string()]);
    }

    #[test]
    fn test_contact_from_tag() {
        let pubkey = "b".repeat(64);
        let tag = vec![
            "p".to_string(),
            pubkey.clone(),
            "wss://relay.com".to_string(),
            "carol".to_string(),
        ];

        let contact = Contact::from_tag(&tag).unwrap();
        assert_eq!(contact.pubkey, pubkey);
        assert_eq!(contact.relay_url, Some("wss://relay.com".to_string()));
        assert_eq!(contact.petname, Some("carol".to_string()));

        assert!(Contact::from_tag(&p("invalid")).is_err());
    }

    #[test]
    fn test_contact_list_skips_bad_tags_and_duplicates() {
        let event = create_test_event(vec![
            p(&"a".repeat(64)),
            p("not-a-key"),
            vec!["t".to_string(), "nostr".to_string()],
            p(&"b".repeat(64)),
            p(&"a".repeat(64)),
        ]);

        let list = ContactList::from_event(event).unwrap();
        assert_eq!(list.get_pubkeys(), vec!["a".repeat(64), "b".repeat(64)]);
        assert!(list.contains(&"b".repeat(64)));
        assert!(!list.contains(&"c".repeat(64)));
    }

    #[test]
    fn test_contact_list_rejects_wrong_kind() {
        let mut event = create_test_event(vec![]);
        event.kind = 1;
        assert!(matches!(
            ContactList::from_event(event),
            Err(Nip02Error::InvalidKind(1))
        ));
    }

    #[test]
    fn test_follow_preserves_existing_tags_and_content() {
        let previous = create_test_event(vec![
            p(&"a".repeat(64)),
            vec!["t".to_string(), "nostr".to_string()],
        ]);

        let template = follow_template(Some(&previous), &"b".repeat(64)).unwrap();
        assert_eq!(template.kind, KIND_CONTACTS);
        assert_eq!(template.content, previous.content);
        assert_eq!(template.tags.len(), 3);
        assert_eq!(template.tags[..2], previous.tags[..]);
        assert_eq!(template.tags[2], p(&"b".repeat(64)));
    }

    #[test]
    fn test_follow_without_previous_list() {
        let template = follow_template(None, &"b".repeat(64)).unwrap();
        assert_eq!(template.tags, vec![p(&"b".repeat(64))]);
        assert!(template.content.is_empty());
    }

    #[test]
    fn test_follow_already_followed_is_noop() {
        let previous = create_test_event(vec![p(&"a".repeat(64))]);
        assert!(follow_template(Some(&previous), &"a".repeat(64)).is_none());
    }

    #[test]
    fn test_unfollow_removes_only_target() {
        let previous = create_test_event(vec![
            p(&"a".repeat(64)),
            p(&"b".repeat(64)),
            vec!["t".to_string(), "nostr".to_string()],
        ]);

        let template = unfollow_template(Some(&previous), &"a".repeat(64)).unwrap();
        assert_eq!(
            template.tags,
            vec![p(&"b".repeat(64)), vec!["t".to_string(), "nostr".to_string()]]
        );
        assert_eq!(template.content, previous.content);
    }

    #[test]
    fn test_unfollow_absent_is_noop() {
        let previous = create_test_event(vec![p(&"a".repeat(64))]);
        assert!(unfollow_template(Some(&previous), &"c".repeat(64)).is_none());
        assert!(unfollow_template(None, &"a".repeat(64)).is_none());
    }
}
