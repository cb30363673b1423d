//! Writing notes, replies and deletion requests.

use super::SocialClient;
use crate::error::{ClientError, Result};
use crate::message::Filter;
use crate::publish::PublishResult;
use nostr::{
    EventTemplate, KIND_SHORT_TEXT_NOTE, Keys, deletion_template, event_id_from_str, reply_tags,
};
use std::collections::BTreeSet;
use tracing::{info, warn};

impl SocialClient {
    /// Sign and publish a top-level text note.
    pub async fn post_note(&self, keys: &Keys, content: &str) -> Result<PublishResult> {
        let event = keys.sign(&EventTemplate::now(KIND_SHORT_TEXT_NOTE, Vec::new(), content))?;
        let result = self.pool.publish(&event).await?;
        info!("Posted note {}", event.id);
        Ok(result)
    }

    /// Sign and publish a reply to `parent_id` (hex or `note1...`).
    ///
    /// The parent is fetched to build the thread tags, so replying to a note
    /// no connected relay has fails with [`ClientError::EventNotFound`].
    pub async fn reply(&self, keys: &Keys, parent_id: &str, content: &str) -> Result<PublishResult> {
        let parent_id = event_id_from_str(parent_id)?;
        let parent = self
            .notes_by_id(std::slice::from_ref(&parent_id))
            .await?
            .remove(&parent_id)
            .ok_or(ClientError::EventNotFound(parent_id))?;

        let template = EventTemplate::now(KIND_SHORT_TEXT_NOTE, reply_tags(&parent), content);
        let event = keys.sign(&template)?;
        let result = self.pool.publish(&event).await?;
        info!("Replied to {} with {}", parent.id, event.id);
        Ok(result)
    }

    /// Sign and publish a deletion request for `ids` (hex or `note1...`).
    ///
    /// The signer's own copies of the events are looked up to add `k` tags;
    /// ids that cannot be found are still requested. `k` tags are optional,
    /// so a lookup that does not finish only costs the kinds it missed.
    pub async fn delete(&self, keys: &Keys, ids: &[String], reason: Option<&str>) -> Result<PublishResult> {
        let ids = ids
            .iter()
            .map(|id| event_id_from_str(id))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let filter = Filter::new()
            .ids(ids.clone())
            .authors(vec![keys.public_key().to_string()]);
        let found = self.pool.query(&filter).await?;
        if !found.is_complete() {
            warn!(
                "Kind lookup for deletion incomplete on {} relays; k tags may be missing",
                found.timed_out().len() + found.failed().len()
            );
        }
        let kinds: BTreeSet<u16> = found.events.iter().map(|e| e.kind).collect();
        let kinds: Vec<u16> = kinds.into_iter().collect();

        let event = keys.sign(&deletion_template(&ids, &kinds, reason))?;
        let result = self.pool.publish(&event).await?;
        info!("Requested deletion of {} events with {}", ids.len(), event.id);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{RELAY, signed, social, tag};
    use super::*;
    use crate::publish::PublishOutcome;
    use nostr::{KIND_EVENT_DELETION, encode_note, verify_event};
    use std::time::Duration;

    #[tokio::test]
    async fn test_post_note() {
        let (social, relay) = social().await;
        let keys = Keys::generate();

        let result = social.post_note(&keys, "hello nostr").await.unwrap();
        assert_eq!(result.outcomes.get(RELAY), Some(&PublishOutcome::Accepted));

        let published = relay.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].id, result.event_id);
        assert_eq!(published[0].content, "hello nostr");
        assert_eq!(published[0].pubkey, keys.public_key());
        assert!(verify_event(&published[0]).unwrap());
    }

    #[tokio::test]
    async fn test_reply_to_nested_note() {
        let (social, relay) = social().await;
        let alice = Keys::generate();
        let bob = Keys::generate();

        let root = signed(&alice, KIND_SHORT_TEXT_NOTE, 100, vec![], "root");
        let middle = signed(
            &alice,
            KIND_SHORT_TEXT_NOTE,
            200,
            vec![tag(&["e", &root.id, "", "root"])],
            "middle",
        );
        relay.add_events(vec![root.clone(), middle.clone()]);

        // Parent given in bech32 form
        let note_id = encode_note(&middle.id).unwrap();
        social.reply(&bob, &note_id, "reply").await.unwrap();

        let reply = relay.published().pop().unwrap();
        assert_eq!(
            reply.tags,
            vec![
                tag(&["e", &root.id, "", "root"]),
                tag(&["e", &middle.id, "", "reply"]),
                tag(&["p", alice.public_key()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_reply_to_missing_note() {
        let (social, relay) = social().await;
        let keys = Keys::generate();

        let result = social.reply(&keys, &"0".repeat(64), "hello?").await;
        assert!(matches!(result, Err(ClientError::EventNotFound(_))));
        assert!(relay.published().is_empty());
    }

    #[tokio::test]
    async fn test_delete_adds_kinds_of_own_events() {
        let (social, relay) = social().await;
        let keys = Keys::generate();
        let note = signed(&keys, KIND_SHORT_TEXT_NOTE, 100, vec![], "oops");
        relay.add_events(vec![note.clone()]);
        let unknown = "a".repeat(64);

        social
            .delete(&keys, &[note.id.clone(), unknown.clone()], Some("typo"))
            .await
            .unwrap();

        let deletion = relay.published().pop().unwrap();
        assert_eq!(deletion.kind, KIND_EVENT_DELETION);
        assert_eq!(deletion.content, "typo");
        let deleted: Vec<&str> = deletion.tag_values("e").collect();
        assert_eq!(deleted, vec![note.id.as_str(), unknown.as_str()]);
        let kinds: Vec<&str> = deletion.tag_values("k").collect();
        assert_eq!(kinds, vec!["1"]);
    }

    #[tokio::test]
    async fn test_delete_rejects_malformed_id() {
        let (social, relay) = social().await;
        let keys = Keys::generate();

        assert!(matches!(
            social.delete(&keys, &["xyz".to_string()], None).await,
            Err(ClientError::Key(_))
        ));
        assert!(relay.published().is_empty());
    }

    #[tokio::test]
    async fn test_reply_when_parent_lookup_fails() {
        let (social, relay) = social().await;
        let alice = Keys::generate();
        let parent = signed(&alice, KIND_SHORT_TEXT_NOTE, 100, vec![], "parent");
        relay.add_events(vec![parent.clone()]);
        relay.fail_fetch("error: database busy");

        let result = social.reply(&Keys::generate(), &parent.id, "hi").await;
        assert!(matches!(result, Err(ClientError::EventNotFound(_))));
        assert!(relay.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_when_kind_lookup_times_out() {
        let (social, relay) = social().await;
        let keys = Keys::generate();
        let note = signed(&keys, KIND_SHORT_TEXT_NOTE, 100, vec![], "oops");
        relay.add_events(vec![note.clone()]);
        relay.set_fetch_delay(Duration::from_secs(3600));

        social.delete(&keys, &[note.id.clone()], None).await.unwrap();

        // Still requested, just without the kind hint
        let deletion = relay.published().pop().unwrap();
        assert_eq!(deletion.kind, KIND_EVENT_DELETION);
        assert_eq!(deletion.tag_values("e").collect::<Vec<_>>(), vec![note.id.as_str()]);
        assert_eq!(deletion.tag_values("k").count(), 0);
    }
}
