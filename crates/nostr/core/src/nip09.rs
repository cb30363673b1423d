//! NIP-09: Event Deletion Request
//!
//! A kind 5 event listing the ids of the author's own events to retract. Relays
//! and clients decide whether to honour it; to the publish path it is an
//! ordinary event.
//!
//! See: <https://github.com/nostr-protocol/nips/blob/master/09.md>

use crate::nip01::{Event, EventTemplate, KIND_EVENT_DELETION, unix_now};

/// Build a deletion request for `event_ids`.
///
/// `kinds` adds one `k` tag per distinct kind being deleted. `reason`, when
/// given, becomes the content.
pub fn deletion_template(event_ids: &[String], kinds: &[u16], reason: Option<&str>) -> EventTemplate {
    let mut tags: Vec<Vec<String>> = event_ids
        .iter()
        .map(|id| vec!["e".to_string(), id.clone()])
        .collect();

    let mut seen = Vec::new();
    for kind in kinds {
        if !seen.contains(kind) {
            seen.push(*kind);
            tags.push(vec!["k".to_string(), kind.to_string()]);
        }
    }

    EventTemplate {
        created_at: unix_now(),
        kind: KIND_EVENT_DELETION,
        tags,
        content: reason.unwrap_or_default().to_string(),
    }
}

/// Ids a deletion request asks to retract.
pub fn deleted_event_ids(event: &Event) -> Vec<&str> {
    if event.kind != KIND_EVENT_DELETION {
        return Vec::new();
    }
    event.tag_values("e").collect()
}
