//! Kind 0 profile metadata.
//!
//! The content of a kind 0 event is a JSON object. Unknown fields are kept so
//! nothing is lost when a profile is re-published.

use crate::nip01::{Event, KIND_METADATA};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parsed profile metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nip05: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lud16: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProfileMetadata {
    /// Parse the content of a kind 0 event.
    ///
    /// Returns `None` for other kinds or content that is not a JSON object.
    /// Fields of the wrong JSON type are dropped instead of failing the whole
    /// profile.
    pub fn from_event(event: &Event) -> Option<Self> {
        if event.kind != KIND_METADATA {
            return None;
        }
        let Value::Object(mut map) = serde_json::from_str::<Value>(&event.content).ok()? else {
            return None;
        };

        let mut take = |key: &str| match map.remove(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        };

        Some(Self {
            name: take("name"),
            display_name: take("display_name").or_else(|| take("displayName")),
            about: take("about"),
            picture: take("picture"),
            banner: take("banner"),
            website: take("website"),
            nip05: take("nip05"),
            lud16: take("lud16"),
            extra: map,
        })
    }

    /// Name to show for this profile: `display_name`, else `name`.
    pub fn best_name(&self) -> Option<&str> {
        self.display_name.as_deref().or(self.name.as_deref())
    }
}
