//! Nostr protocol core.
//!
//! This crate provides:
//! - NIP-01: Basic protocol (events, hashing, signing, verification, feed order)
//! - NIP-02: Follow List (contact lists, follow/unfollow)
//! - NIP-09: Event Deletion Request
//! - NIP-10: Text Notes and Threads (reply resolution and reply tags)
//! - NIP-19: bech32-encoded keys and note ids
//! - Kind 0 profile metadata
//! - [`Keys`], the per-request signing context

mod keys;
mod metadata;
mod nip01;
mod nip02;
mod nip09;
mod nip10;
mod nip19;

// NIP-01: Basic protocol
pub use nip01::{
    Event, EventTemplate, KIND_CONTACTS, KIND_EVENT_DELETION, KIND_METADATA, KIND_SHORT_TEXT_NOTE,
    Nip01Error, UnsignedEvent, finalize_event, generate_secret_key, get_event_hash,
    get_public_key, get_public_key_hex, serialize_event, sort_events, unix_now, validate_event,
    verify_event,
};

// Signing keys
pub use keys::Keys;

// Kind 0 profile metadata
pub use metadata::ProfileMetadata;

// NIP-02: Follow List (Contact List and Petnames)
pub use nip02::{Contact, ContactList, Nip02Error, follow_template, unfollow_template};

// NIP-09: Event Deletion Request
pub use nip09::{deleted_event_ids, deletion_template};

// NIP-10: Text Notes and Threads
pub use nip10::{
    ETagMarker, EventReference, Nip10Error, TextNote, reply_parent_id, reply_tags, thread_root_id,
};

// NIP-19: bech32-encoded entities
pub use nip19::{
    Nip19Error, decode_note, decode_npub, decode_nsec, encode_note, encode_npub, encode_nsec,
    event_id_from_str, public_key_from_str,
};
