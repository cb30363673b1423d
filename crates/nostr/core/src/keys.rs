//! Signing keys.
//!
//! A [`Keys`] value is the signing context for one request. Callers own it and
//! pass it explicitly to whatever needs to sign; nothing in this crate keeps a
//! key around.

use crate::nip01::{
    Event, EventTemplate, Nip01Error, finalize_event, generate_secret_key, get_public_key_hex,
};
use crate::nip19::{self, Nip19Error};
use std::fmt;

/// A secret key together with its derived x-only public key.
#[derive(Clone)]
pub struct Keys {
    secret_key: [u8; 32],
    public_key: String,
}

impl Keys {
    /// Build keys from raw secret key bytes.
    pub fn new(secret_key: [u8; 32]) -> Result<Self, Nip01Error> {
        let public_key = get_public_key_hex(&secret_key)?;
        Ok(Self {
            secret_key,
            public_key,
        })
    }

    /// Generate a fresh random key pair.
    pub fn generate() -> Self {
        let secret_key = generate_secret_key();
        // generate_secret_key only returns scalars that parse as secret keys
        let public_key = get_public_key_hex(&secret_key).unwrap_or_default();
        Self {
            secret_key,
            public_key,
        }
    }

    /// Parse an `nsec1...` or 64-character hex secret key.
    pub fn parse(input: &str) -> Result<Self, Nip01Error> {
        let input = input.trim();
        let secret_key = if input.starts_with("nsec1") {
            nip19::decode_nsec(input).map_err(|e| Nip01Error::InvalidSecretKey(e.to_string()))?
        } else {
            let bytes =
                hex::decode(input).map_err(|e| Nip01Error::InvalidSecretKey(e.to_string()))?;
            bytes.try_into().map_err(|b: Vec<u8>| {
                Nip01Error::InvalidSecretKey(format!("expected 32 bytes, got {}", b.len()))
            })?
        };
        Self::new(secret_key)
    }

    /// Hex-encoded x-only public key.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Public key as `npub1...`.
    pub fn npub(&self) -> Result<String, Nip19Error> {
        nip19::encode_npub(&self.public_key)
    }

    /// Sign a template with this key.
    pub fn sign(&self, template: &EventTemplate) -> Result<Event, Nip01Error> {
        finalize_event(template, &self.secret_key)
    }
}

impl fmt::Debug for Keys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keys")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}
