//! NIP-19: bech32-encoded entities.
//!
//! Only the bare 32-byte forms are supported: `npub`, `nsec` and `note`.

use bech32::{Bech32, Hrp};
use thiserror::Error;

pub const NPUB_HRP: &str = "npub";
pub const NSEC_HRP: &str = "nsec";
pub const NOTE_HRP: &str = "note";

/// Errors that can occur during NIP-19 operations
#[derive(Debug, Error)]
pub enum Nip19Error {
    #[error("bech32 encode error: {0}")]
    Bech32Encode(String),

    #[error("bech32 decode error: {0}")]
    Bech32Decode(String),

    #[error("invalid hrp: expected {expected}, got {got}")]
    InvalidHrp { expected: String, got: String },

    #[error("invalid length: expected 32 bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Encode a 32-byte secret key as `nsec1...`.
pub fn encode_nsec(secret_key: &[u8; 32]) -> Result<String, Nip19Error> {
    encode_bech32(NSEC_HRP, secret_key)
}

/// Decode an `nsec1...` string to a 32-byte secret key.
pub fn decode_nsec(nsec: &str) -> Result<[u8; 32], Nip19Error> {
    decode_bech32(NSEC_HRP, nsec)
}

/// Encode a hex public key as `npub1...`.
pub fn encode_npub(pubkey_hex: &str) -> Result<String, Nip19Error> {
    encode_bech32(NPUB_HRP, &hex_to_32(pubkey_hex)?)
}

/// Decode an `npub1...` string to a hex public key.
pub fn decode_npub(npub: &str) -> Result<String, Nip19Error> {
    Ok(hex::encode(decode_bech32(NPUB_HRP, npub)?))
}

/// Encode a hex event id as `note1...`.
pub fn encode_note(event_id_hex: &str) -> Result<String, Nip19Error> {
    encode_bech32(NOTE_HRP, &hex_to_32(event_id_hex)?)
}

/// Decode a `note1...` string to a hex event id.
pub fn decode_note(note: &str) -> Result<String, Nip19Error> {
    Ok(hex::encode(decode_bech32(NOTE_HRP, note)?))
}

/// Normalize user input naming a public key (`npub1...` or hex) to lowercase hex.
pub fn public_key_from_str(input: &str) -> Result<String, Nip19Error> {
    let input = input.trim();
    if input.starts_with("npub1") {
        decode_npub(input)
    } else {
        hex_to_32(input).map(hex::encode)
    }
}

/// Normalize user input naming an event (`note1...` or hex) to lowercase hex.
pub fn event_id_from_str(input: &str) -> Result<String, Nip19Error> {
    let input = input.trim();
    if input.starts_with("note1") {
        decode_note(input)
    } else {
        hex_to_32(input).map(hex::encode)
    }
}

fn hex_to_32(input: &str) -> Result<[u8; 32], Nip19Error> {
    let bytes = hex::decode(input).map_err(|e| Nip19Error::InvalidHex(e.to_string()))?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| Nip19Error::InvalidLength(len))
}

fn encode_bech32(hrp: &str, data: &[u8; 32]) -> Result<String, Nip19Error> {
    let hrp = Hrp::parse(hrp).map_err(|e| Nip19Error::Bech32Encode(e.to_string()))?;
    bech32::encode::<Bech32>(hrp, data).map_err(|e| Nip19Error::Bech32Encode(e.to_string()))
}

fn decode_bech32(expected_hrp: &str, encoded: &str) -> Result<[u8; 32], Nip19Error> {
    let expected = Hrp::parse(expected_hrp).map_err(|e| Nip19Error::Bech32Decode(e.to_string()))?;

    let (hrp, data) =
        bech32::decode(encoded).map_err(|e| Nip19Error::Bech32Decode(e.to_string()))?;

    if hrp != expected {
        return Err(Nip19Error::InvalidHrp {
            expected: expected_hrp.to_string(),
            got: hrp.to_string(),
        });
    }

    let len = data.len();
    data.try_into().map_err(|_| Nip19Error::InvalidLength(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    // NIP-06 test vector 1
    const PRIVATE_KEY: &str = "7f7ff03d123792d6ac594bfa67bf6d0c0ab55b6b1fdb6249303fe861f1ccba9a";
    const NSEC: &str = "nsec10allq0gjx7fddtzef0ax00mdps9t2kmtrldkyjfs8l5xruwvh2dq0lhhkp";
    const PUBLIC_KEY: &str = "17162c921dc4d2518f9a101db33695df1afb56ab82f5ff3e5da6eec3ca5cd917";
    const NPUB: &str = "npub1zutzeysacnf9rru6zqwmxd54mud0k44tst6l70ja5mhv8jjumytsd2x7nu";

    #[test]
    fn test_nsec_vector() {
        let key = decode_nsec(NSEC).unwrap();
        assert_eq!(hex::encode(key), PRIVATE_KEY);
        assert_eq!(encode_nsec(&key).unwrap(), NSEC);
    }

    #[test]
    fn test_npub_vector() {
        assert_eq!(decode_npub(NPUB).unwrap(), PUBLIC_KEY);
        assert_eq!(encode_npub(PUBLIC_KEY).unwrap(), NPUB);
    }

    #[test]
    fn test_wrong_hrp_rejected() {
        match decode_nsec(NPUB) {
            Err(Nip19Error::InvalidHrp { expected, got }) => {
                assert_eq!(expected, "nsec");
                assert_eq!(got, "npub");
            }
            other => panic!("expected InvalidHrp, got {:?}", other),
        }
    }

    #[test]
    fn test_public_key_from_str_accepts_both_forms() {
        assert_eq!(public_key_from_str(NPUB).unwrap(), PUBLIC_KEY);
        assert_eq!(public_key_from_str(&PUBLIC_KEY.to_uppercase()).unwrap(), PUBLIC_KEY);
        assert!(public_key_from_str("abcd").is_err());
    }

    #[test]
    fn test_note_encoding() {
        let id = "b".repeat(64);
        let note = encode_note(&id).unwrap();
        assert!(note.starts_with("note1"));
        assert_eq!(event_id_from_str(&note).unwrap(), id);
    }
}
