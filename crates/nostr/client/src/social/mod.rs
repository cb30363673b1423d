//! Social views and actions built on the relay pool.
//!
//! Every read is one or more query fan-outs and every write is one publish
//! fan-out. Signing keys are passed into each write; the client itself holds
//! no identity.
//!
//! # Example
//!
//! ```rust,no_run
//! use nostr_client::{PoolConfig, RelayPool, SocialClient};
//! use std::sync::Arc;
//!
//! # async fn run() -> nostr_client::Result<()> {
//! let pool = Arc::new(RelayPool::new(PoolConfig::default()));
//! pool.add_configured_relays().await?;
//! pool.connect().await;
//!
//! let social = SocialClient::new(pool);
//! let page = social.global_feed(20, None).await?;
//! for note in &page.notes {
//!     println!("{}: {}", note.author_name(), note.event.content);
//! }
//! # Ok(())
//! # }
//! ```

mod compose;
mod contacts;
mod feed;
mod profiles;
mod thread;

pub use feed::{FeedPage, Note};
pub use profiles::ProfileCache;
pub use thread::{Thread, ThreadNode};

use crate::pool::RelayPool;
use nostr::public_key_from_str;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Most authors or profile keys put in one filter; many relays reject larger ones.
pub const MAX_FILTER_AUTHORS: usize = 250;

/// Most events fetched for one thread.
pub const THREAD_EVENT_LIMIT: u64 = 500;

/// Most contact lists examined when looking for followers.
pub const FOLLOWER_SCAN_LIMIT: u64 = 500;

/// Over-fetch factor for reply-only feeds, which discard top-level notes.
pub const REPLY_OVERFETCH: u64 = 4;

/// Feed, profile, thread and contact operations over a [`RelayPool`].
pub struct SocialClient {
    pool: Arc<RelayPool>,
    profile_cache: Mutex<ProfileCache>,
}

impl SocialClient {
    /// Wrap a pool. The profile cache is sized from the pool configuration.
    pub fn new(pool: Arc<RelayPool>) -> Self {
        let capacity = pool.config().profile_cache_size;
        Self {
            pool,
            profile_cache: Mutex::new(ProfileCache::new(capacity)),
        }
    }

    pub fn pool(&self) -> &Arc<RelayPool> {
        &self.pool
    }
}

/// Normalize public keys to hex, dropping malformed ones and duplicates.
fn normalize_pubkeys(inputs: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut pubkeys = Vec::with_capacity(inputs.len());
    for input in inputs {
        match public_key_from_str(input) {
            Ok(pubkey) => {
                if seen.insert(pubkey.clone()) {
                    pubkeys.push(pubkey);
                }
            }
            Err(e) => warn!("Skipping public key {:?}: {}", input, e),
        }
    }
    pubkeys
}
