//! Profile lookups with LRU caching

use super::{MAX_FILTER_AUTHORS, SocialClient, normalize_pubkeys};
use crate::error::Result;
use crate::message::Filter;
use nostr::{KIND_METADATA, ProfileMetadata, public_key_from_str};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

#[derive(Debug, Clone)]
struct CachedProfile {
    /// created_at of the kind 0 event the profile came from
    created_at: u64,
    metadata: ProfileMetadata,
}

/// Profile cache with LRU eviction.
///
/// A capacity of zero disables caching.
#[derive(Debug)]
pub struct ProfileCache {
    capacity: usize,
    /// Profiles by pubkey
    profiles: HashMap<String, CachedProfile>,
    /// LRU queue (pubkeys in access order, oldest first)
    lru_queue: VecDeque<String>,
}

impl ProfileCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            profiles: HashMap::new(),
            lru_queue: VecDeque::new(),
        }
    }

    /// Insert a profile unless the cache already holds a newer one.
    ///
    /// Returns whether the cache now holds `metadata` for `pubkey`.
    pub fn insert(&mut self, pubkey: &str, created_at: u64, metadata: ProfileMetadata) -> bool {
        if self.capacity == 0 {
            return false;
        }

        if let Some(existing) = self.profiles.get_mut(pubkey) {
            if created_at < existing.created_at {
                return false;
            }
            existing.created_at = created_at;
            existing.metadata = metadata;
            self.touch(pubkey);
            return true;
        }

        if self.profiles.len() >= self.capacity
            && let Some(oldest) = self.lru_queue.pop_front()
        {
            self.profiles.remove(&oldest);
        }

        self.profiles.insert(
            pubkey.to_string(),
            CachedProfile {
                created_at,
                metadata,
            },
        );
        self.lru_queue.push_back(pubkey.to_string());
        true
    }

    /// Get a profile, marking it most recently used.
    pub fn get(&mut self, pubkey: &str) -> Option<ProfileMetadata> {
        let metadata = self.profiles.get(pubkey)?.metadata.clone();
        self.touch(pubkey);
        Some(metadata)
    }

    pub fn contains(&self, pubkey: &str) -> bool {
        self.profiles.contains_key(pubkey)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn clear(&mut self) {
        self.profiles.clear();
        self.lru_queue.clear();
    }

    fn touch(&mut self, pubkey: &str) {
        self.lru_queue.retain(|pk| pk != pubkey);
        self.lru_queue.push_back(pubkey.to_string());
    }
}

impl SocialClient {
    /// Latest profile metadata for each of `pubkeys`.
    ///
    /// Cached profiles are served without a query. At most
    /// [`MAX_FILTER_AUTHORS`] uncached keys are looked up per call; authors
    /// with no parseable kind 0 event are absent from the map.
    pub async fn profiles(&self, pubkeys: &[String]) -> Result<HashMap<String, ProfileMetadata>> {
        let mut found = HashMap::new();
        let mut missing = Vec::new();

        {
            let mut cache = self.profile_cache.lock();
            for pubkey in normalize_pubkeys(pubkeys) {
                match cache.get(&pubkey) {
                    Some(metadata) => {
                        found.insert(pubkey, metadata);
                    }
                    None => missing.push(pubkey),
                }
            }
        }

        if missing.is_empty() {
            return Ok(found);
        }
        missing.truncate(MAX_FILTER_AUTHORS);
        debug!(
            "Profile cache: {} hits, {} lookups",
            found.len(),
            missing.len()
        );

        let filter = Filter::new().kinds(vec![KIND_METADATA]).authors(missing);
        let events = self.pool.fetch_events(&filter).await?;

        // Newest first, so the first parseable event per author wins
        let mut cache = self.profile_cache.lock();
        for event in &events {
            if found.contains_key(&event.pubkey) {
                continue;
            }
            if let Some(metadata) = ProfileMetadata::from_event(event) {
                cache.insert(&event.pubkey, event.created_at, metadata.clone());
                found.insert(event.pubkey.clone(), metadata);
            }
        }

        Ok(found)
    }

    /// Latest profile of one author.
    pub async fn profile(&self, pubkey: &str) -> Result<Option<ProfileMetadata>> {
        let pubkey = public_key_from_str(pubkey)?;
        let mut profiles = self.profiles(std::slice::from_ref(&pubkey)).await?;
        Ok(profiles.remove(&pubkey))
    }

    /// Drop every cached profile.
    pub fn clear_profile_cache(&self) {
        self.profile_cache.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> ProfileMetadata {
        ProfileMetadata {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_cache_insert_and_get() {
        let mut cache = ProfileCache::new(10);
        assert!(cache.insert("alice", 100, named("alice")));

        assert_eq!(cache.get("alice").unwrap().name.as_deref(), Some("alice"));
        assert!(cache.get("bob").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_ignores_older_profile() {
        let mut cache = ProfileCache::new(10);
        cache.insert("alice", 200, named("new"));

        assert!(!cache.insert("alice", 100, named("old")));
        assert_eq!(cache.get("alice").unwrap().name.as_deref(), Some("new"));

        assert!(cache.insert("alice", 300, named("newer")));
        assert_eq!(cache.get("alice").unwrap().name.as_deref(), Some("newer"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_lru_eviction() {
        let mut cache = ProfileCache::new(2);
        cache.insert("a", 1, named("a"));
        cache.insert("b", 1, named("b"));

        // Touch "a" so "b" becomes least recently used
        cache.get("a");
        cache.insert("c", 1, named("c"));

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn test_cache_disabled() {
        let mut cache = ProfileCache::new(0);
        assert!(!cache.insert("a", 1, named("a")));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_clear() {
        let mut cache = ProfileCache::new(5);
        cache.insert("a", 1, named("a"));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("a").is_none());
    }
}
