//! Following and followers (kind 3 contact lists).

use super::{FOLLOWER_SCAN_LIMIT, SocialClient};
use crate::error::{ClientError, Result};
use crate::message::Filter;
use crate::publish::PublishResult;
use nostr::{Event, KIND_CONTACTS, Keys, follow_template, public_key_from_str, unfollow_template};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Sort `(pubkey, timestamp)` pairs newest first, ties by pubkey, and keep the keys.
fn newest_first(mut entries: Vec<(String, u64)>) -> Vec<String> {
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.into_iter().map(|(pubkey, _)| pubkey).collect()
}

impl SocialClient {
    /// The newest contact list published by `pubkey`.
    ///
    /// Follow and unfollow republish whatever this returns, so an answer that
    /// may be missing the real list is an error rather than `None`: at least
    /// one relay must finish, and "no list" is only trusted when every relay
    /// finished.
    pub async fn contact_list(&self, pubkey: &str) -> Result<Option<Event>> {
        let pubkey = public_key_from_str(pubkey)?;
        let filter = Filter::new()
            .kinds(vec![KIND_CONTACTS])
            .authors(vec![pubkey.clone()]);
        let result = self.pool.query(&filter).await?;

        if !result.any_completed() || (result.events.is_empty() && !result.is_complete()) {
            warn!(
                "Contact list read for {} incomplete: {} timed out, {} failed",
                pubkey,
                result.timed_out().len(),
                result.failed().len()
            );
            return Err(ClientError::IncompleteRead(format!(
                "contact list of {} not confirmed by the relays",
                pubkey
            )));
        }
        // Merged results are newest first
        Ok(result.events.into_iter().next())
    }

    /// Accounts `pubkey` follows, most recently listed first.
    ///
    /// Every contact list version the relays still hold is read, so an
    /// account counts as followed if any of them lists it.
    pub async fn following(&self, pubkey: &str) -> Result<Vec<String>> {
        let pubkey = public_key_from_str(pubkey)?;
        let filter = Filter::new()
            .kinds(vec![KIND_CONTACTS])
            .authors(vec![pubkey.clone()]);
        let lists = self.pool.fetch_events(&filter).await?;

        let mut last_listed: HashMap<String, u64> = HashMap::new();
        for list in &lists {
            for followed in list.tag_values("p") {
                let seen = last_listed.entry(followed.to_string()).or_default();
                *seen = (*seen).max(list.created_at);
            }
        }

        debug!(
            "{} follows {} accounts across {} contact lists",
            pubkey,
            last_listed.len(),
            lists.len()
        );
        Ok(newest_first(last_listed.into_iter().collect()))
    }

    /// Accounts whose newest contact list still lists `pubkey`, most recent first.
    ///
    /// Relays may answer the `#p` query with a stale list, so each author's
    /// newest returned list is checked again before counting them.
    pub async fn followers(&self, pubkey: &str) -> Result<Vec<String>> {
        let pubkey = public_key_from_str(pubkey)?;
        let filter = Filter::new()
            .kinds(vec![KIND_CONTACTS])
            .pubkey_refs(vec![pubkey.clone()])
            .limit(FOLLOWER_SCAN_LIMIT);
        let lists = self.pool.fetch_events(&filter).await?;

        let mut latest: HashMap<&str, &Event> = HashMap::new();
        for list in &lists {
            latest
                .entry(list.pubkey.as_str())
                .and_modify(|current| {
                    if list.created_at > current.created_at {
                        *current = list;
                    }
                })
                .or_insert(list);
        }

        let followers: Vec<(String, u64)> = latest
            .into_values()
            .filter(|list| list.tag_values("p").any(|p| p == pubkey))
            .map(|list| (list.pubkey.clone(), list.created_at))
            .collect();

        debug!("{} has {} verified followers", pubkey, followers.len());
        Ok(newest_first(followers))
    }

    /// Add `pubkey` to the signer's contact list and publish it.
    ///
    /// Returns `None` without publishing when `pubkey` is already followed.
    pub async fn follow(&self, keys: &Keys, pubkey: &str) -> Result<Option<PublishResult>> {
        let target = public_key_from_str(pubkey)?;
        let current = self.contact_list(keys.public_key()).await?;

        let Some(template) = follow_template(current.as_ref(), &target) else {
            info!("Already following {}", target);
            return Ok(None);
        };
        let event = keys.sign(&template)?;
        let result = self.pool.publish(&event).await?;
        info!("Followed {}", target);
        Ok(Some(result))
    }

    /// Remove `pubkey` from the signer's contact list and publish it.
    ///
    /// Returns `None` without publishing when there is no contact list or it
    /// does not list `pubkey`.
    pub async fn unfollow(&self, keys: &Keys, pubkey: &str) -> Result<Option<PublishResult>> {
        let target = public_key_from_str(pubkey)?;
        let current = self.contact_list(keys.public_key()).await?;

        let Some(template) = unfollow_template(current.as_ref(), &target) else {
            info!("Not following {}", target);
            return Ok(None);
        };
        let event = keys.sign(&template)?;
        let result = self.pool.publish(&event).await?;
        info!("Unfollowed {}", target);
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{signed, social, tag};
    use super::*;
    use crate::config::PoolConfig;
    use crate::pool::RelayPool;
    use crate::transport::MockConnector;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_following_orders_by_latest_listing() {
        let (social, relay) = social().await;
        let user = Keys::generate();
        let (a, b, c) = (Keys::generate(), Keys::generate(), Keys::generate());

        let old = signed(
            &user,
            KIND_CONTACTS,
            100,
            vec![tag(&["p", a.public_key()]), tag(&["p", b.public_key()])],
            "",
        );
        let new = signed(
            &user,
            KIND_CONTACTS,
            200,
            vec![tag(&["p", b.public_key()]), tag(&["p", c.public_key()])],
            "",
        );
        relay.add_events(vec![old, new]);

        let following = social.following(user.public_key()).await.unwrap();
        assert_eq!(following.len(), 3);
        assert_eq!(following[2], a.public_key());
        assert!(following[..2].contains(&b.public_key().to_string()));
        assert!(following[..2].contains(&c.public_key().to_string()));
    }

    #[tokio::test]
    async fn test_followers_use_latest_list_per_author() {
        let (social, relay) = social().await;
        let user = Keys::generate();
        let early = Keys::generate();
        let active = Keys::generate();
        let gone = Keys::generate();

        let early_list = signed(&early, KIND_CONTACTS, 100, vec![tag(&["p", user.public_key()])], "");
        let active_old = signed(&active, KIND_CONTACTS, 50, vec![tag(&["p", user.public_key()])], "");
        let active_new = signed(&active, KIND_CONTACTS, 250, vec![tag(&["p", user.public_key()])], "");
        let unrelated = signed(&gone, KIND_CONTACTS, 300, vec![tag(&["p", early.public_key()])], "");
        relay.add_events(vec![early_list, active_old, active_new, unrelated]);

        let followers = social.followers(user.public_key()).await.unwrap();
        assert_eq!(
            followers,
            vec![active.public_key().to_string(), early.public_key().to_string()]
        );

        let fetches = relay.fetches();
        let filter = &fetches[0];
        assert_eq!(filter.limit, Some(FOLLOWER_SCAN_LIMIT));
        assert_eq!(filter.tags["#p"], vec![user.public_key().to_string()]);
    }

    #[tokio::test]
    async fn test_follow_preserves_existing_list() {
        let (social, relay) = social().await;
        let user = Keys::generate();
        let friend = Keys::generate();
        let other = Keys::generate();

        let list = signed(
            &user,
            KIND_CONTACTS,
            100,
            vec![tag(&["p", friend.public_key()])],
            r#"{"wss://relay.mock":{"read":true,"write":true}}"#,
        );
        relay.add_events(vec![list.clone()]);

        let result = social.follow(&user, other.public_key()).await.unwrap().unwrap();
        assert_eq!(result.accepted_count(), 1);

        let published = relay.published();
        assert_eq!(published.len(), 1);
        let updated = &published[0];
        assert_eq!(updated.kind, KIND_CONTACTS);
        assert_eq!(updated.content, list.content);
        let listed: Vec<&str> = updated.tag_values("p").collect();
        assert_eq!(listed, vec![friend.public_key(), other.public_key()]);
        assert!(nostr::verify_event(updated).unwrap());

        // Following again is a no-op
        assert!(social.follow(&user, friend.public_key()).await.unwrap().is_none());
        assert_eq!(relay.published().len(), 1);
    }

    #[tokio::test]
    async fn test_unfollow() {
        let (social, relay) = social().await;
        let user = Keys::generate();
        let friend = Keys::generate();

        // No list yet
        assert!(social.unfollow(&user, friend.public_key()).await.unwrap().is_none());

        let list = signed(&user, KIND_CONTACTS, 100, vec![tag(&["p", friend.public_key()])], "");
        relay.add_events(vec![list]);

        assert!(social.unfollow(&user, friend.public_key()).await.unwrap().is_some());
        let published = relay.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].tag_values("p").count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_refuses_when_list_read_times_out() {
        let (social, relay) = social().await;
        let user = Keys::generate();
        let friends: Vec<Keys> = (0..3).map(|_| Keys::generate()).collect();
        let target = Keys::generate();

        let tags = friends.iter().map(|f| tag(&["p", f.public_key()])).collect();
        relay.add_events(vec![signed(&user, KIND_CONTACTS, 100, tags, "")]);
        relay.set_fetch_delay(Duration::from_secs(3600));

        assert!(matches!(
            social.follow(&user, target.public_key()).await,
            Err(ClientError::IncompleteRead(_))
        ));
        assert!(matches!(
            social.unfollow(&user, friends[0].public_key()).await,
            Err(ClientError::IncompleteRead(_))
        ));
        assert!(relay.published().is_empty());
    }

    #[tokio::test]
    async fn test_follow_refuses_when_list_read_fails() {
        let (social, relay) = social().await;
        let user = Keys::generate();
        relay.fail_fetch("rate-limited: slow down");

        let result = social.follow(&user, Keys::generate().public_key()).await;
        assert!(matches!(result, Err(ClientError::IncompleteRead(_))));
        assert!(relay.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_with_one_relay_answering() {
        let connector = MockConnector::new();
        let answering = connector.relay("wss://a.mock");
        let silent = connector.relay("wss://b.mock");
        let pool = RelayPool::with_connector(
            PoolConfig::with_relays(vec!["wss://a.mock".to_string(), "wss://b.mock".to_string()]),
            Arc::new(connector),
        );
        pool.add_configured_relays().await.unwrap();
        pool.connect_all(Duration::from_secs(1)).await;
        let social = SocialClient::new(Arc::new(pool));

        let user = Keys::generate();
        let friend = Keys::generate();
        let target = Keys::generate();
        let list = signed(&user, KIND_CONTACTS, 100, vec![tag(&["p", friend.public_key()])], "");
        answering.add_events(vec![list.clone()]);
        silent.add_events(vec![list]);
        silent.set_fetch_delay(Duration::from_secs(3600));

        // A list was found, so the follow goes ahead
        social.follow(&user, target.public_key()).await.unwrap().unwrap();
        let listed: Vec<String> = answering.published()[0]
            .tag_values("p")
            .map(str::to_string)
            .collect();
        assert_eq!(listed, vec![friend.public_key().to_string(), target.public_key().to_string()]);

        // With no list anywhere, a silent relay might be holding it
        let stranger = Keys::generate();
        assert!(matches!(
            social.follow(&stranger, target.public_key()).await,
            Err(ClientError::IncompleteRead(_))
        ));
    }
}
