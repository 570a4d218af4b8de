//! Short-lived request-token → client-session mappings.
//!
//! The broker redirects back to us with a one-time request token. When
//! the callback doesn't carry the client session id, this store is how
//! we find out which session the login belongs to. Mappings live for a
//! fixed window from creation; reads never extend them.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::require_non_empty;
use crate::{NotFoundReason, SessionError};

/// One pending correlation between a request token and a client session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMapping {
    pub client_session_id: String,
    pub created_at: Instant,
}

impl TokenMapping {
    /// Whether the mapping is at least `expiry` old at `now`.
    pub fn is_expired(&self, now: Instant, expiry: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= expiry
    }
}

/// Concurrent store of [`TokenMapping`]s keyed by request token.
pub struct TokenMappingStore {
    mappings: DashMap<String, TokenMapping>,
    expiry: Duration,
}

impl TokenMappingStore {
    pub fn new(expiry: Duration) -> Self {
        Self {
            mappings: DashMap::new(),
            expiry,
        }
    }

    /// The fixed lifetime of each mapping.
    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Records `request_token → client_session_id`, replacing any
    /// existing mapping for the token and restarting its clock.
    ///
    /// # Errors
    /// [`SessionError::InvalidArgument`] if either argument is empty.
    pub fn store(&self, request_token: &str, client_session_id: &str) -> Result<(), SessionError> {
        require_non_empty("request_token", request_token)?;
        require_non_empty("client_session_id", client_session_id)?;

        self.mappings.insert(
            request_token.to_string(),
            TokenMapping {
                client_session_id: client_session_id.to_string(),
                created_at: Instant::now(),
            },
        );
        debug!(%client_session_id, "token mapping stored");
        Ok(())
    }

    /// The client session a request token maps to, if the mapping exists
    /// and is still valid. An expired mapping is removed on the spot.
    pub fn resolve(&self, request_token: &str) -> Option<String> {
        if request_token.is_empty() {
            return None;
        }
        let now = Instant::now();

        // Drop the expired entry under the shard lock so a concurrent
        // `store` of the same token can't be removed by mistake.
        if self
            .mappings
            .remove_if(request_token, |_, m| m.is_expired(now, self.expiry))
            .is_some()
        {
            debug!("token mapping expired on lookup");
            return None;
        }

        self.mappings
            .get(request_token)
            .map(|m| m.client_session_id.clone())
    }

    /// Removes the mapping and returns its session id if it was still
    /// valid. A request token can be consumed once.
    pub fn consume(&self, request_token: &str) -> Option<String> {
        if request_token.is_empty() {
            return None;
        }
        let now = Instant::now();
        let (_, mapping) = self.mappings.remove(request_token)?;
        (!mapping.is_expired(now, self.expiry)).then_some(mapping.client_session_id)
    }

    /// Checks that a login is pending for `client_session_id`: some valid
    /// mapping points at it.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] with [`NotFoundReason::Missing`] for an
    /// empty id, or [`NotFoundReason::NoPendingLogin`] when no valid
    /// mapping targets the session.
    pub fn validate(&self, client_session_id: &str) -> Result<(), SessionError> {
        if client_session_id.is_empty() {
            return Err(SessionError::not_found(
                client_session_id,
                NotFoundReason::Missing,
            ));
        }
        let now = Instant::now();

        let pending = self.mappings.iter().any(|entry| {
            let m = entry.value();
            m.client_session_id == client_session_id && !m.is_expired(now, self.expiry)
        });

        if pending {
            Ok(())
        } else {
            debug!(%client_session_id, "no pending login");
            Err(SessionError::not_found(
                client_session_id,
                NotFoundReason::NoPendingLogin,
            ))
        }
    }

    /// Removes every mapping that targets `client_session_id`, expired or
    /// not. Returns how many were removed.
    pub fn remove_targeting(&self, client_session_id: &str) -> usize {
        let mut removed = 0;
        self.mappings.retain(|_, m| {
            let keep = m.client_session_id != client_session_id;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Removes every expired mapping. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let expiry = self.expiry;

        let candidates: Vec<String> = self
            .mappings
            .iter()
            .filter(|entry| entry.value().is_expired(now, expiry))
            .map(|entry| entry.key().clone())
            .collect();

        let removed = candidates
            .iter()
            .filter(|token| {
                self.mappings
                    .remove_if(token.as_str(), |_, m| m.is_expired(now, expiry))
                    .is_some()
            })
            .count();

        if removed > 0 {
            info!(
                removed,
                remaining = self.mappings.len(),
                "token sweep removed expired mappings"
            );
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPIRY: Duration = Duration::from_secs(300);
    const EPSILON: Duration = Duration::from_millis(1);

    fn store() -> TokenMappingStore {
        TokenMappingStore::new(EXPIRY)
    }

    #[test]
    fn test_store_then_resolve_returns_session() {
        let store = store();
        store.store("rt1", "s1").unwrap();
        assert_eq!(store.resolve("rt1").as_deref(), Some("s1"));
        // resolve doesn't consume
        assert_eq!(store.resolve("rt1").as_deref(), Some("s1"));
    }

    #[test]
    fn test_store_rejects_empty_arguments() {
        let store = store();
        assert!(matches!(store.store("", "s1"), Err(SessionError::InvalidArgument(_))));
        assert!(matches!(store.store("rt", ""), Err(SessionError::InvalidArgument(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_overwrites_previous_target() {
        let store = store();
        store.store("rt1", "s1").unwrap();
        store.store("rt1", "s2").unwrap();
        assert_eq!(store.resolve("rt1").as_deref(), Some("s2"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_resolve_unknown_or_empty_returns_none() {
        let store = store();
        assert_eq!(store.resolve("nope"), None);
        assert_eq!(store.resolve(""), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_at_expiry_returns_none_and_removes() {
        let store = store();
        store.store("rt1", "s1").unwrap();

        tokio::time::advance(EXPIRY - EPSILON).await;
        assert!(store.resolve("rt1").is_some());

        tokio::time::advance(EPSILON).await;
        assert_eq!(store.resolve("rt1"), None);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_does_not_extend_lifetime() {
        let store = store();
        store.store("rt1", "s1").unwrap();

        tokio::time::advance(EXPIRY / 2).await;
        assert!(store.resolve("rt1").is_some());
        tokio::time::advance(EXPIRY / 2).await;

        assert_eq!(store.resolve("rt1"), None);
    }

    #[test]
    fn test_consume_returns_once() {
        let store = store();
        store.store("rt1", "s1").unwrap();

        assert_eq!(store.consume("rt1").as_deref(), Some("s1"));
        assert_eq!(store.consume("rt1"), None);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_consume_expired_removes_but_returns_none() {
        let store = store();
        store.store("rt1", "s1").unwrap();
        tokio::time::advance(EXPIRY).await;

        assert_eq!(store.consume("rt1"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_validate_with_pending_mapping_succeeds() {
        let store = store();
        store.store("rt1", "s1").unwrap();
        assert!(store.validate("s1").is_ok());
    }

    #[test]
    fn test_validate_without_mapping_returns_no_pending_login() {
        let err = store().validate("s1").unwrap_err();
        assert_eq!(err.not_found_reason(), Some(NotFoundReason::NoPendingLogin));
    }

    #[test]
    fn test_validate_empty_id_returns_missing() {
        let err = store().validate("").unwrap_err();
        assert_eq!(err.not_found_reason(), Some(NotFoundReason::Missing));
    }

    #[tokio::test(start_paused = true)]
    async fn test_validate_ignores_expired_mapping() {
        let store = store();
        store.store("rt1", "s1").unwrap();
        tokio::time::advance(EXPIRY).await;

        assert!(store.validate("s1").unwrap_err().is_not_found());
    }

    #[test]
    fn test_remove_targeting_only_touches_that_session() {
        let store = store();
        store.store("rt1", "s1").unwrap();
        store.store("s1", "s1").unwrap();
        store.store("rt2", "s2").unwrap();

        assert_eq!(store.remove_targeting("s1"), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.resolve("rt2").as_deref(), Some("s2"));
    }

    #[test]
    fn test_remove_targeting_counts_exactly_under_concurrent_stores() {
        let store = store();
        for i in 0..200 {
            store.store(&format!("target-{i}"), "s1").unwrap();
        }

        let removed = std::thread::scope(|s| {
            let writer = s.spawn(|| {
                for i in 0..2_000 {
                    store.store(&format!("other-{i}"), "s2").unwrap();
                }
            });
            let removed = store.remove_targeting("s1");
            writer.join().unwrap();
            removed
        });

        assert_eq!(removed, 200);
        assert_eq!(store.len(), 2_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_expired_removes_only_old_mappings() {
        let store = store();
        store.store("old", "s1").unwrap();
        tokio::time::advance(Duration::from_secs(120)).await;
        store.store("new", "s2").unwrap();
        tokio::time::advance(EXPIRY - Duration::from_secs(120)).await;

        assert_eq!(store.sweep_expired(), 1);
        assert_eq!(store.sweep_expired(), 0);
        assert_eq!(store.resolve("new").as_deref(), Some("s2"));
    }
}
