//! The session store: authoritative per-client session state.
//!
//! # Concurrency
//!
//! Sessions live in a [`DashMap`], a hash map split into shards that
//! each carry their own `RwLock`. Every read-modify-write here goes
//! through the `entry` API, which holds the write lock of the key's
//! shard for the whole closure. So the expiry check, the touch and the
//! mutation happen as one step for that key, and a caller working on a
//! different shard never waits.

use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::require_non_empty;
use crate::{NotFoundReason, SessionError, SessionRecord};

/// Concurrent store of client sessions with sliding expiry.
///
/// ## Lifecycle
///
/// ```text
/// create() ──→ [unauthenticated] ──set_authenticated(true)──→ [authenticated]
///                     │                                             │
///                     └──────────── idle ≥ timeout ─────────────────┤
///                                                                   ▼
///                                    removed on next get() or sweep_expired()
/// ```
pub struct SessionStore {
    sessions: DashMap<String, SessionRecord>,
    timeout: Duration,
}

impl SessionStore {
    /// Creates an empty store whose sessions expire after `timeout` of
    /// inactivity.
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            timeout,
        }
    }

    /// The inactivity timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Creates (or replaces) an unauthenticated session.
    ///
    /// Re-creating an existing id starts a fresh lifecycle: the old
    /// record, including its authentication, is discarded.
    ///
    /// # Errors
    /// [`SessionError::InvalidArgument`] if `session_id` or `user_id` is empty.
    pub fn create(
        &self,
        session_id: &str,
        access_token: Option<&str>,
        user_id: &str,
    ) -> Result<(), SessionError> {
        require_non_empty("session_id", session_id)?;
        require_non_empty("user_id", user_id)?;

        let record = SessionRecord::new(session_id, access_token, user_id, Instant::now());
        self.sessions.insert(session_id.to_string(), record);

        debug!(%session_id, %user_id, "session created");
        Ok(())
    }

    /// Creates (or replaces) a session that is already authenticated.
    ///
    /// One insert, so no reader ever sees the new token without the
    /// authenticated flag or the flag without the token.
    ///
    /// # Errors
    /// [`SessionError::InvalidArgument`] if any argument is empty.
    pub fn create_authenticated(
        &self,
        session_id: &str,
        access_token: &str,
        user_id: &str,
    ) -> Result<(), SessionError> {
        require_non_empty("session_id", session_id)?;
        require_non_empty("access_token", access_token)?;
        require_non_empty("user_id", user_id)?;

        let mut record =
            SessionRecord::new(session_id, Some(access_token), user_id, Instant::now());
        record.authenticated = true;
        self.sessions.insert(session_id.to_string(), record);

        debug!(%session_id, %user_id, "authenticated session created");
        Ok(())
    }

    /// Returns a snapshot of the session and extends its expiry.
    ///
    /// # Errors
    /// - [`SessionError::InvalidArgument`]: empty `session_id`
    /// - [`SessionError::NotFound`] with [`NotFoundReason::Missing`]: no record
    /// - [`SessionError::NotFound`] with [`NotFoundReason::Expired`]: the
    ///   record had been idle for the full timeout; it is removed before
    ///   the error is returned
    pub fn get(&self, session_id: &str) -> Result<SessionRecord, SessionError> {
        self.with_live_session(session_id, |record| Ok(record.clone()))
    }

    /// Removes a session. Returns `true` if one was present.
    pub fn remove(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        if removed {
            debug!(%session_id, "session removed");
        }
        removed
    }

    /// Whether the session has completed login. Extends its expiry.
    ///
    /// # Errors
    /// Same as [`get`](Self::get).
    pub fn is_authenticated(&self, session_id: &str) -> Result<bool, SessionError> {
        self.with_live_session(session_id, |record| Ok(record.is_authenticated()))
    }

    /// Sets the authenticated flag. Extends the session's expiry.
    ///
    /// # Errors
    /// - Same as [`get`](Self::get).
    /// - [`SessionError::InvalidArgument`] when setting `true` on a session
    ///   that has no access token.
    pub fn set_authenticated(
        &self,
        session_id: &str,
        authenticated: bool,
    ) -> Result<(), SessionError> {
        self.with_live_session(session_id, |record| {
            if authenticated && record.access_token.is_none() {
                return Err(SessionError::InvalidArgument(format!(
                    "session {session_id} has no access token to authenticate with"
                )));
            }
            record.authenticated = authenticated;
            debug!(%session_id, authenticated, "session authentication updated");
            Ok(())
        })
    }

    /// The session's access token, if login has stored one. Extends expiry.
    ///
    /// # Errors
    /// Same as [`get`](Self::get).
    pub fn access_token(&self, session_id: &str) -> Result<Option<String>, SessionError> {
        self.with_live_session(session_id, |record| Ok(record.access_token.clone()))
    }

    /// The session's user id. Extends expiry.
    ///
    /// # Errors
    /// Same as [`get`](Self::get).
    pub fn user_id(&self, session_id: &str) -> Result<String, SessionError> {
        self.with_live_session(session_id, |record| Ok(record.user_id.clone()))
    }

    /// Removes every session idle for at least the timeout. Returns how
    /// many were removed.
    ///
    /// Runs in two phases so it never holds more than one shard lock:
    /// collect candidate ids under read locks, then remove each one only
    /// if it is *still* expired. A session touched or re-created between
    /// the phases survives.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let timeout = self.timeout;

        let candidates: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_expired(now, timeout))
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for session_id in candidates {
            if self
                .sessions
                .remove_if(&session_id, |_, record| record.is_expired(now, timeout))
                .is_some()
            {
                debug!(%session_id, "cleaning up expired session");
                removed += 1;
            }
        }

        if removed > 0 {
            info!(
                removed,
                remaining = self.sessions.len(),
                "session sweep removed expired sessions"
            );
        }
        removed
    }

    /// Number of stored records, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Runs `f` on a live session under its shard's write lock.
    ///
    /// Expired records are removed in the same critical section, so two
    /// concurrent callers can't both observe (or resurrect) one.
    fn with_live_session<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionRecord) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        require_non_empty("session_id", session_id)?;
        let now = Instant::now();

        match self.sessions.entry(session_id.to_string()) {
            Entry::Vacant(_) => {
                debug!(%session_id, "session not found");
                Err(SessionError::not_found(session_id, NotFoundReason::Missing))
            }
            Entry::Occupied(mut entry) => {
                if entry.get().is_expired(now, self.timeout) {
                    entry.remove();
                    debug!(%session_id, "session expired");
                    return Err(SessionError::not_found(session_id, NotFoundReason::Expired));
                }
                let record = entry.get_mut();
                record.touch(now);
                f(record)
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionStore`.
    //!
    //! Naming: `test_{function}_{scenario}_{expected}`.
    //!
    //! Time-dependent tests run with `start_paused = true` and move the
    //! clock with `tokio::time::advance`, so a six-hour timeout costs
    //! nothing and boundaries are exact.

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);
    const EPSILON: Duration = Duration::from_millis(1);

    fn store() -> SessionStore {
        SessionStore::new(TIMEOUT)
    }

    fn assert_not_found(result: Result<SessionRecord, SessionError>, reason: NotFoundReason) {
        match result {
            Err(e) => assert_eq!(e.not_found_reason(), Some(reason), "got {e:?}"),
            Ok(r) => panic!("expected not-found ({reason}), got {r:?}"),
        }
    }

    // =====================================================================
    // create()
    // =====================================================================

    #[test]
    fn test_create_then_get_returns_unauthenticated_record() {
        let store = store();
        store.create("s1", None, "u1").unwrap();

        let record = store.get("s1").expect("should exist");

        assert_eq!(record.session_id, "s1");
        assert_eq!(record.user_id, "u1");
        assert_eq!(record.access_token, None);
        assert!(!record.authenticated);
    }

    #[test]
    fn test_create_empty_session_id_is_invalid() {
        let result = store().create("", None, "u1");
        assert!(matches!(result, Err(SessionError::InvalidArgument(_))));
    }

    #[test]
    fn test_create_empty_user_id_is_invalid() {
        let result = store().create("s1", None, "");
        assert!(matches!(result, Err(SessionError::InvalidArgument(_))));
    }

    #[test]
    fn test_create_overwrites_existing_record() {
        let store = store();
        store.create_authenticated("s1", "tok", "u1").unwrap();

        store.create("s1", None, "u2").unwrap();

        let record = store.get("s1").unwrap();
        assert_eq!(record.user_id, "u2");
        assert!(!record.authenticated, "re-login starts a new lifecycle");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_create_authenticated_sets_flag_and_token() {
        let store = store();
        store.create_authenticated("s1", "tok", "u1").unwrap();

        let record = store.get("s1").unwrap();
        assert!(record.is_authenticated());
        assert_eq!(record.access_token(), Some("tok"));
    }

    #[test]
    fn test_create_authenticated_empty_token_is_invalid() {
        let result = store().create_authenticated("s1", "", "u1");
        assert!(matches!(result, Err(SessionError::InvalidArgument(_))));
    }

    // =====================================================================
    // get()
    // =====================================================================

    #[test]
    fn test_get_unknown_session_returns_missing() {
        assert_not_found(store().get("nope"), NotFoundReason::Missing);
    }

    #[test]
    fn test_get_empty_id_is_invalid() {
        assert!(matches!(store().get(""), Err(SessionError::InvalidArgument(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_just_before_timeout_succeeds() {
        let store = store();
        store.create("s1", None, "u1").unwrap();

        tokio::time::advance(TIMEOUT - EPSILON).await;

        assert!(store.get("s1").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_after_timeout_returns_expired_and_removes() {
        let store = store();
        store.create("s1", None, "u1").unwrap();

        tokio::time::advance(TIMEOUT + EPSILON).await;

        assert_not_found(store.get("s1"), NotFoundReason::Expired);
        assert!(store.is_empty(), "expired record is removed eagerly");
        // Second lookup sees a plain miss.
        assert_not_found(store.get("s1"), NotFoundReason::Missing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_slides_expiry_window() {
        let store = store();
        store.create("s1", None, "u1").unwrap();

        // Four accesses, each just inside the window: 4 × (timeout − ε)
        // is far past one timeout from creation.
        for _ in 0..4 {
            tokio::time::advance(TIMEOUT - EPSILON).await;
            store.get("s1").expect("sliding window keeps the session alive");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_updates_last_accessed() {
        let store = store();
        store.create("s1", None, "u1").unwrap();
        let created = store.get("s1").unwrap().last_accessed;

        tokio::time::advance(Duration::from_secs(10)).await;
        let later = store.get("s1").unwrap().last_accessed;

        assert_eq!(later - created, Duration::from_secs(10));
    }

    // =====================================================================
    // remove()
    // =====================================================================

    #[test]
    fn test_remove_is_idempotent() {
        let store = store();
        store.create("s1", None, "u1").unwrap();

        assert!(store.remove("s1"));
        assert!(!store.remove("s1"));
        assert_not_found(store.get("s1"), NotFoundReason::Missing);
    }

    // =====================================================================
    // set_authenticated() / is_authenticated() / accessors
    // =====================================================================

    #[test]
    fn test_set_authenticated_with_token_flips_flag() {
        let store = store();
        store.create("s1", Some("tok"), "u1").unwrap();
        assert!(!store.is_authenticated("s1").unwrap());

        store.set_authenticated("s1", true).unwrap();

        assert!(store.is_authenticated("s1").unwrap());
        assert_eq!(store.access_token("s1").unwrap().as_deref(), Some("tok"));
        assert_eq!(store.user_id("s1").unwrap(), "u1");
    }

    #[test]
    fn test_set_authenticated_without_token_is_rejected() {
        let store = store();
        store.create("s1", None, "u1").unwrap();

        let result = store.set_authenticated("s1", true);

        assert!(matches!(result, Err(SessionError::InvalidArgument(_))));
        assert!(!store.is_authenticated("s1").unwrap());
    }

    #[test]
    fn test_set_authenticated_false_always_allowed() {
        let store = store();
        store.create_authenticated("s1", "tok", "u1").unwrap();

        store.set_authenticated("s1", false).unwrap();

        assert!(!store.is_authenticated("s1").unwrap());
    }

    #[test]
    fn test_accessors_propagate_not_found() {
        let store = store();
        assert!(store.is_authenticated("x").unwrap_err().is_not_found());
        assert!(store.set_authenticated("x", false).unwrap_err().is_not_found());
        assert!(store.access_token("x").unwrap_err().is_not_found());
        assert!(store.user_id("x").unwrap_err().is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_authenticated_extends_expiry() {
        let store = store();
        store.create("s1", Some("tok"), "u1").unwrap();

        tokio::time::advance(TIMEOUT - EPSILON).await;
        store.set_authenticated("s1", true).unwrap();
        tokio::time::advance(TIMEOUT - EPSILON).await;

        assert!(store.is_authenticated("s1").unwrap());
    }

    // =====================================================================
    // sweep_expired()
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_expired_sessions() {
        let store = store();
        store.create("old", None, "u1").unwrap();
        tokio::time::advance(Duration::from_secs(60 * 60)).await;
        store.create_authenticated("fresh", "tok", "u2").unwrap();
        tokio::time::advance(TIMEOUT - Duration::from_secs(60 * 60)).await;

        // "old" is exactly at the timeout, "fresh" is an hour younger.
        let removed = store.sweep_expired();

        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        let fresh = store.get("fresh").unwrap();
        assert!(fresh.is_authenticated());
        assert_eq!(fresh.access_token(), Some("tok"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_twice_second_removes_nothing() {
        let store = store();
        store.create("s1", None, "u1").unwrap();
        store.create("s2", None, "u1").unwrap();
        tokio::time::advance(TIMEOUT).await;

        assert_eq!(store.sweep_expired(), 2);
        assert_eq!(store.sweep_expired(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_sweep_on_empty_store_returns_zero() {
        assert_eq!(store().sweep_expired(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_keeps_recently_touched_session() {
        let store = store();
        store.create("s1", None, "u1").unwrap();
        tokio::time::advance(TIMEOUT - EPSILON).await;
        store.get("s1").unwrap();
        tokio::time::advance(EPSILON * 2).await;

        assert_eq!(store.sweep_expired(), 0);
        assert!(store.get("s1").is_ok());
    }
}
