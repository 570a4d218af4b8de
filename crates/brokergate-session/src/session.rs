//! Session records: the server's view of one client's login.
//!
//! A record tracks:
//! - WHO the client is logged in as (`user_id`)
//! - WHAT credential its broker calls use (`access_token`)
//! - WHETHER the token exchange has completed (`authenticated`)
//! - WHEN it was last used (`last_accessed`, for sliding expiry)

use std::time::Duration;

use tokio::time::Instant;

/// A snapshot of one client session.
///
/// Stores never hand out references into their maps; every lookup
/// returns an owned clone, so a `SessionRecord` you hold can't change
/// underneath you.
///
/// `Instant` here is tokio's, which reads the normal monotonic clock in
/// production and the controllable clock under `tokio::time::pause()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// The client session id (map key). Never changes.
    pub session_id: String,

    /// Broker access token. `None` until login completes.
    pub access_token: Option<String>,

    /// Broker user the session belongs to. Never changes.
    pub user_id: String,

    /// `true` once the token exchange succeeded. Only ever `true`
    /// together with a non-empty `access_token`.
    pub authenticated: bool,

    /// Last successful read or write through the store.
    pub last_accessed: Instant,
}

impl SessionRecord {
    pub(crate) fn new(
        session_id: &str,
        access_token: Option<&str>,
        user_id: &str,
        now: Instant,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            access_token: access_token.filter(|t| !t.is_empty()).map(str::to_string),
            user_id: user_id.to_string(),
            authenticated: false,
            last_accessed: now,
        }
    }

    /// The access token, if one is set.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Whether the record is authenticated with a usable token.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated && self.access_token.is_some()
    }

    /// Whether `timeout` of inactivity has passed at `now`.
    ///
    /// The boundary counts as expired: a record idle for exactly
    /// `timeout` is gone. A `last_accessed` later than `now` (touched
    /// after `now` was read) is never expired.
    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_accessed) >= timeout
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_accessed = now;
    }
}
