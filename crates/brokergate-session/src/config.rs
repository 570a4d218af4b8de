//! Session layer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// LoginFlow
// ---------------------------------------------------------------------------

/// How a login is correlated with its callback.
///
/// - **PreseedMapping**: `begin_login` also stores a token mapping keyed
///   by the client session id itself, so the pending login is visible to
///   [`TokenMappingStore::validate`](crate::TokenMappingStore::validate)
///   before the broker has issued anything.
/// - **CallbackOnly**: nothing is mapped until the callback arrives with
///   the broker's request token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginFlow {
    #[default]
    PreseedMapping,
    CallbackOnly,
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Timeouts and sweep cadence for the session layer.
///
/// Start from `SessionConfig::default()` and override what you need:
///
/// ```rust
/// use std::time::Duration;
/// use brokergate_session::SessionConfig;
///
/// let config = SessionConfig {
///     session_timeout: Duration::from_secs(30 * 60),
///     ..SessionConfig::default()
/// };
/// assert_eq!(config.token_expiry, Duration::from_secs(5 * 60));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Inactivity window after which a session is gone. Sliding: every
    /// successful access restarts it.
    pub session_timeout: Duration,

    /// Lifetime of a request-token mapping, fixed from creation.
    pub token_expiry: Duration,

    /// How often the background task sweeps expired sessions.
    pub session_sweep_interval: Duration,

    /// How often the background task sweeps expired token mappings.
    pub token_sweep_interval: Duration,

    /// Whether `begin_login` pre-registers a mapping.
    pub login_flow: LoginFlow,
}

impl SessionConfig {
    pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);
    pub const DEFAULT_TOKEN_EXPIRY: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);
    pub const DEFAULT_TOKEN_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_timeout: Self::DEFAULT_SESSION_TIMEOUT,
            token_expiry: Self::DEFAULT_TOKEN_EXPIRY,
            session_sweep_interval: Self::DEFAULT_SESSION_SWEEP_INTERVAL,
            token_sweep_interval: Self::DEFAULT_TOKEN_SWEEP_INTERVAL,
            login_flow: LoginFlow::default(),
        }
    }
}
