//! Session manager: the facade the broker service talks to.

use tracing::{debug, info};

use crate::{
    LoginFlow, NotFoundReason, SessionConfig, SessionError, SessionStore, TokenMappingStore,
};

/// Combines the session store and the token-mapping store into the
/// login lifecycle.
///
/// ```text
/// begin_login ──→ [pending] ──complete_login──→ [authenticated] ──logout──→ gone
///                     │                               │
///                     └──── idle ≥ session_timeout ───┴──→ expired (swept)
/// ```
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct SessionManager {
    sessions: SessionStore,
    mappings: TokenMappingStore,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: SessionStore::new(config.session_timeout),
            mappings: TokenMappingStore::new(config.token_expiry),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The underlying session store.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// The underlying token-mapping store.
    pub fn token_mappings(&self) -> &TokenMappingStore {
        &self.mappings
    }

    // -----------------------------------------------------------------------
    // Login lifecycle
    // -----------------------------------------------------------------------

    /// Starts a login: creates an unauthenticated session without a token.
    ///
    /// With [`LoginFlow::PreseedMapping`] a placeholder mapping keyed by
    /// the session id itself is stored too, so
    /// [`validate_pending_login`](Self::validate_pending_login) succeeds
    /// before the broker has issued a request token.
    ///
    /// Calling this for an existing session replaces it.
    pub fn begin_login(&self, client_session_id: &str, user_id: &str) -> Result<(), SessionError> {
        self.sessions.create(client_session_id, None, user_id)?;
        if self.config.login_flow == LoginFlow::PreseedMapping {
            self.mappings.store(client_session_id, client_session_id)?;
        }
        info!(session_id = %client_session_id, %user_id, "login started");
        Ok(())
    }

    /// Finishes a login with the token the broker exchanged.
    ///
    /// The session is written as authenticated in one step, then the
    /// request-token mapping and any placeholder are consumed so neither
    /// can be replayed.
    pub fn complete_login(
        &self,
        client_session_id: &str,
        request_token: &str,
        access_token: &str,
        user_id: &str,
    ) -> Result<(), SessionError> {
        self.sessions
            .create_authenticated(client_session_id, access_token, user_id)?;

        self.mappings.consume(request_token);
        if request_token != client_session_id {
            self.mappings.consume(client_session_id);
        }

        info!(session_id = %client_session_id, %user_id, "session authenticated");
        Ok(())
    }

    /// The access token of an authenticated session.
    ///
    /// Every failure comes back as [`SessionError::NotFound`]: an empty id,
    /// an unknown or expired session, and a session that hasn't finished
    /// login all mean "log in again" to the caller.
    pub fn require_authenticated(&self, client_session_id: &str) -> Result<String, SessionError> {
        let record = match self.sessions.get(client_session_id) {
            Ok(record) => record,
            Err(SessionError::InvalidArgument(_)) => {
                return Err(SessionError::not_found(
                    client_session_id,
                    NotFoundReason::Missing,
                ));
            }
            Err(e) => {
                debug!(session_id = %client_session_id, error = %e, "session rejected");
                return Err(e);
            }
        };

        match record.access_token {
            Some(token) if record.authenticated => Ok(token),
            _ => {
                debug!(session_id = %client_session_id, "session used before login completed");
                Err(SessionError::not_found(
                    client_session_id,
                    NotFoundReason::Unauthenticated,
                ))
            }
        }
    }

    /// Ends a session: removes it and every mapping that points at it.
    /// Returns whether a session was removed.
    pub fn logout(&self, client_session_id: &str) -> bool {
        let removed = self.sessions.remove(client_session_id);
        let mappings = self.mappings.remove_targeting(client_session_id);
        info!(session_id = %client_session_id, removed, mappings, "logged out");
        removed
    }

    // -----------------------------------------------------------------------
    // Token mappings
    // -----------------------------------------------------------------------

    pub fn store_token_mapping(
        &self,
        request_token: &str,
        client_session_id: &str,
    ) -> Result<(), SessionError> {
        self.mappings.store(request_token, client_session_id)
    }

    pub fn resolve_request_token(&self, request_token: &str) -> Option<String> {
        self.mappings.resolve(request_token)
    }

    /// Fails with [`SessionError::NotFound`] unless a live mapping targets
    /// the session.
    pub fn validate_pending_login(&self, client_session_id: &str) -> Result<(), SessionError> {
        self.mappings.validate(client_session_id)
    }

    // -----------------------------------------------------------------------
    // Sweeps
    // -----------------------------------------------------------------------

    /// Removes expired sessions. Returns how many were removed.
    pub fn sweep_sessions(&self) -> usize {
        self.sessions.sweep_expired()
    }

    /// Removes expired token mappings. Returns how many were removed.
    pub fn sweep_token_mappings(&self) -> usize {
        self.mappings.sweep_expired()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

// =========================================================================
// Tests
// =========================================================================
