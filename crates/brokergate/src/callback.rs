//! Broker redirect callback handling.
//!
//! After the user signs in, the broker redirects the browser to
//! `/callback?request_token=...&client_session=...&status=success`.
//! [`BrokerService::handle_callback`] turns that into an authenticated
//! session and tells the caller where to send the browser next.
//!
//! ```text
//! status != success ──→ Failed (stores untouched)
//! status == success ──→ resolve session ──→ store mapping ──→ exchange ──→ complete_login
//!                            │                                   │
//!                            └──────── any error ────────────────┴──→ Failed
//! ```

use brokergate_protocol::CallbackParams;
use brokergate_session::SessionError;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{BrokerError, BrokerService, TokenExchanger};

/// Where the browser goes after a successful login.
pub const SUCCESS_REDIRECT: &str = "/success.html";
/// Where the browser goes after a failed login.
pub const ERROR_REDIRECT: &str = "/error.html";

/// Result of handling one callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallbackOutcome {
    /// The session is now authenticated.
    Authenticated { session_id: String, user_id: String },
    /// Login didn't complete. `reason` is safe to show to the user.
    Failed { reason: String },
}

impl CallbackOutcome {
    /// The page to redirect the browser to.
    pub fn redirect(&self) -> &'static str {
        match self {
            Self::Authenticated { .. } => SUCCESS_REDIRECT,
            Self::Failed { .. } => ERROR_REDIRECT,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

impl<E: TokenExchanger> BrokerService<E> {
    /// Handles the broker's redirect.
    ///
    /// Never returns an error: every failure becomes
    /// [`CallbackOutcome::Failed`] and is logged, since the only thing
    /// left to do with a browser redirect is to show an error page.
    pub async fn handle_callback(&self, params: &CallbackParams) -> CallbackOutcome {
        if !params.status.is_success() {
            warn!(status = %params.status, "login failed at broker");
            return CallbackOutcome::Failed {
                reason: format!("login failed with status: {}", params.status),
            };
        }

        debug!(
            client_session = params.client_session().unwrap_or("<absent>"),
            flow_type = %params.flow_type,
            "received broker callback"
        );

        match self.complete_callback(params).await {
            Ok((session_id, user_id)) => {
                info!(%session_id, %user_id, "broker login completed");
                CallbackOutcome::Authenticated {
                    session_id,
                    user_id,
                }
            }
            Err(e) => {
                error!(error = %e, "error in callback");
                CallbackOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Parses a raw callback query string and handles it.
    pub async fn handle_callback_query(&self, query: &str) -> CallbackOutcome {
        match CallbackParams::from_query(query) {
            Ok(params) => self.handle_callback(&params).await,
            Err(e) => {
                warn!(error = %e, "malformed callback query");
                CallbackOutcome::Failed {
                    reason: BrokerError::from(e).to_string(),
                }
            }
        }
    }

    async fn complete_callback(
        &self,
        params: &CallbackParams,
    ) -> Result<(String, String), BrokerError> {
        let request_token = params.request_token.as_str();

        let session_id = match params.client_session() {
            Some(id) => id.to_string(),
            None => self
                .sessions
                .resolve_request_token(request_token)
                .ok_or(SessionError::MappingNotResolved)?,
        };

        self.sessions.store_token_mapping(request_token, &session_id)?;

        let exchanged = self
            .exchanger
            .exchange(request_token, &self.config.api_secret)
            .await?;

        self.sessions.complete_login(
            &session_id,
            request_token,
            &exchanged.access_token,
            &exchanged.user_id,
        )?;

        Ok((session_id, exchanged.user_id))
    }
}
