//! Hook for exchanging a request token with the broker.
//!
//! Brokergate doesn't speak any broker's HTTP API itself. After the
//! login redirect it holds a one-time request token; turning that into
//! an access token is a call to the broker's API with your API secret.
//! You implement [`TokenExchanger`] with that call, and the callback
//! handler invokes it.
//!
//! The same [`ExchangeError`] type is what your closures return from
//! [`BrokerService::call_api`](crate::BrokerService::call_api), so broker
//! failures look the same wherever they happen.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// What the broker hands back for a valid request token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangedSession {
    /// Broker user the token belongs to.
    pub user_id: String,
    /// Token for authenticated API calls.
    pub access_token: String,
    /// Token for public (streaming) endpoints, if the broker issues one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_token: Option<String>,
}

/// A failed call to the broker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// The broker answered and refused (bad token, bad checksum, ...).
    #[error("broker rejected request (code: {code}): {message}")]
    Rejected { code: u16, message: String },

    /// The broker couldn't be reached or the response was unreadable.
    #[error("network error: {0}")]
    Transport(String),
}

/// Exchanges a request token for an access token.
///
/// # Trait bounds
///
/// - `Send + Sync` → shared by every callback task.
/// - `'static` → lives as long as the service.
///
/// # Example
///
/// ```rust
/// use brokergate::{ExchangeError, ExchangedSession, TokenExchanger};
///
/// /// Accepts any token. Only for local development.
/// struct DevExchanger;
///
/// impl TokenExchanger for DevExchanger {
///     async fn exchange(
///         &self,
///         request_token: &str,
///         _api_secret: &str,
///     ) -> Result<ExchangedSession, ExchangeError> {
///         Ok(ExchangedSession {
///             user_id: "DEV001".into(),
///             access_token: format!("access-{request_token}"),
///             public_token: None,
///         })
///     }
/// }
/// ```
pub trait TokenExchanger: Send + Sync + 'static {
    /// Trades `request_token` for a broker session.
    ///
    /// # Returns
    /// - `Ok(ExchangedSession)`: the broker accepted the token
    /// - `Err(ExchangeError)`: rejected, expired, or unreachable
    fn exchange(
        &self,
        request_token: &str,
        api_secret: &str,
    ) -> impl Future<Output = Result<ExchangedSession, ExchangeError>> + Send;
}
