//! Core protocol types for the redirect login flow.
//!
//! These are the structures that cross the browser redirect: the query
//! parameters the broker appends when it sends the user back to us, and
//! the ticket we return to a client that asked to log in.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// CallbackStatus
// ---------------------------------------------------------------------------

/// The `status` parameter of a broker callback.
///
/// The broker sends `status=success` when the user completed the login
/// page. Anything else (cancelled, denied, a broker-side failure) is kept
/// verbatim in [`CallbackStatus::Failed`] so it can be logged.
///
/// `#[serde(from = "String", into = "String")]` makes serde go through
/// the `From` impls below, so the wire value stays a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CallbackStatus {
    /// The user logged in and the request token is usable.
    Success,
    /// Any other status string reported by the broker.
    Failed(String),
}

impl CallbackStatus {
    /// Returns `true` for `status=success`.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<String> for CallbackStatus {
    fn from(value: String) -> Self {
        if value == "success" {
            Self::Success
        } else {
            Self::Failed(value)
        }
    }
}

impl From<CallbackStatus> for String {
    fn from(value: CallbackStatus) -> Self {
        match value {
            CallbackStatus::Success => "success".to_string(),
            CallbackStatus::Failed(s) => s,
        }
    }
}

impl fmt::Display for CallbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed(s) => write!(f, "{s}"),
        }
    }
}

// ---------------------------------------------------------------------------
// FlowType
// ---------------------------------------------------------------------------

/// The optional `type` parameter of a broker callback.
///
/// Defaults to `login` when the broker omits it. Other flow types are
/// carried through untouched; the session layer treats them all the same.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FlowType {
    #[default]
    Login,
    Other(String),
}

impl From<String> for FlowType {
    fn from(value: String) -> Self {
        if value == "login" {
            Self::Login
        } else {
            Self::Other(value)
        }
    }
}

impl From<FlowType> for String {
    fn from(value: FlowType) -> Self {
        match value {
            FlowType::Login => "login".to_string(),
            FlowType::Other(s) => s,
        }
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => write!(f, "login"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

// ---------------------------------------------------------------------------
// CallbackParams
// ---------------------------------------------------------------------------

/// Query parameters of `GET /callback?...` after the broker redirect.
///
/// ```text
/// /callback?request_token=abc&client_session=4f1c...&status=success&type=login
/// ```
///
/// `client_session` is echoed back from the `redirect_params` we put on
/// the login URL. Some brokers drop it; in that case the callback handler
/// falls back to the request-token mapping to find the waiting session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackParams {
    /// One-time request token issued by the broker.
    pub request_token: String,

    /// The client session that started this login, if the broker echoed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_session: Option<String>,

    /// Outcome reported by the broker.
    pub status: CallbackStatus,

    /// Flow type (`login` unless the broker says otherwise).
    #[serde(rename = "type", default)]
    pub flow_type: FlowType,
}

impl CallbackParams {
    /// Parses callback parameters from a raw query string (without `?`).
    ///
    /// # Errors
    /// - [`ProtocolError::InvalidQuery`] if a required parameter is missing.
    /// - [`ProtocolError::InvalidMessage`] if `request_token` is empty.
    pub fn from_query(query: &str) -> Result<Self, ProtocolError> {
        let params: Self = crate::decode_query(query)?;
        if params.request_token.is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "request_token must not be empty".into(),
            ));
        }
        Ok(params)
    }

    /// The echoed client session id, treating an empty value as absent.
    pub fn client_session(&self) -> Option<&str> {
        self.client_session.as_deref().filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// LoginTicket
// ---------------------------------------------------------------------------

/// Default instruction returned alongside a login URL.
const LOGIN_MESSAGE: &str = "Please open this URL in your browser to login. \
     Once you've logged in successfully, you can proceed with other operations.";

/// What a client receives after asking to log in.
///
/// The client opens `login_url` in a browser and keeps `session_id` to
/// identify itself on every later API call.
///
/// Serialized in camelCase (`loginUrl`, `sessionId`) for tool clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginTicket {
    pub login_url: String,
    pub session_id: String,
    pub message: String,
}

impl LoginTicket {
    /// Creates a ticket with the default instruction message.
    pub fn new(login_url: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            login_url: login_url.into(),
            session_id: session_id.into(),
            message: LOGIN_MESSAGE.to_string(),
        }
    }

    /// Serializes the ticket as a JSON object.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    #[cfg(feature = "json")]
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}
