//! Login URL construction.
//!
//! The broker's login page redirects back to our callback after the user
//! signs in. To know WHICH client session that callback belongs to, we
//! smuggle the session id through the broker in `redirect_params`:
//!
//! ```text
//! https://broker.example/connect/login?v=3&api_key=KEY&redirect_params=client_session%3D4f1c...
//!                                                                       └─ echoed back as ?client_session=4f1c...
//! ```

use url::Url;
use url::form_urlencoded;

use crate::ProtocolError;

/// Query key the broker echoes back verbatim on redirect.
pub const REDIRECT_PARAMS_PARAM: &str = "redirect_params";

/// Key inside `redirect_params` that carries the client session id.
pub const CLIENT_SESSION_PARAM: &str = "client_session";

/// Login API version understood by the broker.
const LOGIN_API_VERSION: &str = "3";

/// Builds per-session broker login URLs from a fixed base URL and API key.
#[derive(Debug, Clone)]
pub struct LoginUrlBuilder {
    base: Url,
    api_key: String,
}

impl LoginUrlBuilder {
    /// Creates a builder for the given broker login page.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidUrl`] if `base` does not parse, or
    /// [`ProtocolError::InvalidMessage`] if `api_key` is empty.
    pub fn new(base: &str, api_key: impl Into<String>) -> Result<Self, ProtocolError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ProtocolError::InvalidMessage("api_key must not be empty".into()));
        }
        Ok(Self {
            base: Url::parse(base)?,
            api_key,
        })
    }

    /// Returns the login URL for one client session.
    ///
    /// `api_key` and `v` are only added when the base URL doesn't already
    /// carry them.
    pub fn build(&self, client_session_id: &str) -> Url {
        let mut url = self.base.clone();
        let has_key = url.query_pairs().any(|(k, _)| k == "api_key");
        let has_version = url.query_pairs().any(|(k, _)| k == "v");

        let redirect_params = form_urlencoded::Serializer::new(String::new())
            .append_pair(CLIENT_SESSION_PARAM, client_session_id)
            .finish();

        {
            let mut pairs = url.query_pairs_mut();
            if !has_version {
                pairs.append_pair("v", LOGIN_API_VERSION);
            }
            if !has_key {
                pairs.append_pair("api_key", &self.api_key);
            }
            pairs.append_pair(REDIRECT_PARAMS_PARAM, &redirect_params);
        }
        url
    }

    /// The API key this builder signs URLs with.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}
