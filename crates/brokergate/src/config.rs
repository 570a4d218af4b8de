//! Broker credentials and endpoints.

use std::env;
use std::fmt;

use crate::BrokerError;

/// Login page used when `BROKER_LOGIN_URL` isn't set.
pub const DEFAULT_LOGIN_URL: &str = "https://kite.zerodha.com/connect/login";

/// Credentials and endpoints for one broker app.
///
/// Read it from the environment with [`BrokerConfig::from_env`], or build
/// it directly in tests.
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub api_key: String,
    pub api_secret: String,
    /// Broker user new sessions are created for.
    pub user_id: String,
    /// The broker's login page. `api_key` and `v` are appended if missing.
    pub login_base_url: String,
    /// Where the broker redirects after login. Registered with the broker;
    /// kept here so it can be logged and shown.
    pub callback_url: Option<String>,
}

impl BrokerConfig {
    pub const API_KEY_VAR: &'static str = "BROKER_API_KEY";
    pub const API_SECRET_VAR: &'static str = "BROKER_API_SECRET";
    pub const USER_ID_VAR: &'static str = "BROKER_USER_ID";
    pub const LOGIN_URL_VAR: &'static str = "BROKER_LOGIN_URL";
    pub const CALLBACK_URL_VAR: &'static str = "BROKER_CALLBACK_URL";

    /// Reads the config from process environment variables.
    ///
    /// # Errors
    /// [`BrokerError::Config`] naming the first required variable that is
    /// missing or empty.
    pub fn from_env() -> Result<Self, BrokerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the config through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BrokerError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| BrokerError::Config(format!("{key} must be set")))
        };

        Ok(Self {
            api_key: require(Self::API_KEY_VAR)?,
            api_secret: require(Self::API_SECRET_VAR)?,
            user_id: require(Self::USER_ID_VAR)?,
            login_base_url: get(Self::LOGIN_URL_VAR)
                .unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
            callback_url: get(Self::CALLBACK_URL_VAR),
        })
    }
}

// Keeps the secret out of logs.
impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("login_base_url", &self.login_base_url)
            .field("callback_url", &self.callback_url)
            .finish()
    }
}
