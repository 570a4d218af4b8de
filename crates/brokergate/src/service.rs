//! `BrokerService` builder and the login / API entry points.
//!
//! This is what an application (an HTTP server, a tool server, a CLI)
//! holds on to. It ties the layers together:
//!
//! ```text
//! login()            → session layer (begin_login) → protocol (login URL)
//! handle_callback()  → protocol (params) → exchanger → session layer (complete_login)
//! call_api()         → session layer (require_authenticated) → your broker call
//! ```

use std::future::Future;
use std::sync::Arc;

use brokergate_protocol::{LoginTicket, LoginUrlBuilder};
use brokergate_session::{Maintenance, SessionConfig, SessionManager};
use brokergate_sweep::SweepMetrics;
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::{BrokerConfig, BrokerError, ExchangeError, TokenExchanger};

/// Builder for configuring a [`BrokerService`].
///
/// # Example
///
/// ```rust,ignore
/// use brokergate::prelude::*;
///
/// let service = BrokerServiceBuilder::new()
///     .broker_config(BrokerConfig::from_env()?)
///     .build(my_exchanger)?;
/// let ticket = service.login(None)?;
/// ```
pub struct BrokerServiceBuilder {
    broker_config: Option<BrokerConfig>,
    session_config: SessionConfig,
    maintenance: bool,
}

impl BrokerServiceBuilder {
    /// Creates a new builder with default session settings and background
    /// maintenance enabled.
    pub fn new() -> Self {
        Self {
            broker_config: None,
            session_config: SessionConfig::default(),
            maintenance: true,
        }
    }

    /// Sets the broker credentials and endpoints. Required.
    pub fn broker_config(mut self, config: BrokerConfig) -> Self {
        self.broker_config = Some(config);
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Whether to spawn the background sweeps. On by default; turn it off
    /// when the caller drives `sweep_*` itself.
    pub fn maintenance(mut self, enabled: bool) -> Self {
        self.maintenance = enabled;
        self
    }

    /// Builds the service around the given token exchanger.
    ///
    /// With maintenance enabled this spawns tasks, so it must be called
    /// from inside a tokio runtime.
    ///
    /// # Errors
    /// - [`BrokerError::Config`] if no broker config was set.
    /// - [`BrokerError::Protocol`] if the login URL or API key is invalid.
    pub fn build<E: TokenExchanger>(self, exchanger: E) -> Result<BrokerService<E>, BrokerError> {
        let config = self
            .broker_config
            .ok_or_else(|| BrokerError::Config("broker config is required".into()))?;
        let login_urls = LoginUrlBuilder::new(&config.login_base_url, config.api_key.clone())?;

        let sessions = Arc::new(SessionManager::new(self.session_config));
        let maintenance = self.maintenance.then(|| sessions.spawn_maintenance());

        info!(
            login_url = %config.login_base_url,
            callback_url = config.callback_url.as_deref().unwrap_or("<broker default>"),
            user_id = %config.user_id,
            maintenance = maintenance.is_some(),
            "broker service ready"
        );

        Ok(BrokerService {
            sessions,
            exchanger,
            config,
            login_urls,
            maintenance,
        })
    }
}

impl Default for BrokerServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Login flow and authenticated API access for one broker app.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct BrokerService<E: TokenExchanger> {
    pub(crate) sessions: Arc<SessionManager>,
    pub(crate) exchanger: E,
    pub(crate) config: BrokerConfig,
    login_urls: LoginUrlBuilder,
    maintenance: Option<Maintenance>,
}

impl<E: TokenExchanger> BrokerService<E> {
    /// The session manager behind this service.
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn exchanger(&self) -> &E {
        &self.exchanger
    }

    /// Starts a login for `session_id`, or for a freshly generated id
    /// when none (or an empty one) is given.
    ///
    /// Re-using an existing id restarts that session's login.
    pub fn login(&self, session_id: Option<&str>) -> Result<LoginTicket, BrokerError> {
        let session_id = match session_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => generate_session_id(),
        };

        self.sessions.begin_login(&session_id, &self.config.user_id)?;
        let login_url = self.login_urls.build(&session_id);

        info!(%session_id, "generated broker login url");
        Ok(LoginTicket::new(login_url, session_id))
    }

    /// Runs one broker API call on behalf of an authenticated session.
    ///
    /// `call` receives the session's access token. Its error is wrapped
    /// in [`BrokerError::Api`] together with `operation`, which should
    /// read as a verb phrase ("fetch holdings").
    ///
    /// # Errors
    /// - [`BrokerError::Session`] (not found) if the session is unknown,
    ///   expired, or not logged in. `call` is not invoked.
    /// - [`BrokerError::Api`] if `call` fails.
    pub async fn call_api<T, F, Fut>(
        &self,
        session_id: &str,
        operation: &str,
        call: F,
    ) -> Result<T, BrokerError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, ExchangeError>>,
    {
        let access_token = self.sessions.require_authenticated(session_id).map_err(|e| {
            warn!(%session_id, operation, error = %e, "session validation failed");
            e
        })?;

        debug!(%session_id, operation, "performing broker api call");
        call(access_token).await.map_err(|source| {
            error!(%session_id, operation, error = %source, "broker api call failed");
            BrokerError::Api {
                operation: operation.to_string(),
                source,
            }
        })
    }

    /// Ends a session. Returns whether one was removed.
    pub fn logout(&self, session_id: &str) -> bool {
        self.sessions.logout(session_id)
    }

    /// Stops background maintenance and returns the final sweep metrics
    /// as `(sessions, token_mappings)`, if maintenance was running.
    pub async fn shutdown(self) -> Option<(SweepMetrics, SweepMetrics)> {
        let maintenance = self.maintenance?;
        let metrics = maintenance.shutdown().await;
        info!("broker service stopped");
        Some(metrics)
    }
}

/// Generates an unguessable client session id: 128 random bits as 32
/// lowercase hex characters.
fn generate_session_id() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
