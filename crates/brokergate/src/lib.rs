//! # Brokergate
//!
//! Broker login flow and authenticated API access for multi-client
//! servers.
//!
//! Many clients share one server; each logs in to the broker through a
//! browser redirect and then makes API calls with its own access token.
//! Brokergate keeps track of which client is logged in with which token,
//! expires idle sessions, and cleans up after itself.
//!
//! You implement one trait, [`TokenExchanger`], with your broker's
//! request-token exchange. The service handles the rest:
//!
//! 1. [`BrokerService::login`] creates a pending session and returns a
//!    [`LoginTicket`] with the broker login URL.
//! 2. The broker redirects to your callback route; pass the query to
//!    [`BrokerService::handle_callback_query`] and redirect the browser to
//!    [`CallbackOutcome::redirect`].
//! 3. [`BrokerService::call_api`] runs broker calls with the session's
//!    access token, or fails with a "please login again" error.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use brokergate::prelude::*;
//!
//! // Implement TokenExchanger for your broker client, then:
//! // let service = BrokerServiceBuilder::new()
//! //     .broker_config(BrokerConfig::from_env()?)
//! //     .build(my_exchanger)?;
//! // let ticket = service.login(None)?;
//! ```

mod callback;
mod config;
mod error;
mod exchange;
mod service;
pub mod telemetry;

pub use callback::{CallbackOutcome, ERROR_REDIRECT, SUCCESS_REDIRECT};
pub use config::{BrokerConfig, DEFAULT_LOGIN_URL};
pub use error::BrokerError;
pub use exchange::{ExchangeError, ExchangedSession, TokenExchanger};
pub use service::{BrokerService, BrokerServiceBuilder};

pub use brokergate_protocol as protocol;
pub use brokergate_session as session;
pub use brokergate_sweep as sweep;

pub use brokergate_protocol::{CallbackParams, LoginTicket};

/// Everything an application needs in one import.
pub mod prelude {
    pub use crate::{
        BrokerConfig, BrokerError, BrokerService, BrokerServiceBuilder, CallbackOutcome,
        CallbackParams, ExchangeError, ExchangedSession, LoginTicket, TokenExchanger,
    };
    pub use brokergate_session::{LoginFlow, SessionConfig, SessionError};
}
