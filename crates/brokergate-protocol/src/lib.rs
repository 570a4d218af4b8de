//! Protocol types for Brokergate's redirect login flow.
//!
//! This crate defines the small "language" spoken at the edges of the
//! login flow:
//!
//! - **Types** ([`CallbackParams`], [`CallbackStatus`], [`FlowType`],
//!   [`LoginTicket`]): what the broker sends back on redirect and what
//!   we hand to a client that asked to log in.
//! - **Query codec** ([`decode_query`], [`encode_query`]): how callback
//!   parameters are read from and written to a URL query string.
//! - **Login URLs** ([`LoginUrlBuilder`]): how the broker's login page
//!   URL is assembled so the callback can find its way back to the
//!   originating client session.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer doesn't know about sessions or tokens being valid.
//! It only knows how to parse and build the strings that cross the
//! browser redirect.
//!
//! ```text
//! Browser redirect (query string) → Protocol (CallbackParams) → Session layer
//! ```

mod error;
mod login;
mod query;
mod types;

pub use error::ProtocolError;
pub use login::{LoginUrlBuilder, CLIENT_SESSION_PARAM, REDIRECT_PARAMS_PARAM};
pub use query::{decode_query, encode_query};
pub use types::{CallbackParams, CallbackStatus, FlowType, LoginTicket};
