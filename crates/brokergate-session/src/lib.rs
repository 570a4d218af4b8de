//! Client session management for Brokergate.
//!
//! This crate is the state service behind the broker login flow:
//!
//! 1. **Sessions**: one record per client, holding the broker access
//!    token once login completes ([`SessionStore`]).
//! 2. **Token mappings**: short-lived links from a one-time request
//!    token to the client session waiting for it ([`TokenMappingStore`]).
//! 3. **The facade**: [`SessionManager`] combines both stores into the
//!    begin/complete/require operations the rest of the system uses, and
//!    owns the background sweeps ([`Maintenance`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Broker service (above)  ← login entry point, callback handler, API calls
//!     ↕
//! Session Layer (this crate)  ← who is logged in, with which access token
//!     ↕
//! Sweep scheduler (below)  ← periodic removal of expired entries
//! ```
//!
//! # Concurrency
//!
//! Every type here is `Send + Sync` and meant to be shared behind an
//! `Arc`. Both stores are sharded concurrent maps: operations on one key
//! are atomic, and operations on different keys don't wait for each
//! other. Nothing in this crate awaits.

mod config;
mod error;
mod maintenance;
mod manager;
mod mapping;
mod session;
mod store;

pub use config::{LoginFlow, SessionConfig};
pub use error::{NotFoundReason, SessionError};
pub use maintenance::Maintenance;
pub use manager::SessionManager;
pub use mapping::{TokenMapping, TokenMappingStore};
pub use session::SessionRecord;
pub use store::SessionStore;
