//! Query-string codec for callback parameters.
//!
//! The broker talks to us through URL query strings, so the only "codec"
//! this crate needs is `application/x-www-form-urlencoded`. Both helpers
//! are thin wrappers over `serde_urlencoded` that convert its errors into
//! [`ProtocolError`], so callers deal with one error type.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Decodes a query string (without the leading `?`) into `T`.
///
/// # Errors
/// Returns [`ProtocolError::InvalidQuery`] if a required field is missing
/// or a value has the wrong shape.
pub fn decode_query<T: DeserializeOwned>(query: &str) -> Result<T, ProtocolError> {
    let query = query.strip_prefix('?').unwrap_or(query);
    Ok(serde_urlencoded::from_str(query)?)
}

/// Encodes `value` as a query string (without the leading `?`).
///
/// # Errors
/// Returns [`ProtocolError::EncodeQuery`] if `value` is not a flat
/// key/value structure.
pub fn encode_query<T: Serialize>(value: &T) -> Result<String, ProtocolError> {
    Ok(serde_urlencoded::to_string(value)?)
}
