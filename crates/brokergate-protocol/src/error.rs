//! Error types for the protocol layer.

/// Errors that can occur while parsing or building protocol strings.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A callback query string could not be decoded.
    ///
    /// Common causes: a missing `request_token` or `status` parameter,
    /// or a query that was truncated by the browser.
    #[error("invalid query: {0}")]
    InvalidQuery(#[from] serde_urlencoded::de::Error),

    /// A value could not be encoded as a query string.
    #[error("query encode failed: {0}")]
    EncodeQuery(#[from] serde_urlencoded::ser::Error),

    /// A configured URL (login page, callback) is not a valid URL.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Serializing a login ticket to JSON failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The message parsed but violates a protocol rule, e.g. an empty
    /// request token.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
