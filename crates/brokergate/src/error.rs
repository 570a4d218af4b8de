//! Unified error type for Brokergate.

use brokergate_protocol::ProtocolError;
use brokergate_session::SessionError;

use crate::ExchangeError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `brokergate` crate you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates the `From` impls, so `?` converts
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// A session-level error (not found, expired, invalid argument).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A protocol-level error (malformed callback query, bad login URL).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The request-token exchange failed.
    #[error("token exchange failed: {0}")]
    Exchange(#[from] ExchangeError),

    /// A broker API call failed. `operation` names what was attempted.
    #[error("failed to {operation}: {source}")]
    Api {
        operation: String,
        #[source]
        source: ExchangeError,
    },

    /// Required configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl BrokerError {
    /// `true` when the caller should log in (again) before retrying.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Session(e) if e.is_not_found())
    }
}

#[cfg(test)]
mod tests {
    use brokergate_session::SessionManager;

    use super::*;

    #[test]
    fn test_from_session_error() {
        let err = SessionManager::default()
            .require_authenticated("s1")
            .unwrap_err();
        let broker_err: BrokerError = err.into();
        assert!(matches!(broker_err, BrokerError::Session(_)));
        assert!(broker_err.requires_login());
        assert!(broker_err.to_string().contains("please login again"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let broker_err: BrokerError = err.into();
        assert!(matches!(broker_err, BrokerError::Protocol(_)));
        assert!(!broker_err.requires_login());
    }

    #[test]
    fn test_from_exchange_error() {
        let err = ExchangeError::Rejected {
            code: 403,
            message: "invalid checksum".into(),
        };
        let broker_err: BrokerError = err.into();
        assert!(matches!(broker_err, BrokerError::Exchange(_)));
        assert!(broker_err.to_string().contains("invalid checksum"));
    }

    #[test]
    fn test_api_error_names_operation() {
        let err = BrokerError::Api {
            operation: "fetch holdings".into(),
            source: ExchangeError::Transport("connection reset".into()),
        };
        assert_eq!(
            err.to_string(),
            "failed to fetch holdings: network error: connection reset"
        );
    }
}
