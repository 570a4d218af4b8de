//! Error types for the session layer.

use std::fmt;

/// Why a session lookup came back empty.
///
/// Callers only need to know "log in again", so every case shares the
/// single [`SessionError::NotFound`] kind. The reason is kept for logs
/// and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// No record was ever created for this id (or it was removed).
    Missing,
    /// The record existed but its inactivity window had elapsed.
    Expired,
    /// The record exists but login hasn't completed.
    Unauthenticated,
    /// No live token mapping points at this session.
    NoPendingLogin,
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Expired => write!(f, "expired"),
            Self::Unauthenticated => write!(f, "not authenticated"),
            Self::NoPendingLogin => write!(f, "no pending login"),
        }
    }
}

/// Errors that can occur during session management.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// An empty or malformed identifier was passed in. Always a caller
    /// bug; retrying won't help.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The session can't be used: it never existed, expired, or hasn't
    /// finished logging in. Remediation is the same in every case.
    #[error("session {session_id} not found ({reason}), please login again")]
    NotFound {
        session_id: String,
        reason: NotFoundReason,
    },

    /// A request token has no live mapping (never stored, already
    /// consumed, or older than the token expiry).
    #[error("no session mapped to request token")]
    MappingNotResolved,
}

impl SessionError {
    pub(crate) fn not_found(session_id: &str, reason: NotFoundReason) -> Self {
        Self::NotFound {
            session_id: session_id.to_string(),
            reason,
        }
    }

    /// `true` for every [`SessionError::NotFound`], whatever the reason.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The not-found reason, if this is a not-found error.
    pub fn not_found_reason(&self) -> Option<NotFoundReason> {
        match self {
            Self::NotFound { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// Rejects empty identifiers with [`SessionError::InvalidArgument`].
pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<(), SessionError> {
    if value.is_empty() {
        tracing::error!(field, "rejected empty identifier");
        return Err(SessionError::InvalidArgument(format!("{field} cannot be empty")));
    }
    Ok(())
}
