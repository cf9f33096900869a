//! Error types for the notifications crate.

use std::fmt;

/// Failures opening a push connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The endpoint refused the bearer token.
    Unauthorized,
    /// The connection request could not be built (bad URL or header).
    InvalidRequest { reason: String },
    /// The endpoint could not be reached or the handshake failed.
    ConnectFailed { reason: String },
}

impl TransportError {
    /// True if retrying with the same token can succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectFailed { .. })
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "push endpoint refused the session token"),
            Self::InvalidRequest { reason } => write!(f, "invalid push connection request: {reason}"),
            Self::ConnectFailed { reason } => write!(f, "push connection failed: {reason}"),
        }
    }
}

impl std::error::Error for TransportError {}
