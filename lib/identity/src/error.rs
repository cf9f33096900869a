//! Error types for the identity crate.
//!
//! - `IdentityError`: a call to the identity provider failed
//! - `ValidationError`: a request was rejected locally before any call

use std::fmt;

/// Failures reported by an identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Email/password pair was not accepted.
    InvalidCredentials,
    /// The bearer token was refused (HTTP 401 outside of sign-in).
    Unauthorized,
    /// The provider refused the request for a domain reason.
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },
    /// The social provider handshake did not produce an assertion.
    SocialHandshakeFailed { provider: String, reason: String },
    /// The provider could not be reached.
    Unavailable { reason: String },
    /// The provider did not answer in time.
    Timeout,
    /// The provider answered success with a body we cannot read.
    MalformedResponse { reason: String },
}

impl IdentityError {
    /// True for errors that must end the current session.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// True for reachability failures.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout)
    }
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid email or password"),
            Self::Unauthorized => write!(f, "identity provider refused the session token"),
            Self::Rejected {
                status,
                code,
                message,
            } => match code {
                Some(code) => write!(f, "request rejected ({status}, {code}): {message}"),
                None => write!(f, "request rejected ({status}): {message}"),
            },
            Self::SocialHandshakeFailed { provider, reason } => {
                write!(f, "{provider} sign-in failed: {reason}")
            }
            Self::Unavailable { reason } => {
                write!(f, "identity provider unavailable: {reason}")
            }
            Self::Timeout => write!(f, "identity provider timed out"),
            Self::MalformedResponse { reason } => {
                write!(f, "identity provider sent an unreadable response: {reason}")
            }
        }
    }
}

impl std::error::Error for IdentityError {}

/// Local input validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is empty or absent.
    MissingField { field: &'static str },
    /// The requested role cannot be self-registered.
    RoleNotRegistrable { role: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { field } => write!(f, "{field} is required"),
            Self::RoleNotRegistrable { role } => {
                write!(f, "accounts with role {role} cannot be self-registered")
            }
        }
    }
}

impl std::error::Error for ValidationError {}
