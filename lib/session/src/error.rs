//! Error types for the session crate.
//!
//! Every failure a session operation can surface is a [`SessionError`].
//! [`ErrorKind`] buckets them for callers that only need to know how to
//! react: show a form error, send the user to sign in, or offer a retry.

use portal_identity::{IdentityError, ValidationError};
use rootcause::Report;
use std::fmt;

/// How a caller should treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input; fix it and resubmit.
    Validation,
    /// Credentials, token, or social handshake were not accepted.
    Authentication,
    /// Signed in but not allowed.
    Authorization,
    /// The remote side could not be reached or answered badly.
    Transport,
    /// A later operation took over before this one finished.
    Cancelled,
    /// Misconfiguration of the session core itself.
    Internal,
}

impl ErrorKind {
    /// True if retrying the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport)
    }
}

/// Failures surfaced by [`SessionManager`](crate::SessionManager)
/// operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Request rejected locally before any remote call.
    InvalidInput { reason: String },
    /// Email/password pair was not accepted.
    InvalidCredentials,
    /// The external provider handshake or its exchange failed.
    SocialLoginFailed { provider: String, reason: String },
    /// The operation needs a signed-in user.
    NotAuthenticated,
    /// The token expired or was refused; the session has been ended.
    SessionExpired,
    /// The identity provider refused the request.
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },
    /// The identity provider could not be reached.
    Unavailable { reason: String },
    /// The identity provider did not answer in time.
    Timeout,
    /// The identity provider answered with something unreadable.
    MalformedResponse { reason: String },
    /// A later login, logout, or expiry overtook this operation; its result
    /// was discarded.
    Superseded,
    /// The session core is missing a collaborator or setting.
    Configuration { reason: String },
}

impl SessionError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::Validation,
            Self::InvalidCredentials
            | Self::SocialLoginFailed { .. }
            | Self::NotAuthenticated
            | Self::SessionExpired => ErrorKind::Authentication,
            Self::Rejected { status: 403, .. } => ErrorKind::Authorization,
            Self::Rejected { status, .. } if *status >= 500 => ErrorKind::Transport,
            Self::Rejected { .. } => ErrorKind::Validation,
            Self::Unavailable { .. } | Self::Timeout | Self::MalformedResponse { .. } => {
                ErrorKind::Transport
            }
            Self::Superseded => ErrorKind::Cancelled,
            Self::Configuration { .. } => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code. Server rejections keep the server's
    /// own code when it sent one.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::InvalidCredentials => "invalid_credentials",
            Self::SocialLoginFailed { .. } => "social_login_failed",
            Self::NotAuthenticated => "not_authenticated",
            Self::SessionExpired => "session_expired",
            Self::Rejected {
                code: Some(code), ..
            } => code.as_str(),
            Self::Rejected { code: None, .. } => "rejected",
            Self::Unavailable { .. } => "unavailable",
            Self::Timeout => "timeout",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Superseded => "superseded",
            Self::Configuration { .. } => "configuration",
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { reason } => write!(f, "invalid input: {reason}"),
            Self::InvalidCredentials => write!(f, "invalid email or password"),
            Self::SocialLoginFailed { provider, reason } => {
                write!(f, "{provider} sign-in failed: {reason}")
            }
            Self::NotAuthenticated => write!(f, "not signed in"),
            Self::SessionExpired => write!(f, "session expired, sign in again"),
            Self::Rejected { message, .. } => write!(f, "{message}"),
            Self::Unavailable { reason } => write!(f, "identity service unavailable: {reason}"),
            Self::Timeout => write!(f, "identity service timed out"),
            Self::MalformedResponse { reason } => {
                write!(f, "unexpected response from identity service: {reason}")
            }
            Self::Superseded => write!(f, "operation superseded by a newer one"),
            Self::Configuration { reason } => write!(f, "session misconfigured: {reason}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<IdentityError> for SessionError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials => Self::InvalidCredentials,
            IdentityError::Unauthorized => Self::SessionExpired,
            IdentityError::Rejected {
                status,
                code,
                message,
            } => Self::Rejected {
                status,
                code,
                message,
            },
            IdentityError::SocialHandshakeFailed { provider, reason } => {
                Self::SocialLoginFailed { provider, reason }
            }
            IdentityError::Unavailable { reason } => Self::Unavailable { reason },
            IdentityError::Timeout => Self::Timeout,
            IdentityError::MalformedResponse { reason } => Self::MalformedResponse { reason },
        }
    }
}

impl From<ValidationError> for SessionError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidInput {
            reason: err.to_string(),
        }
    }
}

/// Re-types an identity report as a session report, keeping the original
/// as its cause.
pub(crate) fn from_identity(report: Report<IdentityError>) -> Report<SessionError> {
    let err = SessionError::from(report.current_context().clone());
    report.context(err)
}
