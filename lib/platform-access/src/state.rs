//! Observable authentication state.

use crate::session::Session;

/// Where the session manager currently stands.
///
/// Consumers match on this exhaustively instead of null-checking an
/// optional user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    /// Nobody is signed in.
    #[default]
    Unauthenticated,
    /// A sign-in or identity restore is in flight with no prior session.
    Authenticating,
    /// A session is established.
    Authenticated(Session),
    /// A session is established and being re-validated.
    Refreshing(Session),
}

impl AuthState {
    /// Returns the current session, including one being refreshed.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) | Self::Refreshing(session) => Some(session),
            Self::Unauthenticated | Self::Authenticating => None,
        }
    }

    /// Returns true while identity is still being resolved.
    #[must_use]
    pub fn is_resolving(&self) -> bool {
        matches!(self, Self::Authenticating | Self::Refreshing(_))
    }

    /// Returns true if a non-guest session is established.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session().is_some_and(Session::is_authenticated)
    }

    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticating => "authenticating",
            Self::Authenticated(_) => "authenticated",
            Self::Refreshing(_) => "refreshing",
        }
    }
}
