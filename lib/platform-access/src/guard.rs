//! Route guard.
//!
//! A pure decision function evaluated at every navigation boundary. Given
//! the current [`AuthState`] and what the target route requires, it decides
//! whether to render, wait, or redirect.

use crate::authz;
use crate::permission::Permission;
use crate::role::{Role, RoleQuery};
use crate::state::AuthState;
use serde::Serialize;

/// Route of the sign-in entry point.
pub const LOGIN_ROUTE: &str = "/login";

/// Route shown when an authenticated user lacks access.
pub const UNAUTHORIZED_ROUTE: &str = "/unauthorized";

/// What a protected route demands of the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteRequirement {
    roles: Option<RoleQuery>,
    permission: Option<Permission>,
}

impl RouteRequirement {
    /// Any authenticated, non-guest session.
    #[must_use]
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// Requires the session role to satisfy `roles`.
    #[must_use]
    pub fn roles(mut self, roles: impl Into<RoleQuery>) -> Self {
        self.roles = Some(roles.into());
        self
    }

    /// Requires the session to hold `permission`.
    #[must_use]
    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    /// Shorthand for a route open to exactly one role.
    #[must_use]
    pub fn role(role: Role) -> Self {
        Self::authenticated().roles(role)
    }
}

/// Outcome of a guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Identity is still resolving; show a placeholder.
    Loading,
    /// Render the target.
    Render,
    /// Send the user to sign in, returning to `return_to` afterwards.
    RedirectToLogin { return_to: String },
    /// Signed in but not allowed.
    RedirectToUnauthorized,
}

impl GuardDecision {
    /// Path to navigate to, if the decision is a redirect.
    #[must_use]
    pub fn redirect_path(&self) -> Option<&'static str> {
        match self {
            Self::RedirectToLogin { .. } => Some(LOGIN_ROUTE),
            Self::RedirectToUnauthorized => Some(UNAUTHORIZED_ROUTE),
            Self::Loading | Self::Render => None,
        }
    }
}

/// Navigation gatekeeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteGuard;

impl RouteGuard {
    /// Decides what to do with a navigation to `requested_path`.
    #[must_use]
    pub fn decide(
        state: &AuthState,
        requirement: &RouteRequirement,
        requested_path: &str,
    ) -> GuardDecision {
        let session = match state {
            AuthState::Authenticating | AuthState::Refreshing(_) => return GuardDecision::Loading,
            AuthState::Unauthenticated => None,
            AuthState::Authenticated(session) => Some(session).filter(|s| s.is_authenticated()),
        };

        let Some(session) = session else {
            return GuardDecision::RedirectToLogin {
                return_to: requested_path.to_string(),
            };
        };

        let role_ok = requirement
            .roles
            .as_ref()
            .is_none_or(|roles| authz::is_authorized(Some(session), roles.clone()));
        let permission_ok = requirement
            .permission
            .is_none_or(|permission| authz::has_permission(Some(session), permission));

        if role_ok && permission_ok {
            GuardDecision::Render
        } else {
            GuardDecision::RedirectToUnauthorized
        }
    }
}
