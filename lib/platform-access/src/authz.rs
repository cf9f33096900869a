//! Authorization engine.
//!
//! Pure functions of `(session, query)`. An absent session, or a guest
//! session, answers `false` to every query.

use crate::error::AuthorizationError;
use crate::permission::Permission;
use crate::role::RoleQuery;
use crate::session::Session;

fn authenticated(session: Option<&Session>) -> Option<&Session> {
    session.filter(|s| s.is_authenticated())
}

/// True iff the session holds `permission`.
#[must_use]
pub fn has_permission(session: Option<&Session>, permission: Permission) -> bool {
    authenticated(session).is_some_and(|s| s.permissions().contains(permission))
}

/// True iff the session holds at least one of `permissions`.
#[must_use]
pub fn has_any_permission(session: Option<&Session>, permissions: &[Permission]) -> bool {
    permissions.iter().any(|p| has_permission(session, *p))
}

/// True iff the session holds every one of `permissions`.
///
/// An empty list is only satisfied by an authenticated session.
#[must_use]
pub fn has_all_permissions(session: Option<&Session>, permissions: &[Permission]) -> bool {
    authenticated(session).is_some() && permissions.iter().all(|p| has_permission(session, *p))
}

/// True iff the session's role satisfies `query`.
#[must_use]
pub fn has_role(session: Option<&Session>, query: impl Into<RoleQuery>) -> bool {
    let query = query.into();
    authenticated(session).is_some_and(|s| query.matches(s.role()))
}

/// Role check used at route boundaries; same answer as [`has_role`].
#[must_use]
pub fn is_authorized(session: Option<&Session>, required: impl Into<RoleQuery>) -> bool {
    has_role(session, required)
}

/// Like [`has_permission`] but returns an error describing the denial.
pub fn require_permission(
    session: Option<&Session>,
    permission: Permission,
) -> Result<(), AuthorizationError> {
    let session = authenticated(session).ok_or(AuthorizationError::NotAuthenticated)?;
    if session.permissions().contains(permission) {
        Ok(())
    } else {
        Err(AuthorizationError::PermissionDenied {
            user_id: session.user_id().clone(),
            permission,
        })
    }
}

/// Like [`has_role`] but returns an error describing the denial.
pub fn require_role(
    session: Option<&Session>,
    required: impl Into<RoleQuery>,
) -> Result<(), AuthorizationError> {
    let required = required.into();
    let session = authenticated(session).ok_or(AuthorizationError::NotAuthenticated)?;
    if required.matches(session.role()) {
        Ok(())
    } else {
        Err(AuthorizationError::RoleRequired {
            user_id: session.user_id().clone(),
            required: format!("{required:?}"),
        })
    }
}
