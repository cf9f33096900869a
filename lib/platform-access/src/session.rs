//! The authenticated session record.
//!
//! A session binds a user record to the token it was issued with. Its
//! permission set is derived from the role exactly once, when the session is
//! built; there is no way to patch it afterwards. A privilege change means a
//! new `Session` value.

use crate::permission::{PermissionCatalog, PermissionSet};
use crate::role::Role;
use crate::token::{AccessToken, StoredToken};
use crate::user::{UserId, UserRecord};
use chrono::{DateTime, Utc};
use portal_core::SessionId;

/// One authenticated actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    user: UserRecord,
    permissions: PermissionSet,
    token: AccessToken,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Builds a session for `user` from the token record the store just
    /// accepted.
    #[must_use]
    pub fn new(user: UserRecord, token: &StoredToken) -> Self {
        Self::with_id(SessionId::new(), user, token)
    }

    /// Builds a session with a known id.
    #[must_use]
    pub fn with_id(id: SessionId, user: UserRecord, token: &StoredToken) -> Self {
        let permissions = if user.role.is_guest() {
            PermissionSet::empty()
        } else {
            PermissionCatalog::permissions_for(user.role)
        };
        Self {
            id,
            user,
            permissions,
            token: token.token.clone(),
            issued_at: token.issued_at,
            expires_at: token.expires_at,
        }
    }

    /// Returns a new session for a re-fetched user record, keeping this
    /// session's id. Permissions are derived again from the new role.
    #[must_use]
    pub fn refreshed(&self, user: UserRecord, token: &StoredToken) -> Self {
        Self::with_id(self.id, user, token)
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn user(&self) -> &UserRecord {
        &self.user
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user.id
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.user.email
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.user.display_name
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.user.role
    }

    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    #[must_use]
    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Guests are never authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.user.role.is_guest()
    }

    /// Returns true if the session's own expiry has passed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
