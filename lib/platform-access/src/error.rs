//! Error types for the platform-access crate.
//!
//! - `AuthorizationError`: a permission or role check failed
//! - `UnknownRole` / `UnknownPermission`: closed vocabularies rejected input
//! - `MalformedToken`: a bearer token could not be decoded
//! - `TokenSlotError`: the persisted token slot could not be read or written
//! - `TokenLifetimeOutOfRange`: a token lifetime runs past the representable calendar

use crate::permission::Permission;
use crate::user::UserId;
use std::fmt;

/// Errors from authorization checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// No authenticated session is present.
    NotAuthenticated,
    /// The session lacks the required permission.
    PermissionDenied {
        user_id: UserId,
        permission: Permission,
    },
    /// The session's role does not satisfy the role check.
    RoleRequired { user_id: UserId, required: String },
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "user is not authenticated"),
            Self::PermissionDenied {
                user_id,
                permission,
            } => write!(f, "user {user_id} lacks permission {permission}"),
            Self::RoleRequired { user_id, required } => {
                write!(f, "user {user_id} does not hold required role {required}")
            }
        }
    }
}

impl std::error::Error for AuthorizationError {}

/// A role name outside the closed role set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole {
    pub name: String,
}

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.name)
    }
}

impl std::error::Error for UnknownRole {}

/// A permission tag outside the closed permission vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPermission {
    pub tag: String,
}

impl fmt::Display for UnknownPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown permission tag: {}", self.tag)
    }
}

impl std::error::Error for UnknownPermission {}

/// A token whose structure or claims could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedToken {
    pub reason: String,
}

impl fmt::Display for MalformedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed token: {}", self.reason)
    }
}

impl std::error::Error for MalformedToken {}

/// Errors from the persisted token slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSlotError {
    /// Reading the slot failed.
    ReadFailed { location: String, reason: String },
    /// Writing the slot failed.
    WriteFailed { location: String, reason: String },
    /// The slot held data that is not a token record.
    Corrupt { location: String, reason: String },
}

impl fmt::Display for TokenSlotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed { location, reason } => {
                write!(f, "failed to read token slot {location}: {reason}")
            }
            Self::WriteFailed { location, reason } => {
                write!(f, "failed to write token slot {location}: {reason}")
            }
            Self::Corrupt { location, reason } => {
                write!(f, "token slot {location} is corrupt: {reason}")
            }
        }
    }
}

impl std::error::Error for TokenSlotError {}

/// A token lifetime whose expiry instant cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLifetimeOutOfRange {
    pub ttl_seconds: i64,
}

impl fmt::Display for TokenLifetimeOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token lifetime of {}s is out of range", self.ttl_seconds)
    }
}

impl std::error::Error for TokenLifetimeOutOfRange {}
