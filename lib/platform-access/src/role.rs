//! Platform roles.
//!
//! Every account on the platform carries exactly one coarse role. The role
//! decides the default permission set (see [`crate::permission`]) and the
//! landing route after sign-in.

use crate::error::UnknownRole;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse actor category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Platform operator with oversight of every account.
    Admin,
    /// Employer posting jobs and reviewing applications.
    Company,
    /// Ambassador applying to jobs and completing tasks.
    Ambassador,
    /// Anonymous visitor; never authenticated.
    Guest,
}

impl Role {
    /// Every role, in catalog order.
    pub const ALL: [Role; 4] = [Role::Admin, Role::Company, Role::Ambassador, Role::Guest];

    /// Returns the wire name of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Company => "company",
            Self::Ambassador => "ambassador",
            Self::Guest => "guest",
        }
    }

    /// Returns true for the guest role.
    #[must_use]
    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest)
    }

    /// Route a freshly signed-in actor lands on.
    #[must_use]
    pub fn home_route(&self) -> &'static str {
        match self {
            Self::Admin => "/admin/dashboard",
            Self::Company => "/company/dashboard",
            Self::Ambassador => "/ambassador/dashboard",
            Self::Guest => "/",
        }
    }

    /// Returns true if an account with this role may be created through
    /// public registration.
    #[must_use]
    pub fn is_self_registrable(&self) -> bool {
        matches!(self, Self::Company | Self::Ambassador)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole {
                name: s.to_string(),
            })
    }
}

/// A role check: either one exact role or membership in a set of roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleQuery {
    /// Exactly this role.
    One(Role),
    /// Any of these roles. An empty set matches nothing.
    AnyOf(Vec<Role>),
}

impl RoleQuery {
    /// Returns true if `role` satisfies the query.
    #[must_use]
    pub fn matches(&self, role: Role) -> bool {
        match self {
            Self::One(required) => *required == role,
            Self::AnyOf(roles) => roles.contains(&role),
        }
    }
}

impl From<Role> for RoleQuery {
    fn from(role: Role) -> Self {
        Self::One(role)
    }
}

impl From<Vec<Role>> for RoleQuery {
    fn from(roles: Vec<Role>) -> Self {
        Self::AnyOf(roles)
    }
}

impl From<&[Role]> for RoleQuery {
    fn from(roles: &[Role]) -> Self {
        Self::AnyOf(roles.to_vec())
    }
}

impl<const N: usize> From<[Role; N]> for RoleQuery {
    fn from(roles: [Role; N]) -> Self {
        Self::AnyOf(roles.to_vec())
    }
}
