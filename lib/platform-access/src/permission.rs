//! Permission tags and the static role catalog.
//!
//! The vocabulary is closed: a tag that is not a [`Permission`] variant
//! cannot be constructed, so unknown tags are rejected where they enter the
//! system rather than silently failing every check later on.
//!
//! The catalog is compiled in. Changing what a role may do is a code change,
//! never a runtime mutation.

use crate::error::UnknownPermission;
use crate::role::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// An atomic capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageUsers,
    ManageCompanies,
    ManageAmbassadors,
    ManageJobs,
    ManageTasks,
    ManageSettings,
    PostJobs,
    ManageOwnJobs,
    ViewApplications,
    ManageApplications,
    ManageCompanyProfile,
    ViewJobs,
    ApplyToJobs,
    ViewOwnApplications,
    CompleteTasks,
    ViewEarnings,
    ManageAmbassadorProfile,
    ViewAnalytics,
}

impl Permission {
    /// Every tag in the vocabulary.
    pub const ALL: [Permission; 18] = [
        Permission::ManageUsers,
        Permission::ManageCompanies,
        Permission::ManageAmbassadors,
        Permission::ManageJobs,
        Permission::ManageTasks,
        Permission::ManageSettings,
        Permission::PostJobs,
        Permission::ManageOwnJobs,
        Permission::ViewApplications,
        Permission::ManageApplications,
        Permission::ManageCompanyProfile,
        Permission::ViewJobs,
        Permission::ApplyToJobs,
        Permission::ViewOwnApplications,
        Permission::CompleteTasks,
        Permission::ViewEarnings,
        Permission::ManageAmbassadorProfile,
        Permission::ViewAnalytics,
    ];

    /// Returns the wire tag.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManageUsers => "manage_users",
            Self::ManageCompanies => "manage_companies",
            Self::ManageAmbassadors => "manage_ambassadors",
            Self::ManageJobs => "manage_jobs",
            Self::ManageTasks => "manage_tasks",
            Self::ManageSettings => "manage_settings",
            Self::PostJobs => "post_jobs",
            Self::ManageOwnJobs => "manage_own_jobs",
            Self::ViewApplications => "view_applications",
            Self::ManageApplications => "manage_applications",
            Self::ManageCompanyProfile => "manage_company_profile",
            Self::ViewJobs => "view_jobs",
            Self::ApplyToJobs => "apply_to_jobs",
            Self::ViewOwnApplications => "view_own_applications",
            Self::CompleteTasks => "complete_tasks",
            Self::ViewEarnings => "view_earnings",
            Self::ManageAmbassadorProfile => "manage_ambassador_profile",
            Self::ViewAnalytics => "view_analytics",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermission { tag: s.to_string() })
    }
}

/// An ordered, immutable set of permission tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// The empty set.
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    /// Returns true if the set contains `permission`.
    #[must_use]
    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the tags in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

const ADMIN_GRANTS: &[Permission] = &[
    Permission::ManageUsers,
    Permission::ManageCompanies,
    Permission::ManageAmbassadors,
    Permission::ManageJobs,
    Permission::ViewApplications,
    Permission::ManageTasks,
    Permission::ViewAnalytics,
    Permission::ManageSettings,
];

const COMPANY_GRANTS: &[Permission] = &[
    Permission::PostJobs,
    Permission::ManageOwnJobs,
    Permission::ViewApplications,
    Permission::ManageApplications,
    Permission::ViewAnalytics,
    Permission::ManageCompanyProfile,
];

const AMBASSADOR_GRANTS: &[Permission] = &[
    Permission::ViewJobs,
    Permission::ApplyToJobs,
    Permission::ViewOwnApplications,
    Permission::CompleteTasks,
    Permission::ViewEarnings,
    Permission::ManageAmbassadorProfile,
];

/// Static role → permission lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionCatalog;

impl PermissionCatalog {
    /// Returns the raw grant list for a role.
    #[must_use]
    pub fn grants(role: Role) -> &'static [Permission] {
        match role {
            Role::Admin => ADMIN_GRANTS,
            Role::Company => COMPANY_GRANTS,
            Role::Ambassador => AMBASSADOR_GRANTS,
            Role::Guest => &[],
        }
    }

    /// Returns the permission set for a role.
    #[must_use]
    pub fn permissions_for(role: Role) -> PermissionSet {
        Self::grants(role).iter().copied().collect()
    }

    /// Returns the permission set for a role name; unknown names get nothing.
    #[must_use]
    pub fn permissions_for_name(name: &str) -> PermissionSet {
        name.parse::<Role>()
            .map(Self::permissions_for)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tags_round_trip_through_from_str() {
        for permission in Permission::ALL {
            assert_eq!(
                permission.as_str().parse::<Permission>().expect("parse"),
                permission
            );
        }
    }

    #[test]
    fn unknown_tag_is_a_construction_error() {
        let err = "delete_everything".parse::<Permission>().unwrap_err();
        assert_eq!(err.tag, "delete_everything");
    }

    #[test]
    fn serde_rejects_unknown_tags() {
        let parsed: Result<Permission, _> = serde_json::from_str("\"launch_rockets\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn guest_has_no_permissions() {
        assert!(PermissionCatalog::permissions_for(Role::Guest).is_empty());
    }

    #[test]
    fn company_can_post_but_not_apply() {
        let company = PermissionCatalog::permissions_for(Role::Company);
        assert!(company.contains(Permission::PostJobs));
        assert!(!company.contains(Permission::ApplyToJobs));
    }

    #[test]
    fn ambassador_can_apply_but_not_post() {
        let ambassador = PermissionCatalog::permissions_for(Role::Ambassador);
        assert!(ambassador.contains(Permission::ApplyToJobs));
        assert!(!ambassador.contains(Permission::PostJobs));
    }

    #[test]
    fn admin_manages_users() {
        let admin = PermissionCatalog::permissions_for(Role::Admin);
        assert!(admin.contains(Permission::ManageUsers));
        assert_eq!(admin.len(), ADMIN_GRANTS.len());
    }

    #[test]
    fn unknown_role_name_fails_closed() {
        assert!(PermissionCatalog::permissions_for_name("root").is_empty());
        assert!(PermissionCatalog::permissions_for_name("").is_empty());
        assert_eq!(
            PermissionCatalog::permissions_for_name("company"),
            PermissionCatalog::permissions_for(Role::Company)
        );
    }

    #[test]
    fn permission_set_serializes_as_ordered_list() {
        let set: PermissionSet = [Permission::ViewJobs, Permission::ManageUsers]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&set).expect("serialize");
        assert_eq!(json, "[\"manage_users\",\"view_jobs\"]");
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn catalog_lookup_is_stable(role in any_role(), repeats in 1usize..8) {
            let first = PermissionCatalog::permissions_for(role);
            for _ in 0..repeats {
                prop_assert_eq!(&PermissionCatalog::permissions_for(role), &first);
            }
        }

        #[test]
        fn arbitrary_role_names_never_panic(name in "\\PC{0,24}") {
            let set = PermissionCatalog::permissions_for_name(&name);
            if name.parse::<Role>().is_err() {
                prop_assert!(set.is_empty());
            }
        }
    }
}
