//! The canonical user record as returned by the identity provider.

use crate::role::Role;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity-provider assigned user identifier.
///
/// Opaque to this crate; compared but never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user as known to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Provider-assigned identifier.
    pub id: UserId,
    /// Primary email address.
    pub email: String,
    /// Human-readable name shown in the UI.
    pub display_name: String,
    /// Coarse role; drives permissions and landing route.
    pub role: Role,
    /// Optional avatar location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl UserRecord {
    /// Creates a record without an avatar.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        display_name: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: UserId::new(id),
            email: email.into(),
            display_name: display_name.into(),
            role,
            avatar_url: None,
        }
    }
}
