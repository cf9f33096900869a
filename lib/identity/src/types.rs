//! Request and response types exchanged with the identity provider.

use crate::error::ValidationError;
use portal_platform_access::{AccessToken, Role, UserRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Email/password sign-in request.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Rejects blank fields before any remote call.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("email", &self.email)?;
        require("password", &self.password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Self-service account creation request.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub role: Role,
    /// Required for companies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    /// Required for ambassadors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Required for ambassadors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl Registration {
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        display_name: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            display_name: display_name.into(),
            role,
            company_name: None,
            category: None,
            bio: None,
        }
    }

    #[must_use]
    pub fn with_company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }

    /// Checks the common fields and the role-specific ones.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.role.is_self_registrable() {
            return Err(ValidationError::RoleNotRegistrable {
                role: self.role.to_string(),
            });
        }
        require("email", &self.email)?;
        require("password", &self.password)?;
        require("display name", &self.display_name)?;

        match self.role {
            Role::Company => require_some("company name", self.company_name.as_deref()),
            Role::Ambassador => {
                require_some("category", self.category.as_deref())?;
                require_some("bio", self.bio.as_deref())
            }
            Role::Admin | Role::Guest => Ok(()),
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField { field })
    } else {
        Ok(())
    }
}

fn require_some(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    require(field, value.unwrap_or_default())
}

/// External OAuth providers accepted for social sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialProvider {
    Google,
    LinkedIn,
    GitHub,
}

impl SocialProvider {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::LinkedIn => "linkedin",
            Self::GitHub => "github",
        }
    }
}

impl fmt::Display for SocialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful sign-in: the bearer token plus the canonical user record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub token: AccessToken,
    pub user: UserRecord,
    /// Token lifetime in seconds, when the provider states one.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl Grant {
    #[must_use]
    pub fn new(token: impl Into<AccessToken>, user: UserRecord) -> Self {
        Self {
            token: token.into(),
            user,
            expires_in: None,
        }
    }

    #[must_use]
    pub fn expiring_in(mut self, seconds: u64) -> Self {
        self.expires_in = Some(seconds);
        self
    }
}
