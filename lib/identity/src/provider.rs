//! Identity provider traits.
//!
//! The session manager only talks to these traits. `HttpIdentityProvider`
//! is the production implementation; tests supply in-memory fakes.

use crate::error::IdentityError;
use crate::types::{Credentials, Grant, Registration, SocialProvider};
use async_trait::async_trait;
use portal_platform_access::{AccessToken, UserRecord};
use rootcause::prelude::Report;
use serde::Serialize;
use std::fmt;

/// Proof of identity obtained from an external OAuth provider.
#[derive(Clone, Serialize)]
pub struct SocialAssertion {
    provider: SocialProvider,
    credential: String,
}

impl SocialAssertion {
    #[must_use]
    pub fn new(provider: SocialProvider, credential: impl Into<String>) -> Self {
        Self {
            provider,
            credential: credential.into(),
        }
    }

    #[must_use]
    pub fn provider(&self) -> SocialProvider {
        self.provider
    }

    /// The opaque credential issued by the provider (an ID token or code).
    #[must_use]
    pub fn credential(&self) -> &str {
        &self.credential
    }
}

impl fmt::Debug for SocialAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocialAssertion")
            .field("provider", &self.provider)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// Obtains an assertion from an external provider, typically by driving a
/// browser popup or device flow.
#[async_trait]
pub trait SocialHandshake: Send + Sync {
    /// Runs the provider handshake.
    ///
    /// # Errors
    ///
    /// Returns `SocialHandshakeFailed` if the user cancelled or the provider
    /// refused.
    async fn authenticate(
        &self,
        provider: SocialProvider,
    ) -> Result<SocialAssertion, Report<IdentityError>>;
}

/// Remote authority for accounts and credentials.
///
/// Any call may fail with [`IdentityError::Unauthorized`] when the bearer
/// token is refused; callers treat that as the end of the session.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchanges email and password for a grant.
    async fn login(&self, credentials: &Credentials) -> Result<Grant, Report<IdentityError>>;

    /// Creates an account and signs it in.
    async fn register(&self, registration: &Registration) -> Result<Grant, Report<IdentityError>>;

    /// Exchanges a social assertion for a grant.
    async fn social_login(
        &self,
        assertion: &SocialAssertion,
    ) -> Result<Grant, Report<IdentityError>>;

    /// Fetches the canonical record of the token's owner.
    async fn current_user(&self, token: &AccessToken) -> Result<UserRecord, Report<IdentityError>>;

    /// Starts the password reset flow for `email`.
    async fn reset_password(&self, email: &str) -> Result<(), Report<IdentityError>>;

    /// Changes the signed-in user's password.
    async fn update_password(
        &self,
        token: &AccessToken,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), Report<IdentityError>>;

    /// Revokes the token on the provider side.
    async fn logout(&self, token: &AccessToken) -> Result<(), Report<IdentityError>>;
}
