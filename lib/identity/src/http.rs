//! HTTP identity provider backed by `reqwest`.

use crate::error::IdentityError;
use crate::provider::{IdentityProvider, SocialAssertion};
use crate::types::{Credentials, Grant, Registration};
use async_trait::async_trait;
use portal_platform_access::{AccessToken, UserRecord};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use rootcause::prelude::Report;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

fn default_request_timeout_secs() -> u64 {
    30
}

/// Where the identity provider lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the auth API, e.g. `https://api.example.com`.
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl IdentityConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Joins `path` onto the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Error body returned by the auth API on non-success statuses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Serialize)]
struct ResetRequest<'a> {
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordChange<'a> {
    current_password: &'a str,
    new_password: &'a str,
}

/// Maps a non-success response to an [`IdentityError`].
///
/// `on_unauthorized` is what a 401 means for the calling endpoint: bad
/// credentials for sign-in, a refused token elsewhere.
fn classify(status: StatusCode, body: &str, on_unauthorized: IdentityError) -> IdentityError {
    if status == StatusCode::UNAUTHORIZED {
        return on_unauthorized;
    }
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .filter(|m| !m.trim().is_empty())
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "request failed".to_string());
    IdentityError::Rejected {
        status: status.as_u16(),
        code: parsed.code,
        message,
    }
}

fn transport_error(err: &reqwest::Error) -> IdentityError {
    if err.is_timeout() {
        IdentityError::Timeout
    } else {
        IdentityError::Unavailable {
            reason: err.to_string(),
        }
    }
}

/// [`IdentityProvider`] speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: Client,
    config: IdentityConfig,
}

impl HttpIdentityProvider {
    /// Builds the provider and its HTTP client.
    pub fn new(config: IdentityConfig) -> Result<Self, Report<IdentityError>> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| IdentityError::Unavailable {
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.config.endpoint(path))
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        on_unauthorized: IdentityError,
    ) -> Result<Response, Report<IdentityError>> {
        let response = request.send().await.map_err(|e| transport_error(&e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), "identity provider rejected request");
        Err(classify(status, &body, on_unauthorized).into())
    }

    async fn read_json<T: DeserializeOwned>(
        response: Response,
    ) -> Result<T, Report<IdentityError>> {
        let bytes = response.bytes().await.map_err(|e| transport_error(&e))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            IdentityError::MalformedResponse {
                reason: e.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    #[instrument(skip_all, fields(email = %credentials.email))]
    async fn login(&self, credentials: &Credentials) -> Result<Grant, Report<IdentityError>> {
        let request = self.request(Method::POST, "auth/login").json(credentials);
        let response = self
            .execute(request, IdentityError::InvalidCredentials)
            .await?;
        Self::read_json(response).await
    }

    #[instrument(skip_all, fields(email = %registration.email, role = %registration.role))]
    async fn register(&self, registration: &Registration) -> Result<Grant, Report<IdentityError>> {
        let request = self.request(Method::POST, "auth/register").json(registration);
        let response = self.execute(request, IdentityError::Unauthorized).await?;
        Self::read_json(response).await
    }

    #[instrument(skip_all, fields(provider = %assertion.provider()))]
    async fn social_login(
        &self,
        assertion: &SocialAssertion,
    ) -> Result<Grant, Report<IdentityError>> {
        let request = self.request(Method::POST, "auth/social").json(assertion);
        let refused = IdentityError::SocialHandshakeFailed {
            provider: assertion.provider().to_string(),
            reason: "assertion refused by identity provider".to_string(),
        };
        let response = self.execute(request, refused).await?;
        Self::read_json(response).await
    }

    #[instrument(skip_all)]
    async fn current_user(&self, token: &AccessToken) -> Result<UserRecord, Report<IdentityError>> {
        let request = self
            .request(Method::GET, "auth/me")
            .bearer_auth(token.as_str());
        let response = self.execute(request, IdentityError::Unauthorized).await?;
        Self::read_json(response).await
    }

    #[instrument(skip_all)]
    async fn reset_password(&self, email: &str) -> Result<(), Report<IdentityError>> {
        let request = self
            .request(Method::POST, "auth/password/reset")
            .json(&ResetRequest { email });
        self.execute(request, IdentityError::Unauthorized).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn update_password(
        &self,
        token: &AccessToken,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), Report<IdentityError>> {
        let request = self
            .request(Method::PUT, "auth/password")
            .bearer_auth(token.as_str())
            .json(&PasswordChange {
                current_password,
                new_password,
            });
        self.execute(request, IdentityError::Unauthorized).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn logout(&self, token: &AccessToken) -> Result<(), Report<IdentityError>> {
        let request = self
            .request(Method::POST, "auth/logout")
            .bearer_auth(token.as_str());
        self.execute(request, IdentityError::Unauthorized).await?;
        Ok(())
    }
}
