//! The session manager.
//!
//! A single-writer state machine over [`AuthState`]. Every transition runs
//! under one async mutex that is never held across a remote call. Each
//! operation takes an epoch ticket when it starts; when its remote call
//! returns, the result is applied only if no other transition bumped the
//! epoch in the meantime. That is how a logout during an in-flight login
//! wins, and how a second login supersedes the first.

use crate::error::{SessionError, from_identity};
use async_trait::async_trait;
use portal_core::SessionId;
use portal_identity::{
    Credentials, Grant, IdentityError, IdentityProvider, Registration, SocialHandshake,
    SocialProvider,
};
use portal_notifications::{NotificationHub, SessionLink};
use portal_platform_access::{AccessToken, AuthState, LOGIN_ROUTE, Session, TokenStore};
use rootcause::Report;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

/// Timing knobs for the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Upper bound on each identity provider call.
    pub request_timeout: Duration,
    /// Token lifetime when the provider does not state one.
    pub default_ttl: chrono::Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            default_ttl: chrono::Duration::hours(24),
        }
    }
}

/// Result of a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub session: Session,
    /// Default route for the session's role.
    pub landing: &'static str,
}

/// Result of a sign-out. Local cleanup always happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub redirect: &'static str,
    /// Whether the identity provider acknowledged the revocation.
    pub remote_logout_confirmed: bool,
}

struct Inner {
    identity: Arc<dyn IdentityProvider>,
    social: Option<Arc<dyn SocialHandshake>>,
    tokens: TokenStore,
    hub: NotificationHub,
    settings: SessionSettings,
    epoch: Mutex<u64>,
    state: watch::Sender<AuthState>,
}

/// Builder for [`SessionManager`].
pub struct SessionManagerBuilder {
    identity: Arc<dyn IdentityProvider>,
    social: Option<Arc<dyn SocialHandshake>>,
    tokens: TokenStore,
    hub: NotificationHub,
    settings: SessionSettings,
}

impl SessionManagerBuilder {
    #[must_use]
    pub fn social_handshake(mut self, handshake: Arc<dyn SocialHandshake>) -> Self {
        self.social = Some(handshake);
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Builds the manager. A persisted valid token starts it in
    /// `Authenticating` until [`SessionManager::refresh_user`] resolves the
    /// user; a persisted expired token is discarded.
    #[must_use]
    pub fn build(self) -> SessionManager {
        let initial = if self.tokens.is_valid() {
            AuthState::Authenticating
        } else {
            self.tokens.clear();
            AuthState::Unauthenticated
        };
        debug!(state = initial.label(), "session manager starting");
        let (state, _) = watch::channel(initial);
        SessionManager {
            inner: Arc::new(Inner {
                identity: self.identity,
                social: self.social,
                tokens: self.tokens,
                hub: self.hub,
                settings: self.settings,
                epoch: Mutex::new(0),
                state,
            }),
        }
    }
}

/// Owns the session lifecycle. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state().label())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    #[must_use]
    pub fn builder(
        identity: Arc<dyn IdentityProvider>,
        tokens: TokenStore,
        hub: NotificationHub,
    ) -> SessionManagerBuilder {
        SessionManagerBuilder {
            identity,
            social: None,
            tokens,
            hub,
            settings: SessionSettings::default(),
        }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// Observes state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Current session, if one is established.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.inner.state.borrow().session().cloned()
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    #[must_use]
    pub fn hub(&self) -> &NotificationHub {
        &self.inner.hub
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// `InvalidInput` before any remote call for blank fields;
    /// `InvalidCredentials`, transport errors, or `Superseded` otherwise.
    /// Any failure leaves the manager `Unauthenticated`.
    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn login(
        &self,
        credentials: Credentials,
    ) -> Result<LoginOutcome, Report<SessionError>> {
        credentials.validate().map_err(SessionError::from)?;
        let ticket = self.begin_authentication().await;
        let result = self.bounded(self.inner.identity.login(&credentials)).await;
        self.complete_authentication(ticket, result).await
    }

    /// Creates an account and signs it in.
    ///
    /// # Errors
    ///
    /// `InvalidInput` before any remote call if role-specific fields are
    /// missing or the role cannot self-register; otherwise as for
    /// [`login`](Self::login).
    #[instrument(skip_all, fields(email = %registration.email, role = %registration.role))]
    pub async fn register(
        &self,
        registration: Registration,
    ) -> Result<LoginOutcome, Report<SessionError>> {
        registration.validate().map_err(SessionError::from)?;
        let ticket = self.begin_authentication().await;
        let result = self
            .bounded(self.inner.identity.register(&registration))
            .await;
        self.complete_authentication(ticket, result).await
    }

    /// Signs in through an external OAuth provider.
    ///
    /// The handshake is user-driven and not time-bounded; the exchange with
    /// the identity provider is.
    ///
    /// # Errors
    ///
    /// `Configuration` if no handshake is installed, `SocialLoginFailed` if
    /// the handshake or exchange is refused.
    #[instrument(skip(self))]
    pub async fn social_login(
        &self,
        provider: SocialProvider,
    ) -> Result<LoginOutcome, Report<SessionError>> {
        let Some(handshake) = self.inner.social.clone() else {
            return Err(SessionError::Configuration {
                reason: "no social sign-in handshake installed".to_string(),
            }
            .into());
        };
        let ticket = self.begin_authentication().await;
        let result = match handshake.authenticate(provider).await {
            Ok(assertion) => {
                self.bounded(self.inner.identity.social_login(&assertion))
                    .await
            }
            Err(report) => Err(report),
        };
        self.complete_authentication(ticket, result).await
    }

    /// Signs out. Local cleanup is unconditional and happens before the
    /// remote revocation, whose failure is only logged.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> LogoutOutcome {
        let token = {
            let mut epoch = self.inner.epoch.lock().await;
            *epoch += 1;
            let token = self.inner.tokens.current_token();
            self.teardown();
            token
        };

        let remote_logout_confirmed = match token {
            Some(token) => match self.bounded(self.inner.identity.logout(&token)).await {
                Ok(()) => true,
                Err(report) => {
                    warn!(error = %report, "remote logout failed; local session already cleared");
                    false
                }
            },
            None => false,
        };
        info!(remote_logout_confirmed, "signed out");
        LogoutOutcome {
            redirect: LOGIN_ROUTE,
            remote_logout_confirmed,
        }
    }

    /// Re-fetches the user for the stored token and rebuilds the session.
    ///
    /// Returns `Ok(None)` when there is no valid token; the manager is then
    /// `Unauthenticated`.
    ///
    /// # Errors
    ///
    /// Any fetch failure ends the session and is returned. `Superseded` if
    /// another transition ran meanwhile.
    #[instrument(skip(self))]
    pub async fn refresh_user(&self) -> Result<Option<Session>, Report<SessionError>> {
        let (ticket, token) = {
            let mut epoch = self.inner.epoch.lock().await;
            *epoch += 1;
            let Some(token) = self.inner.tokens.valid_token() else {
                if self.state() != AuthState::Unauthenticated {
                    info!("token no longer valid, ending session");
                }
                self.teardown();
                return Ok(None);
            };
            match self.state() {
                AuthState::Authenticated(session) => {
                    self.publish(AuthState::Refreshing(session));
                }
                AuthState::Refreshing(_) => {}
                AuthState::Unauthenticated | AuthState::Authenticating => {
                    self.publish(AuthState::Authenticating);
                }
            }
            (*epoch, token)
        };

        let result = self.bounded(self.inner.identity.current_user(&token)).await;

        let epoch = self.inner.epoch.lock().await;
        if *epoch != ticket {
            debug!("discarding superseded user refresh");
            return Err(SessionError::Superseded.into());
        }
        let user = match result {
            Ok(user) => user,
            Err(report) => {
                warn!(error = %report, "user refresh failed, ending session");
                self.teardown();
                return Err(from_identity(report));
            }
        };
        let Some(record) = self.inner.tokens.record() else {
            self.teardown();
            return Ok(None);
        };

        let session = match self.state() {
            AuthState::Refreshing(previous) | AuthState::Authenticated(previous) => {
                previous.refreshed(user, &record)
            }
            AuthState::Unauthenticated | AuthState::Authenticating => Session::new(user, &record),
        };
        self.publish(AuthState::Authenticated(session.clone()));
        self.attach_push(&session);
        drop(epoch);
        Ok(Some(session))
    }

    /// Starts the password reset flow. No state change.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a blank email, otherwise the provider's error.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, email: &str) -> Result<(), Report<SessionError>> {
        if email.trim().is_empty() {
            return Err(SessionError::InvalidInput {
                reason: "email is required".to_string(),
            }
            .into());
        }
        let result = self.bounded(self.inner.identity.reset_password(email)).await;
        self.surface(result).await
    }

    /// Changes the signed-in user's password. No state change on success; a
    /// refused token ends the session.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` without a session, `SessionExpired` if the token
    /// expired or was refused, otherwise the provider's error.
    #[instrument(skip_all)]
    pub async fn update_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), Report<SessionError>> {
        if new_password.trim().is_empty() {
            return Err(SessionError::InvalidInput {
                reason: "new password is required".to_string(),
            }
            .into());
        }
        let Some(token) = self.inner.tokens.valid_token() else {
            if self.inner.tokens.current_token().is_some() {
                self.expire().await;
                return Err(SessionError::SessionExpired.into());
            }
            return Err(SessionError::NotAuthenticated.into());
        };
        let result = self
            .bounded(
                self.inner
                    .identity
                    .update_password(&token, current_password, new_password),
            )
            .await;
        self.surface(result).await
    }

    /// Runs the expiry path for a 401 received by some other collaborator.
    pub async fn report_unauthorized(&self) {
        info!("downstream call refused the session token");
        self.expire().await;
    }

    /// Ends the session if its token is no longer valid. Returns whether it
    /// did.
    pub async fn check_expiry(&self) -> bool {
        let has_token = self.inner.tokens.current_token().is_some();
        let has_session = self.state().session().is_some();
        if (has_token || has_session) && !self.inner.tokens.is_valid() {
            self.expire().await;
            true
        } else {
            false
        }
    }

    /// The expiry path: clears the token, closes the push connection, empties
    /// the feed, and publishes `Unauthenticated`. In-flight operations are
    /// superseded.
    pub async fn expire(&self) {
        let mut epoch = self.inner.epoch.lock().await;
        *epoch += 1;
        if self.state() != AuthState::Unauthenticated {
            info!("session expired");
        }
        self.teardown();
    }

    /// Expires only if `session_id` is still the current session.
    async fn expire_session(&self, session_id: SessionId) {
        let mut epoch = self.inner.epoch.lock().await;
        let current = self.state().session().map(Session::id);
        if current != Some(session_id) {
            debug!(session = %session_id, "ignoring expiry for a replaced session");
            return;
        }
        *epoch += 1;
        info!(session = %session_id, "session expired");
        self.teardown();
    }

    async fn begin_authentication(&self) -> u64 {
        let mut epoch = self.inner.epoch.lock().await;
        *epoch += 1;
        if self.inner.tokens.current_token().is_some() || self.state().session().is_some() {
            debug!("replacing existing session");
            self.inner.tokens.clear();
            self.inner.hub.reset();
        }
        self.publish(AuthState::Authenticating);
        *epoch
    }

    async fn complete_authentication(
        &self,
        ticket: u64,
        result: Result<Grant, Report<IdentityError>>,
    ) -> Result<LoginOutcome, Report<SessionError>> {
        let epoch = self.inner.epoch.lock().await;
        if *epoch != ticket {
            debug!("discarding superseded sign-in");
            return Err(SessionError::Superseded.into());
        }

        let grant = match result {
            Ok(grant) => grant,
            Err(report) => {
                info!(error = %report, "sign-in failed");
                self.teardown();
                return Err(from_identity(report));
            }
        };

        let ttl = grant
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(self.inner.settings.default_ttl);
        let record = match self.inner.tokens.set_token(grant.token, ttl) {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "identity provider issued an unusable token lifetime");
                self.teardown();
                return Err(SessionError::MalformedResponse {
                    reason: err.to_string(),
                }
                .into());
            }
        };
        if !self.inner.tokens.is_valid() {
            warn!("identity provider issued an already expired token");
            self.teardown();
            return Err(SessionError::SessionExpired.into());
        }

        let session = Session::new(grant.user, &record);
        self.publish(AuthState::Authenticated(session.clone()));
        self.attach_push(&session);
        drop(epoch);

        Ok(LoginOutcome {
            landing: session.role().home_route(),
            session,
        })
    }

    /// Maps a side-effect call's result, running the expiry path on a
    /// refused token.
    async fn surface(
        &self,
        result: Result<(), Report<IdentityError>>,
    ) -> Result<(), Report<SessionError>> {
        let Err(report) = result else {
            return Ok(());
        };
        if report.current_context().is_unauthorized() {
            self.expire().await;
        }
        Err(from_identity(report))
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, Report<IdentityError>>>,
    ) -> Result<T, Report<IdentityError>> {
        match tokio::time::timeout(self.inner.settings.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(IdentityError::Timeout.into()),
        }
    }

    /// Keeps one push connection open for `session`. Guests get none.
    /// Callers hold the epoch lock.
    fn attach_push(&self, session: &Session) {
        let hub = &self.inner.hub;
        if !session.is_authenticated() {
            if hub.disconnect() {
                debug!(session = %session.id(), "guest session, push connection closed");
            }
            return;
        }
        if hub.session_id() != Some(session.id()) || !hub.is_connected() {
            hub.connect(session.id(), self.link(session.id()));
        }
    }

    /// Clears token, connection, and feed, then publishes `Unauthenticated`.
    /// Callers hold the epoch lock.
    fn teardown(&self) {
        self.inner.tokens.clear();
        self.inner.hub.reset();
        self.publish(AuthState::Unauthenticated);
    }

    fn publish(&self, next: AuthState) {
        let previous = self.inner.state.send_replace(next);
        let current = self.inner.state.borrow();
        if previous.label() != current.label() {
            info!(from = previous.label(), to = current.label(), "auth state changed");
        }
    }

    fn link(&self, session_id: SessionId) -> Arc<dyn SessionLink> {
        Arc::new(ManagerLink {
            inner: Arc::downgrade(&self.inner),
            session_id,
        })
    }
}

/// The hub's handle back into the manager. Weak so a live connection task
/// does not keep the manager alive.
struct ManagerLink {
    inner: Weak<Inner>,
    session_id: SessionId,
}

impl ManagerLink {
    fn manager(&self) -> Option<SessionManager> {
        self.inner.upgrade().map(|inner| SessionManager { inner })
    }
}

#[async_trait]
impl SessionLink for ManagerLink {
    fn current_token(&self) -> Option<AccessToken> {
        self.inner.upgrade()?.tokens.valid_token()
    }

    async fn session_expired(&self) {
        if let Some(manager) = self.manager() {
            manager.expire_session(self.session_id).await;
        }
    }

    async fn refresh_requested(&self) {
        let Some(manager) = self.manager() else {
            return;
        };
        if manager.state().session().map(Session::id) != Some(self.session_id) {
            return;
        }
        if let Err(report) = manager.refresh_user().await {
            warn!(error = %report, "server-requested refresh failed");
        }
    }
}
