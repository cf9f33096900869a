//! Shared fakes for the session integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use portal_core::ManualClock;
use portal_identity::{
    Credentials, Grant, IdentityError, IdentityProvider, Registration, SocialAssertion,
};
use portal_notifications::{
    ChannelTransport, NotificationHub, NotificationsConfig, ReconnectConfig,
};
use portal_platform_access::{AccessToken, MemoryTokenSlot, Role, TokenStore, UserRecord};
use portal_session::{SessionManager, SessionSettings};
use rootcause::Report;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;

/// One scripted answer, optionally held until the test releases it.
struct Reply<T> {
    result: Result<T, IdentityError>,
    gate: Option<oneshot::Receiver<()>>,
}

/// Identity provider that answers from per-operation queues.
///
/// An empty queue answers with `Unavailable` so a missing script fails
/// loudly instead of hanging.
#[derive(Default)]
pub struct ScriptedIdentity {
    grants: Mutex<VecDeque<Reply<Grant>>>,
    users: Mutex<VecDeque<Reply<UserRecord>>>,
    logout_failure: Mutex<Option<IdentityError>>,
    calls: Mutex<Vec<&'static str>>,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedIdentity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a sign-in answer (login, register, or social).
    pub fn grant(&self, result: Result<Grant, IdentityError>) {
        lock(&self.grants).push_back(Reply { result, gate: None });
    }

    /// Queues a sign-in answer that waits for the returned sender.
    pub fn held_grant(&self, result: Result<Grant, IdentityError>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        lock(&self.grants).push_back(Reply {
            result,
            gate: Some(rx),
        });
        tx
    }

    /// Queues a `current_user` answer.
    pub fn user(&self, result: Result<UserRecord, IdentityError>) {
        lock(&self.users).push_back(Reply { result, gate: None });
    }

    /// Queues a `current_user` answer that waits for the returned sender.
    pub fn held_user(&self, result: Result<UserRecord, IdentityError>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        lock(&self.users).push_back(Reply {
            result,
            gate: Some(rx),
        });
        tx
    }

    pub fn fail_logout(&self, error: IdentityError) {
        *lock(&self.logout_failure) = Some(error);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: &'static str) {
        lock(&self.calls).push(call);
    }

    async fn answer<T>(queue: &Mutex<VecDeque<Reply<T>>>) -> Result<T, Report<IdentityError>> {
        let reply = lock(queue).pop_front();
        let Some(reply) = reply else {
            return Err(IdentityError::Unavailable {
                reason: "no scripted reply".to_string(),
            }
            .into());
        };
        if let Some(gate) = reply.gate {
            let _ = gate.await;
        }
        reply.result.map_err(Report::from)
    }
}

#[async_trait]
impl IdentityProvider for ScriptedIdentity {
    async fn login(&self, _: &Credentials) -> Result<Grant, Report<IdentityError>> {
        self.record("login");
        Self::answer(&self.grants).await
    }

    async fn register(&self, _: &Registration) -> Result<Grant, Report<IdentityError>> {
        self.record("register");
        Self::answer(&self.grants).await
    }

    async fn social_login(&self, _: &SocialAssertion) -> Result<Grant, Report<IdentityError>> {
        self.record("social_login");
        Self::answer(&self.grants).await
    }

    async fn current_user(&self, _: &AccessToken) -> Result<UserRecord, Report<IdentityError>> {
        self.record("current_user");
        Self::answer(&self.users).await
    }

    async fn reset_password(&self, _: &str) -> Result<(), Report<IdentityError>> {
        self.record("reset_password");
        Ok(())
    }

    async fn update_password(
        &self,
        _: &AccessToken,
        _: &str,
        _: &str,
    ) -> Result<(), Report<IdentityError>> {
        self.record("update_password");
        Ok(())
    }

    async fn logout(&self, _: &AccessToken) -> Result<(), Report<IdentityError>> {
        self.record("logout");
        match lock(&self.logout_failure).take() {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }
}

pub fn user(role: Role) -> UserRecord {
    let name = role.as_str();
    UserRecord::new(
        format!("{name}-1"),
        format!("{name}@example.test"),
        format!("{name} user"),
        role,
    )
}

pub fn grant_for(role: Role) -> Grant {
    Grant::new(format!("{}-token", role.as_str()), user(role))
}

/// A manager over scripted identity, a manual clock, and an in-process
/// push channel.
pub struct Harness {
    pub manager: SessionManager,
    pub identity: Arc<ScriptedIdentity>,
    pub transport: ChannelTransport,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new() -> Self {
        let identity = ScriptedIdentity::new();
        let transport = ChannelTransport::new();
        let clock = ManualClock::new(chrono::Utc::now());
        let tokens = TokenStore::new(Arc::new(MemoryTokenSlot::new()), Arc::new(clock.clone()));
        let notifications = NotificationsConfig {
            reconnect: ReconnectConfig::default()
                .with_base_delay(Duration::from_millis(5))
                .with_max_delay(Duration::from_millis(20)),
            ..NotificationsConfig::default()
        };
        let hub = NotificationHub::new(
            Arc::new(transport.clone()),
            &notifications,
            Arc::new(clock.clone()),
        );
        let manager = SessionManager::builder(identity.clone(), tokens, hub)
            .settings(SessionSettings {
                request_timeout: Duration::from_secs(5),
                default_ttl: chrono::Duration::hours(1),
            })
            .build();
        Self {
            manager,
            identity,
            transport,
            clock,
        }
    }

    pub async fn login_as(&self, role: Role) -> portal_session::LoginOutcome {
        self.identity.grant(Ok(grant_for(role)));
        self.manager
            .login(Credentials::new(format!("{role}@example.test"), "pw"))
            .await
            .expect("scripted login succeeds")
    }
}

/// Polls `check` until it holds or a second passes.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}
