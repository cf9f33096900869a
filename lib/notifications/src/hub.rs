//! The notification hub.
//!
//! Owns at most one push connection per session and the notification feed.
//! A single tokio task per connection reads the transport stream, applies
//! feed mutations under the feed lock, and reconnects with backoff when the
//! stream drops. Feed operations called by the host take the same lock.

use crate::backoff::ReconnectConfig;
use crate::error::TransportError;
use crate::feed::{DEFAULT_MAX_ENTRIES, Feed};
use crate::notification::{Notification, NotificationId, PushEvent, PushSignal};
use crate::transport::PushTransport;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use portal_core::{Clock, ConnectionId, SessionId, SystemClock};
use portal_platform_access::AccessToken;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

/// Notification hub settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Push endpoint. When unset the host supplies its own transport.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_entries: default_max_entries(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// The hub's view of the session that owns the connection.
///
/// Implemented by the session manager; the hub holds it only while a
/// connection is alive.
#[async_trait]
pub trait SessionLink: Send + Sync {
    /// The current token, or `None` if it is missing or expired.
    fn current_token(&self) -> Option<AccessToken>;

    /// The token expired or was refused; end the session.
    async fn session_expired(&self);

    /// The server asked for the user record to be re-fetched.
    async fn refresh_requested(&self);
}

struct ConnectionHandle {
    id: ConnectionId,
    session_id: SessionId,
    task: JoinHandle<()>,
}

struct HubInner {
    transport: Arc<dyn PushTransport>,
    reconnect: ReconnectConfig,
    clock: Arc<dyn Clock>,
    feed: Mutex<Feed>,
    connection: Mutex<Option<ConnectionHandle>>,
}

impl HubInner {
    fn feed(&self) -> MutexGuard<'_, Feed> {
        self.feed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connection(&self) -> MutexGuard<'_, Option<ConnectionHandle>> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, event: PushEvent) -> Option<NotificationId> {
        let mut feed = self.feed();
        self.record_into(&mut feed, event)
    }

    /// Records an event read by connection `id`, unless that connection has
    /// been closed or replaced. Holds the connection lock across the feed
    /// write, so a concurrent `reset` either sees the entry and clears it or
    /// closes the connection first.
    fn record_from(&self, id: ConnectionId, event: PushEvent) -> Option<NotificationId> {
        let connection = self.connection();
        if connection.as_ref().map(|h| h.id) != Some(id) {
            debug!(connection = %id, "dropping notification from a closed connection");
            return None;
        }
        let mut feed = self.feed();
        let recorded = self.record_into(&mut feed, event);
        drop(feed);
        drop(connection);
        recorded
    }

    fn record_into(&self, feed: &mut Feed, event: PushEvent) -> Option<NotificationId> {
        let now: DateTime<Utc> = self.clock.now();
        let kind = event.kind.clone();
        let id = feed.push(event, now);
        match id {
            Some(id) => debug!(%id, %kind, "notification recorded"),
            None => debug!(%kind, "duplicate notification dropped"),
        }
        id
    }
}

/// Real-time notification hub. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
}

impl std::fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationHub")
            .field("connection_id", &self.connection_id())
            .field("entries", &self.inner.feed().len())
            .finish_non_exhaustive()
    }
}

impl NotificationHub {
    #[must_use]
    pub fn new(
        transport: Arc<dyn PushTransport>,
        config: &NotificationsConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(HubInner {
                transport,
                reconnect: config.reconnect.clone(),
                clock,
                feed: Mutex::new(Feed::new(config.max_entries)),
                connection: Mutex::new(None),
            }),
        }
    }

    /// A hub with default settings and the system clock.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn PushTransport>) -> Self {
        Self::new(
            transport,
            &NotificationsConfig::default(),
            Arc::new(SystemClock),
        )
    }

    /// Opens the push connection for `session_id`, replacing any existing
    /// one. Must be called from within a tokio runtime.
    #[instrument(skip_all, fields(session = %session_id))]
    pub fn connect(&self, session_id: SessionId, link: Arc<dyn SessionLink>) -> ConnectionId {
        let id = ConnectionId::new();
        let mut slot = self.inner.connection();
        if let Some(previous) = slot.take() {
            previous.task.abort();
            debug!(connection = %previous.id, "replaced push connection");
        }

        let task = tokio::spawn(run_connection(
            Arc::downgrade(&self.inner),
            Arc::clone(&self.inner.transport),
            self.inner.reconnect.clone(),
            link,
            id,
        ));
        *slot = Some(ConnectionHandle {
            id,
            session_id,
            task,
        });
        info!(connection = %id, "push connection opened");
        id
    }

    /// Closes the push connection. Returns whether one was open.
    pub fn disconnect(&self) -> bool {
        let Some(handle) = self.inner.connection().take() else {
            return false;
        };
        handle.task.abort();
        info!(connection = %handle.id, session = %handle.session_id, "push connection closed");
        true
    }

    /// Closes the connection and empties the feed.
    pub fn reset(&self) {
        self.disconnect();
        self.clear();
    }

    /// True while a connection task is alive (connected or reconnecting).
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner
            .connection()
            .as_ref()
            .is_some_and(|h| !h.task.is_finished())
    }

    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.inner.connection().as_ref().map(|h| h.id)
    }

    /// Session that owns the current connection.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.inner.connection().as_ref().map(|h| h.session_id)
    }

    /// Adds an event to the feed as unread. Returns `None` for duplicates.
    pub fn on_event(&self, event: PushEvent) -> Option<NotificationId> {
        self.inner.record(event)
    }

    /// Marks one entry read. Unknown ids are ignored.
    pub fn mark_read(&self, id: NotificationId) -> bool {
        self.inner.feed().mark_read(id)
    }

    pub fn mark_all_read(&self) -> usize {
        self.inner.feed().mark_all_read()
    }

    /// Empties the feed. The connection stays open.
    pub fn clear(&self) {
        self.inner.feed().clear();
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.inner.feed().unread_count()
    }

    /// Entries, most recent first.
    #[must_use]
    pub fn feed(&self) -> Vec<Notification> {
        self.inner.feed().snapshot()
    }
}

enum StreamEnd {
    Dropped { reason: String },
    HubGone,
}

async fn run_connection(
    hub: Weak<HubInner>,
    transport: Arc<dyn PushTransport>,
    reconnect: ReconnectConfig,
    link: Arc<dyn SessionLink>,
    connection_id: ConnectionId,
) {
    let mut attempt: u32 = 0;
    loop {
        let Some(token) = link.current_token() else {
            info!(connection = %connection_id, "token no longer valid, ending session");
            notify_expired(link);
            return;
        };

        let reason = match transport.connect(&token).await {
            Ok(mut stream) => {
                match read_stream(&hub, &link, connection_id, &mut stream, &mut attempt).await {
                    StreamEnd::HubGone => return,
                    StreamEnd::Dropped { reason } => reason,
                }
            }
            Err(report) => {
                if *report.current_context() == TransportError::Unauthorized {
                    info!(connection = %connection_id, "push endpoint refused token, ending session");
                    notify_expired(link);
                    return;
                }
                report.current_context().to_string()
            }
        };

        if attempt >= reconnect.max_attempts {
            warn!(
                connection = %connection_id,
                attempts = attempt,
                %reason,
                "giving up on push connection"
            );
            return;
        }
        let delay = reconnect.delay_for_attempt(attempt);
        attempt += 1;
        warn!(
            connection = %connection_id,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            %reason,
            "push connection dropped, reconnecting"
        );
        tokio::time::sleep(delay).await;
    }
}

async fn read_stream(
    hub: &Weak<HubInner>,
    link: &Arc<dyn SessionLink>,
    connection_id: ConnectionId,
    stream: &mut crate::transport::PushStream,
    attempt: &mut u32,
) -> StreamEnd {
    while let Some(signal) = stream.next().await {
        match signal {
            PushSignal::Connected => {
                *attempt = 0;
                debug!("push channel connected");
            }
            PushSignal::Notification(event) => {
                let Some(inner) = hub.upgrade() else {
                    return StreamEnd::HubGone;
                };
                if event.kind.is_session_refresh() {
                    info!("server requested session refresh");
                    let link = Arc::clone(link);
                    tokio::spawn(async move { link.refresh_requested().await });
                } else {
                    inner.record_from(connection_id, event);
                }
            }
            PushSignal::Disconnected { reason } => return StreamEnd::Dropped { reason },
        }
    }
    StreamEnd::Dropped {
        reason: "stream ended".to_string(),
    }
}

// Runs outside the connection task, which the expiry path aborts.
fn notify_expired(link: Arc<dyn SessionLink>) {
    tokio::spawn(async move { link.session_expired().await });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{NotificationKind, SESSION_REFRESH_KIND};
    use crate::transport::{ChannelTransport, PushStream};
    use portal_core::ManualClock;
    use rootcause::prelude::Report;
    use std::task::Poll;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeLink {
        token_valid: AtomicBool,
        expired: AtomicUsize,
        refreshes: AtomicUsize,
    }

    impl FakeLink {
        fn valid() -> Arc<Self> {
            let link = Self::default();
            link.token_valid.store(true, Ordering::SeqCst);
            Arc::new(link)
        }
    }

    #[async_trait]
    impl SessionLink for FakeLink {
        fn current_token(&self) -> Option<AccessToken> {
            self.token_valid
                .load(Ordering::SeqCst)
                .then(|| AccessToken::new("live-token"))
        }

        async fn session_expired(&self) {
            self.expired.fetch_add(1, Ordering::SeqCst);
        }

        async fn refresh_requested(&self) {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fast_config() -> NotificationsConfig {
        NotificationsConfig {
            reconnect: ReconnectConfig::default()
                .with_base_delay(Duration::from_millis(1))
                .with_max_delay(Duration::from_millis(5))
                .with_max_attempts(3),
            ..NotificationsConfig::default()
        }
    }

    fn hub(transport: &ChannelTransport) -> NotificationHub {
        NotificationHub::new(
            Arc::new(transport.clone()),
            &fast_config(),
            Arc::new(ManualClock::new(Utc::now())),
        )
    }

    async fn eventually(mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    /// Hands out a stream whose first poll blocks its worker thread before
    /// yielding one notification.
    struct StallingTransport {
        polled: Arc<AtomicBool>,
    }

    #[async_trait]
    impl PushTransport for StallingTransport {
        async fn connect(&self, _: &AccessToken) -> Result<PushStream, Report<TransportError>> {
            let polled = Arc::clone(&self.polled);
            let mut pending = Some(PushEvent::new(NotificationKind::Info, "for the old session"));
            Ok(futures::stream::poll_fn(move |_| match pending.take() {
                Some(event) => {
                    polled.store(true, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(300));
                    Poll::Ready(Some(PushSignal::Notification(event)))
                }
                None => Poll::Pending,
            })
            .boxed())
        }
    }

    #[test]
    fn config_defaults() {
        let config: NotificationsConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(config, NotificationsConfig::default());
        assert_eq!(config.max_entries, 200);
    }

    #[test]
    fn feed_operations_without_connection() {
        let hub = hub(&ChannelTransport::new());
        let first = hub
            .on_event(PushEvent::new(NotificationKind::Info, "a"))
            .expect("recorded");
        hub.on_event(PushEvent::new(NotificationKind::Warning, "b"));

        assert_eq!(hub.unread_count(), 2);
        assert_eq!(hub.feed()[0].message, "b");
        assert!(hub.mark_read(first));
        assert!(!hub.mark_read(first));
        assert_eq!(hub.unread_count(), 1);
        assert_eq!(hub.mark_all_read(), 1);
        hub.clear();
        assert!(hub.feed().is_empty());
        assert!(!hub.is_connected());
    }

    #[tokio::test]
    async fn pushed_events_land_in_feed() {
        let transport = ChannelTransport::new();
        let hub = hub(&transport);
        let link = FakeLink::valid();
        hub.connect(SessionId::new(), link);

        eventually(|| transport.is_open()).await;
        transport.publish_event(PushEvent::new("job_posted", "New job").with_id(4));
        transport.publish_event(PushEvent::new("job_posted", "New job").with_id(4));
        eventually(|| hub.unread_count() == 1).await;

        assert_eq!(hub.feed()[0].id, NotificationId::new(4));
        assert_eq!(transport.tokens_seen(), vec![AccessToken::new("live-token")]);
        assert!(hub.is_connected());
    }

    #[tokio::test]
    async fn clear_keeps_connection_open() {
        let transport = ChannelTransport::new();
        let hub = hub(&transport);
        hub.connect(SessionId::new(), FakeLink::valid());
        eventually(|| transport.is_open()).await;

        transport.publish_event(PushEvent::new(NotificationKind::Info, "x"));
        eventually(|| hub.unread_count() == 1).await;
        hub.clear();

        assert!(hub.is_connected());
        transport.publish_event(PushEvent::new(NotificationKind::Info, "y"));
        eventually(|| hub.unread_count() == 1).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn event_read_during_reset_does_not_reach_the_feed() {
        let polled = Arc::new(AtomicBool::new(false));
        let hub = NotificationHub::new(
            Arc::new(StallingTransport {
                polled: Arc::clone(&polled),
            }),
            &fast_config(),
            Arc::new(ManualClock::new(Utc::now())),
        );
        hub.connect(SessionId::new(), FakeLink::valid());

        eventually(|| polled.load(Ordering::SeqCst)).await;
        hub.reset();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(hub.feed().is_empty());
        assert_eq!(hub.unread_count(), 0);
        assert!(!hub.is_connected());
    }

    #[tokio::test]
    async fn reconnects_after_drop() {
        let transport = ChannelTransport::new();
        let hub = hub(&transport);
        hub.connect(SessionId::new(), FakeLink::valid());
        eventually(|| transport.connect_count() == 1).await;

        transport.drop_connection("network reset");
        eventually(|| transport.connect_count() == 2 && transport.is_open()).await;

        transport.publish_event(PushEvent::new(NotificationKind::Info, "after reconnect"));
        eventually(|| hub.unread_count() == 1).await;
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let transport = ChannelTransport::new();
        for _ in 0..10 {
            transport.fail_next(TransportError::ConnectFailed {
                reason: "refused".to_string(),
            });
        }
        let hub = hub(&transport);
        hub.connect(SessionId::new(), FakeLink::valid());

        eventually(|| !hub.is_connected()).await;
        // Initial attempt plus three retries.
        assert_eq!(transport.connect_count(), 4);
    }

    #[tokio::test]
    async fn expired_token_ends_session_instead_of_reconnecting() {
        let transport = ChannelTransport::new();
        let hub = hub(&transport);
        let link = FakeLink::valid();
        hub.connect(SessionId::new(), link.clone());
        eventually(|| transport.is_open()).await;

        link.token_valid.store(false, Ordering::SeqCst);
        transport.drop_connection("idle timeout");

        eventually(|| link.expired.load(Ordering::SeqCst) == 1).await;
        assert_eq!(transport.connect_count(), 1);
    }

    #[tokio::test]
    async fn refused_token_ends_session() {
        let transport = ChannelTransport::new();
        transport.fail_next(TransportError::Unauthorized);
        let hub = hub(&transport);
        let link = FakeLink::valid();
        hub.connect(SessionId::new(), link.clone());

        eventually(|| link.expired.load(Ordering::SeqCst) == 1).await;
        assert_eq!(transport.connect_count(), 1);
    }

    #[tokio::test]
    async fn session_refresh_event_is_forwarded_not_recorded() {
        let transport = ChannelTransport::new();
        let hub = hub(&transport);
        let link = FakeLink::valid();
        hub.connect(SessionId::new(), link.clone());
        eventually(|| transport.is_open()).await;

        transport.publish_event(PushEvent::new(SESSION_REFRESH_KIND, "role changed"));
        eventually(|| link.refreshes.load(Ordering::SeqCst) == 1).await;
        assert!(hub.feed().is_empty());
    }

    #[tokio::test]
    async fn reset_closes_connection_and_empties_feed() {
        let transport = ChannelTransport::new();
        let hub = hub(&transport);
        let first = hub.connect(SessionId::new(), FakeLink::valid());
        eventually(|| transport.is_open()).await;
        transport.publish_event(PushEvent::new(NotificationKind::Info, "x"));
        eventually(|| hub.unread_count() == 1).await;

        hub.reset();

        assert!(!hub.is_connected());
        assert_eq!(hub.connection_id(), None);
        assert!(hub.feed().is_empty());
        eventually(|| !transport.is_open()).await;

        let second = hub.connect(SessionId::new(), FakeLink::valid());
        assert_ne!(first, second);
    }
}
