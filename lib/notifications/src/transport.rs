//! Push transport abstraction.

use crate::error::TransportError;
use crate::notification::{PushEvent, PushSignal};
use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc;
use futures::stream::BoxStream;
use portal_platform_access::AccessToken;
use rootcause::prelude::Report;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Signals from one open connection. The stream ending means the
/// connection dropped.
pub type PushStream = BoxStream<'static, PushSignal>;

/// Opens authenticated push connections.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Opens a connection authenticated with `token`.
    ///
    /// # Errors
    ///
    /// `Unauthorized` if the endpoint refuses the token, `ConnectFailed` if
    /// it cannot be reached.
    async fn connect(&self, token: &AccessToken) -> Result<PushStream, Report<TransportError>>;
}

#[derive(Debug, Default)]
struct ChannelState {
    current: Option<mpsc::UnboundedSender<PushSignal>>,
    tokens: Vec<AccessToken>,
    queued_failures: VecDeque<TransportError>,
}

/// In-process transport for hosts that deliver push events themselves.
///
/// Each `connect` replaces the previous connection; [`publish`] feeds the
/// current one.
///
/// [`publish`]: ChannelTransport::publish
#[derive(Debug, Clone, Default)]
pub struct ChannelTransport {
    state: Arc<Mutex<ChannelState>>,
}

impl ChannelTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends `signal` to the open connection. Returns false if none is open.
    pub fn publish(&self, signal: PushSignal) -> bool {
        self.state()
            .current
            .as_ref()
            .is_some_and(|tx| tx.unbounded_send(signal).is_ok())
    }

    /// Sends a notification to the open connection.
    pub fn publish_event(&self, event: PushEvent) -> bool {
        self.publish(PushSignal::Notification(event))
    }

    /// Drops the open connection as a network failure would.
    pub fn drop_connection(&self, reason: &str) {
        let mut state = self.state();
        if let Some(tx) = state.current.take() {
            let _ = tx.unbounded_send(PushSignal::Disconnected {
                reason: reason.to_string(),
            });
        }
    }

    /// Makes the next `connect` fail with `error`.
    pub fn fail_next(&self, error: TransportError) {
        self.state().queued_failures.push_back(error);
    }

    /// True if a connection is open and its reader is still alive.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state()
            .current
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Number of connection attempts, failed ones included.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.state().tokens.len()
    }

    /// Tokens presented on each connection attempt, oldest first.
    #[must_use]
    pub fn tokens_seen(&self) -> Vec<AccessToken> {
        self.state().tokens.clone()
    }
}

#[async_trait]
impl PushTransport for ChannelTransport {
    async fn connect(&self, token: &AccessToken) -> Result<PushStream, Report<TransportError>> {
        let mut state = self.state();
        state.tokens.push(token.clone());
        if let Some(error) = state.queued_failures.pop_front() {
            return Err(error.into());
        }

        let (tx, rx) = mpsc::unbounded();
        let _ = tx.unbounded_send(PushSignal::Connected);
        state.current = Some(tx);
        Ok(rx.boxed())
    }
}
