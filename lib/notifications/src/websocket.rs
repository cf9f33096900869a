//! WebSocket push transport.

use crate::error::TransportError;
use crate::notification::{PushEvent, PushSignal};
use crate::transport::{PushStream, PushTransport};
use async_trait::async_trait;
use futures::{StreamExt, future, stream};
use portal_platform_access::AccessToken;
use rootcause::prelude::Report;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode, header::AUTHORIZATION};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, instrument};

/// Push transport over a WebSocket carrying JSON text frames.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn connect_error(err: WsError) -> TransportError {
    match err {
        WsError::Http(response) if response.status() == StatusCode::UNAUTHORIZED => {
            TransportError::Unauthorized
        }
        WsError::Url(e) => TransportError::InvalidRequest {
            reason: e.to_string(),
        },
        other => TransportError::ConnectFailed {
            reason: other.to_string(),
        },
    }
}

/// Decodes a text frame. Frames that are not events are skipped.
fn decode_event(text: &str) -> Option<PushEvent> {
    match serde_json::from_str(text) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!(error = %e, "ignoring undecodable push frame");
            None
        }
    }
}

fn signal_from_frame(frame: Result<Message, WsError>) -> Option<PushSignal> {
    match frame {
        Ok(Message::Text(text)) => decode_event(&text).map(PushSignal::Notification),
        Ok(Message::Close(close)) => Some(PushSignal::Disconnected {
            reason: close
                .map(|c| c.reason.to_string())
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| "closed by server".to_string()),
        }),
        Ok(_) => None,
        Err(e) => Some(PushSignal::Disconnected {
            reason: e.to_string(),
        }),
    }
}

#[async_trait]
impl PushTransport for WebSocketTransport {
    #[instrument(skip_all, fields(url = %self.url))]
    async fn connect(&self, token: &AccessToken) -> Result<PushStream, Report<TransportError>> {
        let mut request =
            self.url
                .as_str()
                .into_client_request()
                .map_err(|e| TransportError::InvalidRequest {
                    reason: e.to_string(),
                })?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token.as_str())).map_err(|_| {
            TransportError::InvalidRequest {
                reason: "token is not a valid header value".to_string(),
            }
        })?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (socket, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(connect_error)?;
        debug!("push socket open");

        let signals = socket.filter_map(|frame| future::ready(signal_from_frame(frame)));
        Ok(stream::once(future::ready(PushSignal::Connected))
            .chain(signals)
            .boxed())
    }
}
