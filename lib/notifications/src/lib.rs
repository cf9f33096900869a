//! Real-time notifications for the portal session core.
//!
//! - [`NotificationHub`]: one push connection per session plus the bounded
//!   notification feed
//! - [`PushTransport`]: how connections are opened; [`WebSocketTransport`]
//!   for production, [`ChannelTransport`] for in-process delivery
//! - [`SessionLink`]: how the hub reports token expiry and server-requested
//!   refreshes back to the session owner

pub mod backoff;
pub mod error;
pub mod feed;
pub mod hub;
pub mod notification;
pub mod transport;
pub mod websocket;

pub use backoff::ReconnectConfig;
pub use error::TransportError;
pub use feed::{DEFAULT_MAX_ENTRIES, Feed};
pub use hub::{NotificationHub, NotificationsConfig, SessionLink};
pub use notification::{
    Notification, NotificationId, NotificationKind, PushEvent, PushSignal, SESSION_REFRESH_KIND,
};
pub use transport::{ChannelTransport, PushStream, PushTransport};
pub use websocket::WebSocketTransport;
