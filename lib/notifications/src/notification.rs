//! Notification types: what arrives on the push channel and what the feed
//! holds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of push event that asks the session to re-fetch the user.
pub const SESSION_REFRESH_KIND: &str = "session_refresh";

/// Identifier of a feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(u64);

impl NotificationId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category of a notification.
///
/// The four presentation levels are fixed; anything else the server sends
/// is kept verbatim as a domain kind (`job_posted`, `application_received`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    Info,
    Warning,
    Error,
    Success,
    Domain(String),
}

impl NotificationKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Success => "success",
            Self::Domain(kind) => kind,
        }
    }

    /// True for the server's forced session refresh signal.
    #[must_use]
    pub fn is_session_refresh(&self) -> bool {
        matches!(self, Self::Domain(kind) if kind == SESSION_REFRESH_KIND)
    }
}

impl From<String> for NotificationKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "info" => Self::Info,
            "warning" => Self::Warning,
            "error" => Self::Error,
            "success" => Self::Success,
            _ => Self::Domain(kind),
        }
    }
}

impl From<&str> for NotificationKind {
    fn from(kind: &str) -> Self {
        Self::from(kind.to_string())
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::Domain(kind) => kind,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event as delivered by the push channel.
///
/// Wire shape: `{"type": "...", "message": "...", "payload": {...}?, "id": 7?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl PushEvent {
    #[must_use]
    pub fn new(kind: impl Into<NotificationKind>, message: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: kind.into(),
            message: message.into(),
            payload: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// An entry in the notification feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// What a push connection yields.
#[derive(Debug, Clone, PartialEq)]
pub enum PushSignal {
    /// The connection is established.
    Connected,
    /// An event arrived.
    Notification(PushEvent),
    /// The connection dropped.
    Disconnected { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_known_and_domain_values() {
        assert_eq!(NotificationKind::from("warning"), NotificationKind::Warning);
        assert_eq!(
            NotificationKind::from("job_posted"),
            NotificationKind::Domain("job_posted".to_string())
        );
        assert_eq!(String::from(NotificationKind::Success), "success");
    }

    #[test]
    fn session_refresh_is_recognized() {
        assert!(NotificationKind::from(SESSION_REFRESH_KIND).is_session_refresh());
        assert!(!NotificationKind::Info.is_session_refresh());
    }

    #[test]
    fn push_event_reads_wire_shape() {
        let event: PushEvent = serde_json::from_str(
            r#"{"type":"application_received","message":"New applicant","payload":{"jobId":"j-1"},"id":12}"#,
        )
        .expect("deserialize");
        assert_eq!(event.id, Some(12));
        assert_eq!(
            event.kind,
            NotificationKind::Domain("application_received".to_string())
        );
        assert_eq!(event.payload, Some(serde_json::json!({"jobId": "j-1"})));

        let minimal: PushEvent =
            serde_json::from_str(r#"{"type":"info","message":"hi"}"#).expect("deserialize");
        assert_eq!(minimal, PushEvent::new(NotificationKind::Info, "hi"));
    }

    #[test]
    fn notification_serializes_type_and_camel_case() {
        let now = Utc::now();
        let entry = Notification {
            id: NotificationId::new(3),
            kind: NotificationKind::Success,
            message: "Saved".to_string(),
            payload: None,
            read: false,
            created_at: now,
        };
        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(json["type"], "success");
        assert_eq!(json["id"], 3);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("payload").is_none());
    }
}
