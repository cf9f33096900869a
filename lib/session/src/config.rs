//! Session core configuration.
//!
//! Loaded via the `config` crate from an optional file overlaid with
//! environment variables such as `PORTAL__IDENTITY__BASE_URL` or
//! `PORTAL__NOTIFICATIONS__RECONNECT__MAX_ATTEMPTS`.

use crate::error::SessionError;
use crate::manager::{SessionManager, SessionSettings};
use portal_core::{Clock, SystemClock};
use portal_identity::{HttpIdentityProvider, IdentityConfig};
use portal_notifications::{
    ChannelTransport, NotificationHub, NotificationsConfig, PushTransport, WebSocketTransport,
};
use portal_platform_access::{FileTokenSlot, MemoryTokenSlot, TokenSlot, TokenStore};
use rootcause::Report;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Everything the session core needs, composed from the library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// Identity provider endpoint.
    pub identity: IdentityConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Token lifetime and persistence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Token lifetime when the identity provider does not state one.
    #[serde(default = "default_ttl_minutes")]
    pub default_ttl_minutes: i64,

    /// File holding the persisted token. Tokens live in memory only when
    /// unset.
    #[serde(default)]
    pub token_path: Option<PathBuf>,
}

fn default_ttl_minutes() -> i64 {
    24 * 60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_ttl_minutes: default_ttl_minutes(),
            token_path: None,
        }
    }
}

impl CoreConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(None)
    }

    /// Loads configuration from `file` (format chosen by extension), with
    /// environment variables taking precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or required configuration
    /// is missing or invalid.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix("PORTAL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Settings for the session manager.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the token lifetime is not positive or too
    /// large to represent, or the request timeout is zero.
    pub fn settings(&self) -> Result<SessionSettings, Report<SessionError>> {
        let minutes = self.session.default_ttl_minutes;
        let default_ttl = chrono::Duration::try_minutes(minutes)
            .filter(|ttl| *ttl > chrono::Duration::zero())
            .ok_or_else(|| SessionError::Configuration {
                reason: format!("session.default_ttl_minutes {minutes} is out of range"),
            })?;
        let request_timeout = self.identity.request_timeout();
        if request_timeout == Duration::ZERO {
            return Err(SessionError::Configuration {
                reason: "identity.request_timeout_secs must be positive".to_string(),
            }
            .into());
        }
        Ok(SessionSettings {
            request_timeout,
            default_ttl,
        })
    }

    /// Builds a session manager wired to the HTTP identity provider, the
    /// configured token slot, and a WebSocket push transport (or an
    /// in-process channel when no push URL is set).
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if a setting is out of range or the HTTP
    /// client cannot be created.
    pub fn build(&self) -> Result<SessionManager, Report<SessionError>> {
        let settings = self.settings()?;

        let identity = HttpIdentityProvider::new(self.identity.clone()).map_err(|report| {
            let reason = report.current_context().to_string();
            report.context(SessionError::Configuration { reason })
        })?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let slot: Arc<dyn TokenSlot> = match &self.session.token_path {
            Some(path) => Arc::new(FileTokenSlot::new(path)),
            None => Arc::new(MemoryTokenSlot::new()),
        };
        let transport: Arc<dyn PushTransport> = match &self.notifications.url {
            Some(url) => Arc::new(WebSocketTransport::new(url)),
            None => Arc::new(ChannelTransport::new()),
        };

        let tokens = TokenStore::new(slot, Arc::clone(&clock));
        let hub = NotificationHub::new(transport, &self.notifications, clock);
        Ok(SessionManager::builder(Arc::new(identity), tokens, hub)
            .settings(settings)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn session_config_has_correct_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.default_ttl_minutes, 1440);
        assert_eq!(config.token_path, None);
    }

    #[test]
    fn minimal_file_fills_defaults() {
        let file = write_config(r#"{"identity":{"base_url":"https://api.example.test"}}"#);
        let config = CoreConfig::load(Some(file.path())).expect("load");

        assert_eq!(config.identity.base_url, "https://api.example.test");
        assert_eq!(config.identity.request_timeout_secs, 30);
        assert_eq!(config.session, SessionConfig::default());
        assert_eq!(config.notifications, NotificationsConfig::default());

        let settings = config.settings().expect("settings");
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.default_ttl, chrono::Duration::hours(24));
    }

    #[test]
    fn nested_settings_are_read() {
        let file = write_config(
            r#"{
                "identity": {"base_url": "http://localhost:8080", "request_timeout_secs": 5},
                "session": {"default_ttl_minutes": 60, "token_path": "/tmp/portal-token.json"},
                "notifications": {
                    "url": "wss://push.example.test/ws",
                    "max_entries": 50,
                    "reconnect": {"max_attempts": 3, "jitter": false}
                }
            }"#,
        );
        let config = CoreConfig::load(Some(file.path())).expect("load");

        assert_eq!(config.identity.request_timeout_secs, 5);
        assert_eq!(config.session.default_ttl_minutes, 60);
        assert_eq!(
            config.session.token_path.as_deref(),
            Some(Path::new("/tmp/portal-token.json"))
        );
        assert_eq!(config.notifications.max_entries, 50);
        assert_eq!(config.notifications.reconnect.max_attempts, 3);
        assert!(!config.notifications.reconnect.jitter);
        assert_eq!(config.notifications.reconnect.base_delay_ms, 500);
    }

    #[test]
    fn missing_identity_is_an_error() {
        let file = write_config(r#"{"session":{"default_ttl_minutes":5}}"#);
        assert!(CoreConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn build_rejects_non_positive_ttl() {
        let file = write_config(
            r#"{"identity":{"base_url":"http://x"},"session":{"default_ttl_minutes":0}}"#,
        );
        let config = CoreConfig::load(Some(file.path())).expect("load");
        let err = config.build().expect_err("zero ttl");
        assert!(matches!(
            err.current_context(),
            SessionError::Configuration { .. }
        ));
    }

    #[test]
    fn unrepresentable_ttl_is_a_configuration_error() {
        let file = write_config(&format!(
            r#"{{"identity":{{"base_url":"http://x"}},"session":{{"default_ttl_minutes":{}}}}}"#,
            i64::MAX
        ));
        let config = CoreConfig::load(Some(file.path())).expect("load");

        let err = config.settings().expect_err("ttl too large");
        assert!(matches!(
            err.current_context(),
            SessionError::Configuration { .. }
        ));
        assert!(config.build().is_err());
    }

    #[test]
    fn build_wires_a_signed_out_manager() {
        let file = write_config(r#"{"identity":{"base_url":"http://localhost:1"}}"#);
        let config = CoreConfig::load(Some(file.path())).expect("load");
        let manager = config.build().expect("build");
        assert!(!manager.state().is_authenticated());
        assert!(!manager.hub().is_connected());
    }
}
