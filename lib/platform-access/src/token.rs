//! Token store and validator.
//!
//! Holds the single bearer token of the current process and answers "is it
//! still valid" without touching the network. Every decode problem resolves
//! to "invalid"; callers never see a token error.

use crate::error::{MalformedToken, TokenLifetimeOutOfRange};
use crate::slot::{MemoryTokenSlot, TokenSlot};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use portal_core::{Clock, SystemClock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// An opaque bearer credential.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads the `exp` claim when the token is a JWT.
    ///
    /// Opaque single-segment tokens carry no claims and yield `Ok(None)`.
    /// Anything else that fails to decode is malformed.
    pub fn expiry_claim(&self) -> Result<Option<DateTime<Utc>>, MalformedToken> {
        let malformed = |reason: &str| MalformedToken {
            reason: reason.to_string(),
        };

        if self.0.trim().is_empty() {
            return Err(malformed("empty token"));
        }

        let segments: Vec<&str> = self.0.split('.').collect();
        match segments.len() {
            1 => Ok(None),
            3 => {
                let payload = URL_SAFE_NO_PAD
                    .decode(segments[1].trim_end_matches('='))
                    .map_err(|e| malformed(&format!("payload is not base64url: {e}")))?;
                let claims: serde_json::Value = serde_json::from_slice(&payload)
                    .map_err(|e| malformed(&format!("payload is not JSON: {e}")))?;
                match claims.get("exp") {
                    None | Some(serde_json::Value::Null) => Ok(None),
                    Some(exp) => {
                        let seconds = exp
                            .as_i64()
                            .or_else(|| exp.as_f64().map(|f| f as i64))
                            .ok_or_else(|| malformed("exp claim is not numeric"))?;
                        DateTime::from_timestamp(seconds, 0)
                            .map(Some)
                            .ok_or_else(|| malformed("exp claim out of range"))
                    }
                }
            }
            _ => Err(malformed("unexpected segment count")),
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for AccessToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// The persisted token record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: AccessToken,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    /// Effective expiry: the earlier of the stored expiry and the token's own
    /// `exp` claim.
    pub fn effective_expiry(&self) -> Result<DateTime<Utc>, MalformedToken> {
        Ok(match self.token.expiry_claim()? {
            Some(claimed) => claimed.min(self.expires_at),
            None => self.expires_at,
        })
    }

    /// Returns true if the token is usable at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.effective_expiry() {
            Ok(expires_at) => now < expires_at,
            Err(e) => {
                debug!(error = %e, "treating malformed token as invalid");
                false
            }
        }
    }
}

/// Single-slot token holder.
///
/// Writes go through to the configured [`TokenSlot`] so a restarted process
/// can resume the session. Only the session manager should call
/// [`TokenStore::set_token`] and [`TokenStore::clear`].
pub struct TokenStore {
    cell: RwLock<Option<StoredToken>>,
    slot: Arc<dyn TokenSlot>,
    clock: Arc<dyn Clock>,
}

impl TokenStore {
    /// Creates a store backed by `slot`, restoring whatever it holds.
    ///
    /// An unreadable slot starts the store empty.
    #[must_use]
    pub fn new(slot: Arc<dyn TokenSlot>, clock: Arc<dyn Clock>) -> Self {
        let restored = match slot.load() {
            Ok(record) => record,
            Err(report) => {
                warn!(error = %report, "ignoring unreadable token slot");
                None
            }
        };
        Self {
            cell: RwLock::new(restored),
            slot,
            clock,
        }
    }

    /// Creates a store that keeps the token in memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenSlot::new()), Arc::new(SystemClock))
    }

    /// Stores `token`, valid for `ttl` from now, replacing any prior token.
    ///
    /// # Errors
    ///
    /// Returns `TokenLifetimeOutOfRange` if `now + ttl` is not a representable
    /// instant. The previous token is left in place.
    pub fn set_token(
        &self,
        token: AccessToken,
        ttl: Duration,
    ) -> Result<StoredToken, TokenLifetimeOutOfRange> {
        let now = self.clock.now();
        let Some(expires_at) = now.checked_add_signed(ttl) else {
            return Err(TokenLifetimeOutOfRange {
                ttl_seconds: ttl.num_seconds(),
            });
        };
        let record = StoredToken {
            token,
            issued_at: now,
            expires_at,
        };
        if let Err(report) = self.slot.save(&record) {
            warn!(error = %report, "token kept in memory only");
        }
        *self.cell.write().unwrap_or_else(PoisonError::into_inner) = Some(record.clone());
        Ok(record)
    }

    /// Returns the stored token, valid or not.
    #[must_use]
    pub fn current_token(&self) -> Option<AccessToken> {
        self.record().map(|r| r.token)
    }

    /// Returns the full stored record.
    #[must_use]
    pub fn record(&self) -> Option<StoredToken> {
        self.cell
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the token only if it is currently valid.
    #[must_use]
    pub fn valid_token(&self) -> Option<AccessToken> {
        self.record()
            .filter(|r| r.is_valid_at(self.clock.now()))
            .map(|r| r.token)
    }

    /// Returns true if a well-formed, unexpired token is stored.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid_token().is_some()
    }

    /// Removes the token. Idempotent.
    pub fn clear(&self) {
        let previous = self
            .cell
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_none() {
            return;
        }
        if let Err(report) = self.slot.clear() {
            warn!(error = %report, "failed to clear persisted token");
        }
    }

    /// Returns the clock used for validity decisions.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("record", &self.record())
            .finish_non_exhaustive()
    }
}
