//! Durable storage for the single session token.
//!
//! A slot holds at most one [`StoredToken`]. Saving always replaces what
//! was there.

use crate::error::TokenSlotError;
use crate::token::StoredToken;
use portal_core::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// A single named storage slot for the token record.
pub trait TokenSlot: Send + Sync {
    /// Loads the stored record, if any.
    fn load(&self) -> Result<Option<StoredToken>, TokenSlotError>;

    /// Replaces the stored record.
    fn save(&self, record: &StoredToken) -> Result<(), TokenSlotError>;

    /// Removes the stored record. Clearing an empty slot succeeds.
    fn clear(&self) -> Result<(), TokenSlotError>;
}

/// Slot that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryTokenSlot {
    record: Mutex<Option<StoredToken>>,
}

impl MemoryTokenSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenSlot for MemoryTokenSlot {
    fn load(&self) -> Result<Option<StoredToken>, TokenSlotError> {
        Ok(self
            .record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, record: &StoredToken) -> Result<(), TokenSlotError> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenSlotError> {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

/// Slot backed by one JSON file.
///
/// Writes land in a sibling temporary file first and are renamed into
/// place, so a crash mid-write never leaves a half-written record.
#[derive(Debug, Clone)]
pub struct FileTokenSlot {
    path: PathBuf,
}

impl FileTokenSlot {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

impl TokenSlot for FileTokenSlot {
    fn load(&self) -> Result<Option<StoredToken>, TokenSlotError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TokenSlotError::ReadFailed {
                    location: self.location(),
                    reason: e.to_string(),
                }
                .into());
            }
        };

        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            TokenSlotError::Corrupt {
                location: self.location(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn save(&self, record: &StoredToken) -> Result<(), TokenSlotError> {
        let write_failed = |reason: String| TokenSlotError::WriteFailed {
            location: self.location(),
            reason,
        };

        let bytes = serde_json::to_vec(record).map_err(|e| write_failed(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| write_failed(e.to_string()))?;
        }

        let staging = self.path.with_extension("tmp");
        std::fs::write(&staging, bytes).map_err(|e| write_failed(e.to_string()))?;
        std::fs::rename(&staging, &self.path).map_err(|e| write_failed(e.to_string()))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenSlotError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TokenSlotError::WriteFailed {
                location: self.location(),
                reason: e.to_string(),
            }
            .into()),
        }
    }
}
