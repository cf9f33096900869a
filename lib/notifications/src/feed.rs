//! The notification feed: a bounded, most-recent-first list of entries.

use crate::notification::{Notification, NotificationId, PushEvent};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Default bound on retained entries.
pub const DEFAULT_MAX_ENTRIES: usize = 200;

#[derive(Debug, Clone)]
struct Entry {
    notification: Notification,
    /// Id the server sent, if any. Only these take part in dedup.
    source_id: Option<u64>,
}

/// Ordered notification entries.
///
/// Entries carry the server's id when it sent one and it is free, otherwise a
/// locally assigned id. Local ids always exceed every id seen so far.
#[derive(Debug, Clone)]
pub struct Feed {
    entries: VecDeque<Entry>,
    next_id: u64,
    max_entries: usize,
}

impl Default for Feed {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl Feed {
    /// Creates an empty feed retaining at most `max_entries` (at least one).
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            next_id: 1,
            max_entries: max_entries.max(1),
        }
    }

    /// Prepends `event` as an unread entry.
    ///
    /// Returns `None` if an entry with the same server id is already present.
    /// A server id that clashes with a locally numbered entry is replaced by a
    /// fresh local id.
    pub fn push(&mut self, event: PushEvent, now: DateTime<Utc>) -> Option<NotificationId> {
        if event
            .id
            .is_some_and(|source_id| self.entries.iter().any(|e| e.source_id == Some(source_id)))
        {
            return None;
        }
        let id = match event.id {
            Some(source_id) if !self.contains(NotificationId::new(source_id)) => source_id,
            _ => self.next_id,
        };
        self.next_id = self.next_id.max(id.saturating_add(1));

        let id = NotificationId::new(id);
        self.entries.push_front(Entry {
            notification: Notification {
                id,
                kind: event.kind,
                message: event.message,
                payload: event.payload,
                read: false,
                created_at: now,
            },
            source_id: event.id,
        });
        self.entries.truncate(self.max_entries);
        Some(id)
    }

    fn contains(&self, id: NotificationId) -> bool {
        self.entries.iter().any(|e| e.notification.id == id)
    }

    /// Marks one entry read. Returns whether anything changed.
    pub fn mark_read(&mut self, id: NotificationId) -> bool {
        match self
            .entries
            .iter_mut()
            .map(|e| &mut e.notification)
            .find(|n| n.id == id)
        {
            Some(entry) if !entry.read => {
                entry.read = true;
                true
            }
            _ => false,
        }
    }

    /// Marks every entry read. Returns how many changed.
    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for entry in self
            .entries
            .iter_mut()
            .map(|e| &mut e.notification)
            .filter(|n| !n.read)
        {
            entry.read = true;
            changed += 1;
        }
        changed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.iter().filter(|n| !n.read).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Entries, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter().map(|e| &e.notification)
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Notification> {
        self.iter().cloned().collect()
    }
}
