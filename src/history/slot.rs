//! Single-slot holder for the one undoable session.
//!
//! Owned by the sorter and passed to whatever needs it; there is no global.
//! Lifecycle: `begin` at the start of every sort attempt, `complete` once
//! moves are known, `clear` on a failed or empty sort and after undo.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::history::entry::{MoveRecord, SortSession};

/// The session currently eligible for undo, plus its history file if persisted
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub session: SortSession,
    pub file: Option<PathBuf>,
}

pub struct SessionSlot {
    inner: Mutex<Option<ActiveSession>>,
    window: Duration,
}

fn acquire<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|poisoned: PoisonError<MutexGuard<'_, T>>| {
        tracing::warn!("Session slot was poisoned, recovering inner value");
        poisoned.into_inner()
    })
}

impl SessionSlot {
    pub fn new(window: Duration) -> Self {
        Self {
            inner: Mutex::new(None),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Start tracking a new sort, replacing whatever was there.
    pub fn begin(&self, base_path: PathBuf, started_at: DateTime<Utc>) {
        *acquire(&self.inner) = Some(ActiveSession {
            session: SortSession::new(started_at, base_path),
            file: None,
        });
    }

    /// Attach the executed moves to the session started by `begin`.
    pub fn complete(&self, moves: Vec<MoveRecord>, file: Option<PathBuf>) {
        let mut guard = acquire(&self.inner);
        match guard.as_mut() {
            Some(active) => {
                active.session.moves = moves;
                active.file = file;
            }
            None => tracing::warn!("Sort completed without an active session"),
        }
    }

    /// Put a previously persisted session back (used at startup).
    pub fn restore(&self, active: ActiveSession) {
        *acquire(&self.inner) = Some(active);
    }

    pub fn clear(&self) {
        *acquire(&self.inner) = None;
    }

    pub fn snapshot(&self) -> Option<ActiveSession> {
        acquire(&self.inner).clone()
    }

    /// Remove and return the session, leaving the slot empty.
    pub fn take(&self) -> Option<ActiveSession> {
        acquire(&self.inner).take()
    }

    /// True iff a session with at least one move began no more than the
    /// undo window before `now`.
    pub fn can_undo_at(&self, now: DateTime<Utc>) -> bool {
        let guard = acquire(&self.inner);
        let active = match guard.as_ref() {
            Some(active) => active,
            None => return false,
        };
        if active.session.moves.is_empty() {
            return false;
        }
        within_window(active.session.timestamp, now, self.window)
    }
}

/// Whether `now` is no more than `window` after `started`.
pub fn within_window(started: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    // A start time in the future (clock adjustment) counts as zero elapsed
    let elapsed = (now - started).to_std().unwrap_or(Duration::ZERO);
    elapsed <= window
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::entry::ItemType;
    use chrono::TimeDelta;

    fn one_move() -> Vec<MoveRecord> {
        vec![MoveRecord {
            source: PathBuf::from("/base/a.txt"),
            destination: PathBuf::from("/base/Documents/a.txt"),
            item: "a.txt".to_string(),
            target_folder: "Documents".to_string(),
            item_type: ItemType::File,
        }]
    }

    #[test]
    fn test_empty_slot_cannot_undo() {
        let slot = SessionSlot::new(Duration::from_secs(120));
        assert!(!slot.can_undo_at(Utc::now()));
    }

    #[test]
    fn test_begun_session_without_moves_cannot_undo() {
        let slot = SessionSlot::new(Duration::from_secs(120));
        let start = Utc::now();
        slot.begin(PathBuf::from("/base"), start);
        assert!(!slot.can_undo_at(start));
        assert!(slot.snapshot().is_some());
    }

    #[test]
    fn test_window_boundaries() {
        let slot = SessionSlot::new(Duration::from_secs(120));
        let start = Utc::now();
        slot.begin(PathBuf::from("/base"), start);
        slot.complete(one_move(), None);

        assert!(slot.can_undo_at(start + TimeDelta::seconds(30)));
        assert!(slot.can_undo_at(start + TimeDelta::seconds(120)));
        assert!(!slot.can_undo_at(start + TimeDelta::seconds(121)));
        // Still held, just expired
        assert!(slot.snapshot().is_some());
    }

    #[test]
    fn test_new_sort_replaces_previous() {
        let slot = SessionSlot::new(Duration::from_secs(120));
        let start = Utc::now();
        slot.begin(PathBuf::from("/first"), start);
        slot.complete(one_move(), Some(PathBuf::from("/h/one.json")));

        slot.begin(PathBuf::from("/second"), start);

        let active = slot.snapshot().unwrap();
        assert_eq!(active.session.base_path, PathBuf::from("/second"));
        assert!(active.session.moves.is_empty());
        assert_eq!(active.file, None);
    }

    #[test]
    fn test_take_and_clear() {
        let slot = SessionSlot::new(Duration::from_secs(120));
        slot.begin(PathBuf::from("/base"), Utc::now());
        slot.complete(one_move(), None);

        assert!(slot.take().is_some());
        assert!(slot.take().is_none());

        slot.begin(PathBuf::from("/base"), Utc::now());
        slot.clear();
        assert!(slot.snapshot().is_none());
    }

    #[test]
    fn test_future_start_counts_as_within_window() {
        let now = Utc::now();
        assert!(within_window(now + TimeDelta::seconds(5), now, Duration::from_secs(120)));
    }
}
