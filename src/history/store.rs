//! Persistence manager for sort history files.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SorterError};
use crate::history::entry::{SortSession, StoredSession, UndoMarker};
use crate::utils::atomic_write_json;

const SESSION_PREFIX: &str = "sort_history_";
const SESSION_EXTENSION: &str = ".json";
const UNDONE_EXTENSION: &str = ".undone.json";
const POINTER_FILE: &str = "undo_pointer.json";

/// Which session the most recent sort attempt left undoable, if any
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UndoPointer {
    updated_at: DateTime<Utc>,
    session: Option<PathBuf>,
}

/// History store for sort sessions.
///
/// Files are stored in the configured history dir:
/// - `sort_history_{YYYYMMDD_HHMMSS}.json` - one completed sort, never rewritten
/// - `sort_history_{...}.undone.json` - marker written once that sort was undone
/// - `undo_pointer.json` - the session the latest sort attempt left undoable
pub struct HistoryStore {
    history_dir: PathBuf,
}

impl HistoryStore {
    /// Create a history store, ensuring the directory exists
    pub fn new(history_dir: PathBuf) -> Self {
        if let Err(e) = fs::create_dir_all(&history_dir) {
            tracing::warn!("Failed to create history directory: {}", e);
        }
        Self { history_dir }
    }

    pub fn history_dir(&self) -> &Path {
        &self.history_dir
    }

    /// First free session file name for the given timestamp label
    fn session_file_path(&self, label: &str) -> PathBuf {
        let base = self
            .history_dir
            .join(format!("{}{}{}", SESSION_PREFIX, label, SESSION_EXTENSION));
        if !base.exists() {
            return base;
        }

        let mut counter = 1;
        loop {
            let candidate = self.history_dir.join(format!(
                "{}{}_{}{}",
                SESSION_PREFIX, label, counter, SESSION_EXTENSION
            ));
            if !candidate.exists() {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Persist a session. Empty sessions are not written.
    ///
    /// Returns the path of the written file.
    pub fn save_session(&self, session: &SortSession) -> Result<Option<PathBuf>> {
        if session.moves.is_empty() {
            tracing::debug!(base = %session.base_path.display(), "No moves, skipping history file");
            return Ok(None);
        }

        let label = session
            .timestamp
            .with_timezone(&Local)
            .format("%Y%m%d_%H%M%S")
            .to_string();
        let path = self.session_file_path(&label);

        atomic_write_json(&path, session)?;

        tracing::info!(
            path = %path.display(),
            moves = session.moves.len(),
            "Saved sort history"
        );

        Ok(Some(path))
    }

    /// Load a single session file
    pub fn load_session(&self, path: &Path) -> Result<SortSession> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            SorterError::History(format!("Corrupt session file {}: {}", path.display(), e))
        })
    }

    /// All persisted sessions, newest first. Unreadable files are skipped.
    pub fn list_sessions(&self) -> Result<Vec<StoredSession>> {
        if !self.history_dir.exists() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        for entry in fs::read_dir(&self.history_dir)? {
            let path = entry?.path();
            if !is_session_file(&path) {
                continue;
            }

            match self.load_session(&path) {
                Ok(session) => {
                    let undone = self.load_marker(&path);
                    sessions.push(StoredSession {
                        path,
                        session,
                        undone,
                    });
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable history file");
                }
            }
        }

        sessions.sort_by(|a, b| {
            b.session
                .timestamp
                .cmp(&a.session.timestamp)
                .then_with(|| b.path.cmp(&a.path))
        });
        Ok(sessions)
    }

    /// Newest session that has not been undone
    pub fn latest_session(&self) -> Result<Option<StoredSession>> {
        Ok(self
            .list_sessions()?
            .into_iter()
            .find(|stored| stored.undone.is_none()))
    }

    /// Point the undo pointer at `session_path`, or at nothing.
    ///
    /// Written after every sort attempt and every undo, so a failed or empty
    /// sort also retires the session before it.
    pub fn set_undoable(&self, session_path: Option<&Path>) -> Result<()> {
        let pointer = UndoPointer {
            updated_at: Utc::now(),
            session: session_path.map(Path::to_path_buf),
        };
        atomic_write_json(&self.history_dir.join(POINTER_FILE), &pointer)
    }

    /// The session a fresh process may offer for undo.
    ///
    /// Follows the undo pointer. Without one, only the newest session is a
    /// candidate. Undone or unreadable sessions are never returned.
    pub fn undoable_session(&self) -> Result<Option<StoredSession>> {
        let pointer_path = self.history_dir.join(POINTER_FILE);
        if !pointer_path.exists() {
            return Ok(self
                .list_sessions()?
                .into_iter()
                .next()
                .filter(|stored| stored.undone.is_none()));
        }

        let text = fs::read_to_string(&pointer_path)?;
        let pointer: UndoPointer = serde_json::from_str(&text).map_err(|e| {
            SorterError::History(format!("Corrupt undo pointer {}: {}", pointer_path.display(), e))
        })?;

        let path = match pointer.session {
            Some(path) => path,
            None => return Ok(None),
        };
        if self.load_marker(&path).is_some() {
            return Ok(None);
        }
        match self.load_session(&path) {
            Ok(session) => Ok(Some(StoredSession {
                path,
                session,
                undone: None,
            })),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Undo pointer names an unreadable session");
                Ok(None)
            }
        }
    }

    /// Record that the session at `session_path` was undone.
    ///
    /// The session file itself is left untouched.
    pub fn mark_undone(
        &self,
        session_path: &Path,
        success_count: usize,
        fail_count: usize,
    ) -> Result<PathBuf> {
        let marker_path = marker_path_for(session_path);
        let marker = UndoMarker {
            undone_at: Utc::now(),
            success_count,
            fail_count,
        };
        atomic_write_json(&marker_path, &marker)?;

        tracing::info!(path = %session_path.display(), "Marked session as undone");
        Ok(marker_path)
    }

    fn load_marker(&self, session_path: &Path) -> Option<UndoMarker> {
        let marker_path = marker_path_for(session_path);
        let text = fs::read_to_string(&marker_path).ok()?;
        match serde_json::from_str(&text) {
            Ok(marker) => Some(marker),
            Err(e) => {
                tracing::warn!(path = %marker_path.display(), error = %e, "Unreadable undo marker");
                None
            }
        }
    }
}

fn is_session_file(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };
    name.starts_with(SESSION_PREFIX)
        && name.ends_with(SESSION_EXTENSION)
        && !name.ends_with(UNDONE_EXTENSION)
}

fn marker_path_for(session_path: &Path) -> PathBuf {
    let name = session_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = name.strip_suffix(SESSION_EXTENSION).unwrap_or(&name);
    session_path.with_file_name(format!("{}{}", stem, UNDONE_EXTENSION))
}
