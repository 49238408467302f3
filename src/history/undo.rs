//! Undo: replays a session's moves in reverse.

use serde::{Deserialize, Serialize};

use crate::history::entry::{ItemType, MoveRecord, SortSession};
use crate::utils::move_path;

/// Result of undo execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoResult {
    /// Number of moves reversed
    pub success_count: usize,
    /// Number of moves that could not be reversed
    pub fail_count: usize,
    pub files_restored: usize,
    pub folders_restored: usize,
    /// Error messages, one per failed move
    pub errors: Vec<String>,
}

impl UndoResult {
    pub fn total(&self) -> usize {
        self.success_count + self.fail_count
    }
}

/// Reverse every move in `session`, newest first.
///
/// Reverse order unwinds nested folder moves correctly. Each record is
/// independent: a missing or blocked item is counted as a failure and the
/// rest still run.
pub fn undo_session(session: &SortSession) -> UndoResult {
    let mut result = UndoResult::default();

    tracing::info!(
        base = %session.base_path.display(),
        moves = session.moves.len(),
        "Starting undo"
    );

    for record in session.moves.iter().rev() {
        match undo_move(record) {
            Ok(()) => {
                result.success_count += 1;
                match record.item_type {
                    ItemType::File => result.files_restored += 1,
                    ItemType::Folder => result.folders_restored += 1,
                }
                tracing::debug!(item = %record.item, "Restored");
            }
            Err(e) => {
                tracing::warn!(item = %record.item, error = %e, "Failed to restore");
                result.fail_count += 1;
                result.errors.push(e);
            }
        }
    }

    tracing::info!(
        restored = result.success_count,
        failed = result.fail_count,
        files = result.files_restored,
        folders = result.folders_restored,
        "Undo complete"
    );

    result
}

fn undo_move(record: &MoveRecord) -> Result<(), String> {
    let current = &record.destination;
    let original = &record.source;

    // The user may have moved or deleted it since the sort
    if !current.exists() {
        return Err(format!("Item no longer exists: {}", current.display()));
    }

    match record.item_type {
        ItemType::File if current.is_dir() => {
            return Err(format!("Expected a file at {}", current.display()));
        }
        ItemType::Folder if !current.is_dir() => {
            return Err(format!("Expected a folder at {}", current.display()));
        }
        _ => {}
    }

    move_path(current, original).map_err(|e| {
        format!(
            "Failed to move {} back to {}: {}",
            current.display(),
            original.display(),
            e
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn record(base: &Path, item: &str, target: &str, item_type: ItemType) -> MoveRecord {
        MoveRecord {
            source: base.join(item),
            destination: base.join(target).join(item),
            item: item.to_string(),
            target_folder: target.to_string(),
            item_type,
        }
    }

    #[test]
    fn test_undo_restores_files_and_folders() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("Documents")).unwrap();
        fs::write(base.join("Documents/a.txt"), "a").unwrap();
        fs::create_dir_all(base.join("Games/Minecraft_Server/world")).unwrap();

        let mut session = SortSession::new(Utc::now(), base.to_path_buf());
        session.moves.push(record(base, "a.txt", "Documents", ItemType::File));
        session
            .moves
            .push(record(base, "Minecraft_Server", "Games", ItemType::Folder));

        let result = undo_session(&session);

        assert_eq!(result.success_count, 2);
        assert_eq!(result.fail_count, 0);
        assert_eq!(result.files_restored, 1);
        assert_eq!(result.folders_restored, 1);
        assert_eq!(fs::read_to_string(base.join("a.txt")).unwrap(), "a");
        assert!(base.join("Minecraft_Server/world").is_dir());
    }

    #[test]
    fn test_undo_counts_missing_items_and_continues() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("Documents")).unwrap();
        fs::write(base.join("Documents/kept.txt"), "k").unwrap();

        let mut session = SortSession::new(Utc::now(), base.to_path_buf());
        session.moves.push(record(base, "kept.txt", "Documents", ItemType::File));
        session.moves.push(record(base, "gone.txt", "Documents", ItemType::File));

        let result = undo_session(&session);

        assert_eq!(result.success_count, 1);
        assert_eq!(result.fail_count, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(base.join("kept.txt").exists());
    }

    #[test]
    fn test_undo_never_overwrites_original_location() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("Documents")).unwrap();
        fs::write(base.join("Documents/a.txt"), "sorted").unwrap();
        fs::write(base.join("a.txt"), "new file").unwrap();

        let mut session = SortSession::new(Utc::now(), base.to_path_buf());
        session.moves.push(record(base, "a.txt", "Documents", ItemType::File));

        let result = undo_session(&session);

        assert_eq!(result.fail_count, 1);
        assert_eq!(fs::read_to_string(base.join("a.txt")).unwrap(), "new file");
        assert!(base.join("Documents/a.txt").exists());
    }

    #[test]
    fn test_undo_runs_in_reverse_for_nested_moves() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        // Folder "Proj" was moved into "Work", then "Work" was moved into "Archive"
        fs::create_dir_all(base.join("Archive/Work/Proj")).unwrap();

        let mut session = SortSession::new(Utc::now(), base.to_path_buf());
        session.moves.push(MoveRecord {
            source: base.join("Proj"),
            destination: base.join("Work/Proj"),
            item: "Proj".to_string(),
            target_folder: "Work".to_string(),
            item_type: ItemType::Folder,
        });
        session.moves.push(record(base, "Work", "Archive", ItemType::Folder));

        let result = undo_session(&session);

        assert_eq!(result.success_count, 2);
        assert!(base.join("Proj").is_dir());
        assert!(base.join("Work").is_dir());
        assert!(!base.join("Work/Proj").exists());
    }

    #[test]
    fn test_type_mismatch_is_a_failure() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("Documents/a.txt")).unwrap();

        let mut session = SortSession::new(Utc::now(), base.to_path_buf());
        session.moves.push(record(base, "a.txt", "Documents", ItemType::File));

        let result = undo_session(&session);
        assert_eq!(result.fail_count, 1);
    }
}
