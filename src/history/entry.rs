//! Data structures for sort history and undo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Kind of item a move record refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    File,
    Folder,
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::File => f.write_str("file"),
            ItemType::Folder => f.write_str("folder"),
        }
    }
}

/// One executed move, reversible by swapping source and destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    /// Absolute path before the move
    pub source: PathBuf,
    /// Absolute path after the move (includes any collision suffix)
    pub destination: PathBuf,
    /// Original base name
    pub item: String,
    /// Destination folder relative to the base dir, as planned
    pub target_folder: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
}

impl MoveRecord {
    /// Human-readable description of the move
    pub fn description(&self) -> String {
        format!(
            "Move {}: {} → {}",
            self.item_type,
            self.source.display(),
            self.destination.display()
        )
    }
}

/// A completed sort run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSession {
    /// When the sort began (the undo window is measured from here)
    pub timestamp: DateTime<Utc>,
    /// Root directory that was sorted
    pub base_path: PathBuf,
    /// Moves in execution order
    pub moves: Vec<MoveRecord>,
}

impl SortSession {
    pub fn new(timestamp: DateTime<Utc>, base_path: PathBuf) -> Self {
        Self {
            timestamp,
            base_path,
            moves: Vec::new(),
        }
    }

    pub fn move_count(&self) -> usize {
        self.moves.len()
    }

    pub fn count_of(&self, item_type: ItemType) -> usize {
        self.moves.iter().filter(|m| m.item_type == item_type).count()
    }
}

/// Marker written next to a session file once it has been undone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoMarker {
    pub undone_at: DateTime<Utc>,
    pub success_count: usize,
    pub fail_count: usize,
}

/// Persisted session plus where it lives, for listing
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub path: PathBuf,
    pub session: SortSession,
    pub undone: Option<UndoMarker>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(item: &str, item_type: ItemType) -> MoveRecord {
        MoveRecord {
            source: PathBuf::from(format!("/base/{}", item)),
            destination: PathBuf::from(format!("/base/Games/{}", item)),
            item: item.to_string(),
            target_folder: "Games".to_string(),
            item_type,
        }
    }

    #[test]
    fn test_move_record_wire_format() {
        let json = serde_json::to_value(record("Minecraft", ItemType::Folder)).unwrap();

        assert_eq!(json["type"], "folder");
        assert_eq!(json["targetFolder"], "Games");
        assert_eq!(json["source"], "/base/Minecraft");
        assert!(json.get("itemType").is_none());
    }

    #[test]
    fn test_session_wire_format_and_counts() {
        let mut session = SortSession::new(Utc::now(), PathBuf::from("/base"));
        session.moves.push(record("a.txt", ItemType::File));
        session.moves.push(record("b.txt", ItemType::File));
        session.moves.push(record("Minecraft", ItemType::Folder));

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["basePath"], "/base");
        assert_eq!(json["moves"].as_array().unwrap().len(), 3);

        assert_eq!(session.count_of(ItemType::File), 2);
        assert_eq!(session.count_of(ItemType::Folder), 1);

        let back: SortSession = serde_json::from_value(json).unwrap();
        assert_eq!(back, session);
    }
}
