//! History module for tracking sort sessions and undoing the latest one.
//!
//! This module provides:
//! - `entry`: Move records and sessions in their persisted JSON form
//! - `store`: One history file per session, plus undo markers
//! - `slot`: The single in-memory undoable session
//! - `undo`: Reverse replay of a session's moves

mod entry;
mod slot;
mod store;
mod undo;

pub use entry::*;
pub use slot::*;
pub use store::*;
pub use undo::*;
