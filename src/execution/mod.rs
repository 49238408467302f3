//! Execution Module
//!
//! Applies a categorization plan to the filesystem, then cleans up folders
//! the moves left empty.

pub mod executor;
pub mod reaper;

pub use executor::*;
pub use reaper::*;
