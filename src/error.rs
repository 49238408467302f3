use std::path::PathBuf;

/// Crate-wide error type.
///
/// Only operation-level failures and infrastructure errors live here.
/// Per-item move failures are counted, not raised.
#[derive(Debug, thiserror::Error)]
pub enum SorterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No folder path provided")]
    MissingFolder,

    #[error("Directory does not exist: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Nothing to sort in {}", .0.display())]
    NothingToSort(PathBuf),

    #[error("OpenRouter API key is not set")]
    MissingCredential,

    #[error("Credential store error: {0}")]
    Credential(String),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Another sort or undo is already in progress")]
    Busy,

    #[error("History error: {0}")]
    History(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SorterError>;
