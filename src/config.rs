//! Runtime configuration and persisted user settings.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SorterError};
use crate::utils::atomic_write_json;

/// Application directory name under the platform data/config dirs
pub const APP_DIR_NAME: &str = "ai-file-sorter";

pub const DEFAULT_MODEL: &str = "meta-llama/llama-4-maverick:free";
pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Undo is only offered this long after a sort began
pub const UNDO_WINDOW: Duration = Duration::from_secs(2 * 60);

/// How deep the existing-structure summary walks below the base dir
pub const STRUCTURE_MAX_DEPTH: usize = 3;

/// Folder catching top-level files the plan did not claim
pub const OVERFLOW_FOLDER: &str = "Unsorted";

const SETTINGS_FILENAME: &str = "settings.json";

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct SorterConfig {
    pub data_dir: PathBuf,
    pub history_dir: PathBuf,
    pub debug_dir: PathBuf,
    pub log_dir: PathBuf,
    pub settings_path: PathBuf,
    pub api_url: String,
    pub model: String,
    pub undo_window: Duration,
    pub structure_depth: usize,
    pub save_diagnostics: bool,
}

impl SorterConfig {
    /// Build a config rooted at `data_dir` with defaults for everything else
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            history_dir: data_dir.join("history"),
            debug_dir: data_dir.join("debug"),
            log_dir: data_dir.join("logs"),
            settings_path: data_dir.join(SETTINGS_FILENAME),
            data_dir,
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            undo_window: UNDO_WINDOW,
            structure_depth: STRUCTURE_MAX_DEPTH,
            save_diagnostics: false,
        }
    }

    /// Resolve configuration from the environment.
    ///
    /// Call after `.env` has been loaded so overrides placed there apply.
    pub fn from_env() -> Self {
        let data_dir = env::var_os("AI_SORTER_DATA_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::data_dir().map(|d| d.join(APP_DIR_NAME)))
            .unwrap_or_else(|| PathBuf::from(".").join(APP_DIR_NAME));

        let mut config = Self::with_data_dir(data_dir);

        // Settings live with the rest of the user's config, not the data dir
        if let Some(config_dir) = dirs::config_dir() {
            config.settings_path = config_dir.join(APP_DIR_NAME).join(SETTINGS_FILENAME);
        }

        if let Ok(model) = env::var("AI_SORTER_MODEL") {
            if !model.trim().is_empty() {
                config.model = model.trim().to_string();
            }
        }
        if let Ok(url) = env::var("AI_SORTER_API_URL") {
            if !url.trim().is_empty() {
                config.api_url = url.trim().to_string();
            }
        }
        if let Ok(flag) = env::var("AI_SORTER_SAVE_DIAGNOSTICS") {
            config.save_diagnostics = parse_bool(&flag).unwrap_or(false);
        }

        config
    }

    /// Lock file guarding sort/undo across processes
    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join("sorter.lock")
    }
}

/// Parse a loose boolean ("1", "true", "yes", "on" and their negatives)
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// User-editable settings persisted as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_use_web_search")]
    pub use_web_search: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

fn default_use_web_search() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_web_search: true,
            model: None,
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults when the file is missing or unreadable
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path)
            .map_err(SorterError::from)
            .and_then(|text| serde_json::from_str::<Settings>(&text).map_err(SorterError::from))
        {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read settings, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        atomic_write_json(path, self)
    }
}
