//! Command line surface. The only place that prints to stdout.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::ai::CredentialManager;
use crate::config::{parse_bool, Settings, SorterConfig};
use crate::error::{Result, SorterError};
use crate::sorter::FolderSorter;

#[derive(Debug, Parser)]
#[command(name = "ai-file-sorter")]
#[command(about = "Sort a folder's contents into categories with an AI model", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sort the top level of a folder
    Sort {
        path: PathBuf,
        /// Let the model search the web (overrides the saved setting)
        #[arg(long, action = ArgAction::SetTrue, conflicts_with = "no_web_search")]
        web_search: bool,
        /// Never let the model search the web for this sort
        #[arg(long, action = ArgAction::SetTrue)]
        no_web_search: bool,
    },
    /// Undo the most recent sort if it is still within the undo window
    Undo,
    /// Report whether the most recent sort can be undone
    CanUndo,
    /// List past sorts, newest first
    History,
    /// Store the OpenRouter API key in the OS keyring
    SetApiKey { key: String },
    /// Remove the OpenRouter API key from the OS keyring
    DeleteApiKey,
    /// Save the default web search preference
    SetWebSearch { enabled: String },
}

/// Pick the web search flag for one sort: explicit flags beat the saved setting
pub fn effective_web_search(web_search: bool, no_web_search: bool, settings: &Settings) -> bool {
    if web_search {
        true
    } else if no_web_search {
        false
    } else {
        settings.use_web_search
    }
}

/// Run one command. Returns the process exit code.
pub async fn dispatch(
    command: Commands,
    config: &SorterConfig,
    settings: &Settings,
    sorter: &FolderSorter,
) -> Result<i32> {
    match command {
        Commands::Sort {
            path,
            web_search,
            no_web_search,
        } => {
            let use_web_search = effective_web_search(web_search, no_web_search, settings);
            let outcome = sorter.sort_folder(&path, use_web_search).await;

            if !outcome.success {
                println!(
                    "Sort failed: {}",
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
                return Ok(1);
            }

            for record in &outcome.moves {
                println!("  {}", record.description());
            }
            println!("Moved {} item(s)", outcome.moves.len());
            if !outcome.moves.is_empty() {
                println!(
                    "Run `ai-file-sorter undo` within {} seconds to revert",
                    config.undo_window.as_secs()
                );
            }
            Ok(0)
        }
        Commands::Undo => {
            if !sorter.can_undo() {
                println!("Nothing to undo");
                return Ok(1);
            }
            let result = sorter.undo().await;
            println!(
                "Restored {} item(s) ({} files, {} folders), {} failed",
                result.success_count,
                result.files_restored,
                result.folders_restored,
                result.fail_count
            );
            for error in &result.errors {
                println!("  {}", error);
            }
            Ok(if result.fail_count == 0 { 0 } else { 1 })
        }
        Commands::CanUndo => {
            let can_undo = sorter.can_undo();
            println!("{}", can_undo);
            Ok(if can_undo { 0 } else { 1 })
        }
        Commands::History => {
            let sessions = sorter.history().list_sessions()?;
            if sessions.is_empty() {
                println!("No sorts recorded");
            }
            for stored in sessions {
                let status = match &stored.undone {
                    Some(marker) => format!(
                        "undone ({} restored, {} failed)",
                        marker.success_count, marker.fail_count
                    ),
                    None => "active".to_string(),
                };
                println!(
                    "{}  {}  {} move(s)  {}",
                    stored.session.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    stored.session.base_path.display(),
                    stored.session.move_count(),
                    status
                );
            }
            Ok(0)
        }
        Commands::SetApiKey { key } => {
            CredentialManager::new().store_api_key(&key)?;
            println!("API key stored");
            Ok(0)
        }
        Commands::DeleteApiKey => {
            CredentialManager::new().delete_api_key()?;
            println!("API key removed");
            Ok(0)
        }
        Commands::SetWebSearch { enabled } => {
            let enabled = parse_bool(&enabled).ok_or_else(|| {
                SorterError::Config(format!("Expected true or false, got '{}'", enabled))
            })?;
            let mut updated = settings.clone();
            updated.use_web_search = enabled;
            updated.save(&config.settings_path)?;
            println!("Web search {}", if enabled { "enabled" } else { "disabled" });
            Ok(0)
        }
    }
}
