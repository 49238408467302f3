pub mod ai;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod history;
pub mod logging;
pub mod plan;
pub mod sorter;
pub mod utils;

use clap::Parser;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

use ai::{CredentialManager, OpenRouterClient};
use config::{Settings, SorterConfig};
use history::SessionSlot;
use sorter::FolderSorter;

/// Start logging, then load settings so their warnings reach the log.
///
/// Applies the saved model override to `config`.
fn start_logging_and_load_settings(config: &mut SorterConfig) -> (WorkerGuard, Settings) {
    if let Err(e) = std::fs::create_dir_all(&config.log_dir) {
        eprintln!("Cannot create log directory {}: {}", config.log_dir.display(), e);
    }
    let guard = logging::init_logging(&config.log_dir);

    let settings = Settings::load(&config.settings_path);
    if let Some(model) = &settings.model {
        config.model = model.clone();
    }
    (guard, settings)
}

/// Entry point for the `ai-file-sorter` binary. Returns the process exit code.
pub fn run() -> i32 {
    // Load .env file - current dir first, then the parent directory
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_path("../.env");
    }

    let cli = cli::Cli::parse();

    let mut config = SorterConfig::from_env();
    let (_log_guard, settings) = start_logging_and_load_settings(&mut config);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            return 1;
        }
    };

    let oracle = Arc::new(OpenRouterClient::new(config.api_url.clone(), config.model.clone()));
    let slot = Arc::new(SessionSlot::new(config.undo_window));
    let sorter = FolderSorter::new(config.clone(), oracle, CredentialManager::new(), slot);

    match runtime.block_on(cli::dispatch(cli.command, &config, &settings, &sorter)) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    // Installs the global subscriber; keep it the only test here that does
    #[test]
    fn test_settings_warning_reaches_log_file() {
        let dir = tempdir().unwrap();
        let mut config = SorterConfig::with_data_dir(dir.path().to_path_buf());
        fs::write(&config.settings_path, "{not json").unwrap();

        let (guard, settings) = start_logging_and_load_settings(&mut config);
        drop(guard);

        assert_eq!(settings, Settings::default());
        let logged: String = fs::read_dir(&config.log_dir)
            .unwrap()
            .map(|entry| fs::read_to_string(entry.unwrap().path()).unwrap())
            .collect();
        assert!(logged.contains("Failed to read settings"));
    }
}
