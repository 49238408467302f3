use keyring::Entry;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Result, SorterError};

const SERVICE_NAME: &str = "ai-file-sorter";
const KEYRING_USER: &str = "openrouter";

/// Environment variable (and `.env` key) holding the API key
pub const API_KEY_VAR: &str = "OPENROUTER_API_KEY";

/// Environment variable pointing at an extra `.env`-style file
pub const ENV_FILE_VAR: &str = "AI_SORTER_ENV_FILE";

/// Where a resolved key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    Keyring,
    EnvFile,
}

/// Resolves the OpenRouter API key.
///
/// Order: environment variable, OS keyring, then an optional `.env`-style file.
pub struct CredentialManager {
    env_var: String,
    env_file: Option<PathBuf>,
    use_keyring: bool,
}

impl Default for CredentialManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialManager {
    pub fn new() -> Self {
        Self {
            env_var: API_KEY_VAR.to_string(),
            env_file: env::var_os(ENV_FILE_VAR).map(PathBuf::from),
            use_keyring: true,
        }
    }

    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = name.into();
        self
    }

    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    /// Skip the OS keyring (headless environments, tests)
    pub fn without_keyring(mut self) -> Self {
        self.use_keyring = false;
        self
    }

    fn entry() -> Result<Entry> {
        Entry::new(SERVICE_NAME, KEYRING_USER)
            .map_err(|e| SorterError::Credential(format!("Keyring unavailable: {}", e)))
    }

    /// Find the API key, reporting where it came from
    pub fn resolve(&self) -> Result<(String, CredentialSource)> {
        if let Ok(key) = env::var(&self.env_var) {
            if !key.trim().is_empty() {
                return Ok((key.trim().to_string(), CredentialSource::Environment));
            }
        }

        if self.use_keyring {
            match Self::entry().and_then(|entry| {
                entry
                    .get_password()
                    .map_err(|e| SorterError::Credential(e.to_string()))
            }) {
                Ok(key) if !key.trim().is_empty() => {
                    tracing::debug!("Retrieved API key from keyring");
                    return Ok((key.trim().to_string(), CredentialSource::Keyring));
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "No API key in keyring"),
            }
        }

        if let Some(path) = &self.env_file {
            if let Some(key) = read_env_file(path, &self.env_var) {
                return Ok((key, CredentialSource::EnvFile));
            }
        }

        Err(SorterError::MissingCredential)
    }

    /// The API key, or `MissingCredential`
    pub fn resolve_api_key(&self) -> Result<String> {
        self.resolve().map(|(key, _)| key)
    }

    /// Check if an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.resolve().is_ok()
    }

    /// Store an API key in the OS keyring
    pub fn store_api_key(&self, api_key: &str) -> Result<()> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(SorterError::Credential("API key is empty".to_string()));
        }
        Self::entry()?
            .set_password(api_key)
            .map_err(|e| SorterError::Credential(format!("Failed to store API key: {}", e)))?;
        tracing::info!("Stored API key in keyring");
        Ok(())
    }

    /// Delete the API key from the OS keyring. Deleting a missing key is fine.
    pub fn delete_api_key(&self) -> Result<()> {
        match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                tracing::info!("Deleted API key from keyring");
                Ok(())
            }
            Err(e) => Err(SorterError::Credential(format!(
                "Failed to delete API key: {}",
                e
            ))),
        }
    }
}

/// Look up `var` in a `.env`-style file without touching the process environment
fn read_env_file(path: &Path, var: &str) -> Option<String> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Cannot read env file");
            return None;
        }
    };

    iter.filter_map(|item| item.ok())
        .find(|(key, _)| key == var)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
