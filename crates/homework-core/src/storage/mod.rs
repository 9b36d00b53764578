mod cache;
mod config;
pub mod local;

pub use cache::{LocalCache, HOMEWORKS_KEY};
pub use config::{Config, RemoteConfig, SyncConfig};
pub use local::{JsonFileStore, LocalStore, MemoryStore};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `HOMEWORK_DATA_DIR` wins when set. Otherwise `~/.config/homework[-dev]/`,
/// where `HOMEWORK_ENV=dev` selects the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("HOMEWORK_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("HOMEWORK_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("homework-dev")
            } else {
                base_dir.join("homework")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
