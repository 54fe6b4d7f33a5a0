mod config;
pub mod database;
mod memory;
mod snapshot;

pub use config::{Config, ExportConfig, KeysConfig, SessionConfig};
pub use database::Database;
pub use memory::MemoryStore;
pub use snapshot::{keys, PersistedStore, SCHEMA_VERSION};

use std::path::PathBuf;

use crate::error::{ConfigError, DatabaseError};

/// Durable string key/value storage.
///
/// `set_many` is the unit of persistence: implementations must apply all
/// pairs or none of them.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError>;

    fn set_many(&mut self, entries: &[(&str, String)]) -> Result<(), DatabaseError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.set_many(&[(key, value.to_string())])
    }

    /// Remove every key.
    fn clear(&mut self) -> Result<(), DatabaseError>;
}

/// Returns the data directory, creating it if needed.
///
/// `TALKTALLY_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/talktally[-dev]/`, with `TALKTALLY_ENV=dev` selecting the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("TALKTALLY_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("TALKTALLY_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("talktally-dev")
            } else {
                base_dir.join("talktally")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
