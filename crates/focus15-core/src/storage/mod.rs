mod config;
pub mod database;

pub use config::Config;
pub use database::{Database, HistoryStats, SessionRecord};

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{ConfigError, StorageError};

pub const LEVEL_KEY: &str = "level";
pub const WINS_KEY: &str = "wins";
pub const FAILS_KEY: &str = "fails";

/// Durable integer key-value medium behind [`crate::ProgressStore`].
pub trait Storage {
    /// Read an integer. `None` when the key is absent or its value does not
    /// parse as an integer.
    fn read_int(&self, key: &str) -> Option<i64>;

    /// Write an integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn write_int(&mut self, key: &str, value: i64) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn read_int(&self, key: &str) -> Option<i64> {
        (**self).read_int(key)
    }

    fn write_int(&mut self, key: &str, value: i64) -> Result<(), StorageError> {
        (**self).write_int(key, value)
    }
}

/// In-process storage. Values are kept as text so that unparseable
/// entries behave the same way they do in the SQLite backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
}

impl MemoryStorage {
    /// Store a raw textual value, bypassing integer formatting.
    pub fn insert_raw(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

impl Storage for MemoryStorage {
    fn read_int(&self, key: &str) -> Option<i64> {
        self.values.get(key)?.trim().parse().ok()
    }

    fn write_int(&mut self, key: &str, value: i64) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Returns `~/.config/focus15[-dev]/` based on FOCUS15_ENV.
///
/// Set FOCUS15_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FOCUS15_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("focus15-dev")
    } else {
        base_dir.join("focus15")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
