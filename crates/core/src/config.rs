//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services, so
//! request handling never reads process-wide environment variables.

use crate::constants::DEFAULT_DATA_DIR;
use crate::store::LocalStore;
use crate::{RxError, RxResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `RxError::InvalidInput` if `data_dir` is empty or points at an existing file.
    pub fn new(data_dir: PathBuf) -> RxResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(RxError::InvalidInput("data directory cannot be empty".into()));
        }
        if data_dir.is_file() {
            return Err(RxError::InvalidInput(format!(
                "data directory is a file: {}",
                data_dir.display()
            )));
        }

        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Open the store rooted at the configured data directory, creating it if needed.
    pub fn open_store(&self) -> RxResult<LocalStore> {
        LocalStore::open(&self.data_dir)
    }
}

/// Resolve the data directory from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default directory.
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}
