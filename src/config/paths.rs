//! Path management for paramsync
//!
//! ## Path Resolution Order
//!
//! 1. `PARAMSYNC_DATA_DIR` environment variable (if set)
//! 2. The platform config directory from `directories`
//!    (e.g. `~/.config/paramsync` on Linux, `%APPDATA%\paramsync` on Windows)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::ParamError;

/// Environment variable that overrides the base directory
pub const DATA_DIR_ENV: &str = "PARAMSYNC_DATA_DIR";

/// Manages all paths used by paramsync
#[derive(Debug, Clone)]
pub struct ParamPaths {
    /// Base directory for all paramsync data
    base_dir: PathBuf,
}

impl ParamPaths {
    /// Create a new ParamPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, ParamError> {
        let base_dir = match std::env::var(DATA_DIR_ENV) {
            Ok(custom) if !custom.trim().is_empty() => PathBuf::from(custom),
            _ => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Create ParamPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory (current parameter state)
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the directory used by the file-backed external store
    pub fn external_dir(&self) -> PathBuf {
        self.base_dir.join("external")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the audit log
    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    /// Get the path to parameters.json
    pub fn parameters_file(&self) -> PathBuf {
        self.data_dir().join("parameters.json")
    }

    /// Default target of `sync` when no external store file is given
    pub fn external_store_file(&self) -> PathBuf {
        self.external_dir().join("store.json")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), ParamError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| ParamError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| ParamError::Io(format!("Failed to create data directory: {}", e)))?;

        std::fs::create_dir_all(self.external_dir()).map_err(|e| {
            ParamError::Io(format!("Failed to create external store directory: {}", e))
        })?;

        Ok(())
    }

    /// Check if paramsync has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

/// Resolve the default base directory for the current platform
fn resolve_default_path() -> Result<PathBuf, ParamError> {
    ProjectDirs::from("", "", "paramsync")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| ParamError::Config("Could not determine a home directory".into()))
}
