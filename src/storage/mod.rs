//! Storage layer for paramsync
//!
//! Provides the current-state parameter table (JSON with atomic writes) and
//! wires it together with the audit log.

pub mod file_io;
pub mod parameters;

pub use file_io::{read_document, read_json, with_exclusive_lock, write_json_atomic};
pub use parameters::ParameterRepository;

use crate::audit::AuditLogger;
use crate::config::paths::ParamPaths;
use crate::error::{ParamError, ParamResult};
use crate::models::{Parameter, ParameterKey};

/// Current-state table keyed by `(name, prefix)`
///
/// Every mutating call is one atomic storage operation. The create-vs-update
/// decision belongs to callers; `insert` reports an existing key as
/// `ParamError::Duplicate` and `update` reports a missing one as `NotFound`.
pub trait ParameterStore: Send + Sync {
    fn get(&self, key: &ParameterKey) -> ParamResult<Option<Parameter>>;

    fn insert(&self, parameter: Parameter) -> ParamResult<()>;

    fn update(&self, parameter: Parameter) -> ParamResult<()>;

    /// Parameters under one prefix, sorted by name
    fn list_by_prefix(&self, prefix: &str) -> ParamResult<Vec<Parameter>>;

    /// All parameters, sorted by `(prefix, name)`
    fn list_all(&self) -> ParamResult<Vec<Parameter>>;
}

/// Main storage coordinator
pub struct Storage {
    paths: ParamPaths,
    pub parameters: ParameterRepository,
    pub audit: AuditLogger,
}

impl Storage {
    /// Create a new Storage instance
    pub fn new(paths: ParamPaths) -> Result<Self, ParamError> {
        paths.ensure_directories()?;

        Ok(Self {
            parameters: ParameterRepository::new(paths.parameters_file()),
            audit: AuditLogger::new(paths.audit_log()),
            paths,
        })
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &ParamPaths {
        &self.paths
    }

    /// Load current state from disk; the audit log is read on demand
    pub fn load_all(&mut self) -> Result<(), ParamError> {
        self.parameters.load()
    }

    /// Check if storage has been initialized
    pub fn is_initialized(&self) -> bool {
        self.paths.is_initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use tempfile::TempDir;

    #[test]
    fn test_storage_creation() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ParamPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();

        assert!(temp_dir.path().join("data").exists());
        assert!(!storage.is_initialized());
        assert_eq!(storage.parameters.count().unwrap(), 0);
        assert!(storage.audit.read_all().unwrap().is_empty());
    }
}
