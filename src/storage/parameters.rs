//! Parameter repository for JSON storage
//!
//! Manages loading and saving the current parameter table to parameters.json

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{ParamError, ParamResult};
use crate::models::{Parameter, ParameterKey};

use super::file_io::{read_json, with_exclusive_lock, write_json_atomic};
use super::ParameterStore;

/// Serializable parameter table
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct ParameterData {
    parameters: Vec<Parameter>,
}

/// Repository for parameter persistence
///
/// Reads are served from the table loaded by `load`. Each insert or update
/// takes the cross-process file lock, reloads the table from disk, applies
/// its single change and rewrites the file atomically, so writers in other
/// processes never lose rows to a stale snapshot. If the write fails the
/// in-memory change is rolled back.
pub struct ParameterRepository {
    path: PathBuf,
    data: RwLock<BTreeMap<ParameterKey, Parameter>>,
}

impl ParameterRepository {
    /// Create a new parameter repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(BTreeMap::new()),
        }
    }

    /// Load parameters from disk
    pub fn load(&self) -> ParamResult<()> {
        let mut data = self.write()?;
        self.refresh(&mut data)
    }

    /// Count parameters
    pub fn count(&self) -> ParamResult<usize> {
        Ok(self.read()?.len())
    }

    fn read(&self) -> ParamResult<RwLockReadGuard<'_, BTreeMap<ParameterKey, Parameter>>> {
        self.data
            .read()
            .map_err(|e| ParamError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> ParamResult<RwLockWriteGuard<'_, BTreeMap<ParameterKey, Parameter>>> {
        self.data
            .write()
            .map_err(|e| ParamError::Storage(format!("Failed to acquire write lock: {}", e)))
    }

    /// Replace the in-memory table with what is on disk
    fn refresh(&self, data: &mut BTreeMap<ParameterKey, Parameter>) -> ParamResult<()> {
        let file_data: ParameterData = read_json(&self.path)?;

        data.clear();
        for param in file_data.parameters {
            data.insert(param.key(), param);
        }

        Ok(())
    }

    fn persist(&self, data: &BTreeMap<ParameterKey, Parameter>) -> ParamResult<()> {
        let file_data = ParameterData {
            parameters: data.values().cloned().collect(),
        };
        write_json_atomic(&self.path, &file_data)
    }
}

impl ParameterStore for ParameterRepository {
    fn get(&self, key: &ParameterKey) -> ParamResult<Option<Parameter>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn insert(&self, parameter: Parameter) -> ParamResult<()> {
        let key = parameter.key();

        with_exclusive_lock(&self.path, || {
            let mut data = self.write()?;
            self.refresh(&mut data)?;

            if data.contains_key(&key) {
                return Err(ParamError::parameter_exists(&key));
            }

            data.insert(key.clone(), parameter);
            if let Err(e) = self.persist(&data) {
                data.remove(&key);
                return Err(e);
            }

            Ok(())
        })
    }

    fn update(&self, parameter: Parameter) -> ParamResult<()> {
        let key = parameter.key();

        with_exclusive_lock(&self.path, || {
            let mut data = self.write()?;
            self.refresh(&mut data)?;

            let previous = match data.get_mut(&key) {
                Some(existing) => std::mem::replace(existing, parameter),
                None => return Err(ParamError::parameter_not_found(&key)),
            };

            if let Err(e) = self.persist(&data) {
                data.insert(key, previous);
                return Err(e);
            }

            Ok(())
        })
    }

    fn list_by_prefix(&self, prefix: &str) -> ParamResult<Vec<Parameter>> {
        Ok(self
            .read()?
            .values()
            .filter(|p| p.prefix == prefix)
            .cloned()
            .collect())
    }

    fn list_all(&self) -> ParamResult<Vec<Parameter>> {
        Ok(self.read()?.values().cloned().collect())
    }
}
