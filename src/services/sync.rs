//! External store synchronisation
//!
//! Pushes every parameter under a prefix to an external hierarchical store.
//! The push is best-effort: each item succeeds or fails on its own, and a
//! failure never stops the remaining items. The external store receives
//! plaintext, so secrets are decrypted on the way out.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto::SecretCipher;
use crate::error::{ParamError, ParamResult};
use crate::models::{Parameter, ParameterKey};
use crate::storage::{read_json, with_exclusive_lock, write_json_atomic, ParameterStore};

use super::path::path_for;

/// The external store's put API
pub trait ExternalStore: Send + Sync {
    /// Write one value at `path`; the error is a human-readable reason
    fn put(&self, path: &str, value: &str) -> Result<(), String>;

    /// Cheap reachability check made once before a sync
    fn ping(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Result of pushing one parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Failure(String),
}

impl SyncStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Per-item results of one sync call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub prefix: String,
    pub results: BTreeMap<ParameterKey, SyncStatus>,
}

impl SyncReport {
    pub fn succeeded(&self) -> usize {
        self.results.values().filter(|s| s.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn is_complete(&self) -> bool {
        self.failed() == 0
    }
}

/// Client pushing parameters to an `ExternalStore`
pub struct SyncClient<'a> {
    parameters: &'a dyn ParameterStore,
    cipher: &'a SecretCipher,
    store: Arc<dyn ExternalStore>,
    item_timeout: Duration,
}

impl<'a> SyncClient<'a> {
    pub fn new(
        parameters: &'a dyn ParameterStore,
        cipher: &'a SecretCipher,
        store: Arc<dyn ExternalStore>,
        item_timeout: Duration,
    ) -> Self {
        Self {
            parameters,
            cipher,
            store,
            item_timeout,
        }
    }

    /// Push every parameter under `prefix`
    ///
    /// Fails as a whole only when the prefix holds no parameters or the
    /// store does not answer its ping. Everything else lands in the report.
    pub fn sync(&self, prefix: &str) -> ParamResult<SyncReport> {
        let parameters = self.parameters.list_by_prefix(prefix)?;
        if parameters.is_empty() {
            return Err(ParamError::ExternalSync(format!(
                "No parameters under prefix '{}'",
                prefix
            )));
        }

        self.store
            .ping()
            .map_err(|e| ParamError::ExternalSync(format!("External store unreachable: {}", e)))?;

        let mut results = BTreeMap::new();
        for parameter in parameters {
            let key = parameter.key();
            let status = match self.push(&parameter) {
                Ok(()) => {
                    debug!(key = %key, "pushed");
                    SyncStatus::Success
                }
                Err(reason) => {
                    warn!(key = %key, %reason, "push failed");
                    SyncStatus::Failure(reason)
                }
            };
            results.insert(key, status);
        }

        let report = SyncReport {
            prefix: prefix.to_string(),
            results,
        };
        info!(
            prefix,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "sync finished"
        );
        Ok(report)
    }

    fn push(&self, parameter: &Parameter) -> Result<(), String> {
        let path = path_for(&parameter.key()).map_err(|e| e.to_string())?;
        let value = Zeroizing::new(
            self.cipher
                .reveal(&parameter.value, parameter.secret)
                .map_err(|e| e.to_string())?,
        );
        self.put_with_timeout(path, value)
    }

    /// Run one put on a worker thread and give up after `item_timeout`
    ///
    /// A put that times out is not cancelled: its worker keeps running and
    /// may still write the value after the item is reported as failed. The
    /// failure reason says so.
    fn put_with_timeout(&self, path: String, value: Zeroizing<String>) -> Result<(), String> {
        let (tx, rx) = mpsc::channel();
        let store = Arc::clone(&self.store);

        thread::Builder::new()
            .name("paramsync-put".to_string())
            .spawn(move || {
                let _ = tx.send(store.put(&path, &value));
            })
            .map_err(|e| format!("Failed to start put worker: {}", e))?;

        match rx.recv_timeout(self.item_timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(format!(
                "Timed out after {} ms; the put was not cancelled and may still complete",
                self.item_timeout.as_millis()
            )),
            Err(RecvTimeoutError::Disconnected) => {
                Err("Put worker stopped without a result".to_string())
            }
        }
    }
}

/// External store kept as a JSON map of path to value
///
/// Stands in for a networked store on a single machine. Every put holds the
/// file lock across its read-modify-write, so concurrent syncs from other
/// processes keep each other's paths.
pub struct FileExternalStore {
    path: PathBuf,
}

impl FileExternalStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Everything currently stored, keyed by path
    pub fn read_all(&self) -> ParamResult<BTreeMap<String, String>> {
        read_json(&self.path)
    }
}

impl ExternalStore for FileExternalStore {
    fn put(&self, path: &str, value: &str) -> Result<(), String> {
        with_exclusive_lock(&self.path, || {
            let mut entries: BTreeMap<String, String> = read_json(&self.path)?;
            entries.insert(path.to_string(), value.to_string());
            write_json_atomic(&self.path, &entries)
        })
        .map_err(|e| e.to_string())
    }

    fn ping(&self) -> Result<(), String> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => Err(format!(
                "Directory {} does not exist",
                dir.display()
            )),
            _ => Ok(()),
        }
    }
}
