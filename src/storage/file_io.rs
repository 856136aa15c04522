//! File I/O utilities with atomic writes
//!
//! Provides safe file operations that won't corrupt data on failure. Every
//! write of the parameter table and of the file-backed external store goes
//! through `write_json_atomic`, so a reader never sees a half-written file.
//! Read-modify-write cycles across processes are serialised with
//! `with_exclusive_lock`.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use fs2::FileExt;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::ParamError;

/// Distinguishes temp files of concurrent writers in the same process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Read JSON from a file, returning a default value if file doesn't exist
pub fn read_json<T, P>(path: P) -> Result<T, ParamError>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Ok(T::default());
    }

    let file = File::open(path)
        .map_err(|e| ParamError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;

    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ParamError::Storage(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Read a caller-supplied document, choosing YAML or JSON by file extension
///
/// Unlike `read_json`, a missing file is an input error, and parse failures
/// are reported as invalid input rather than storage failures.
pub fn read_document<T, P>(path: P) -> Result<T, ParamError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    let contents = fs::read_to_string(path).map_err(|e| {
        ParamError::InvalidInput(format!("Cannot read {}: {}", path.display(), e))
    })?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    if is_yaml {
        serde_yaml::from_str(&contents).map_err(|e| {
            ParamError::InvalidInput(format!("Invalid YAML in {}: {}", path.display(), e))
        })
    } else {
        serde_json::from_str(&contents).map_err(|e| {
            ParamError::InvalidInput(format!("Invalid JSON in {}: {}", path.display(), e))
        })
    }
}

/// Write JSON to a file atomically (write to temp, then rename)
///
/// The file is either completely written or not modified at all.
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), ParamError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ParamError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    // Same directory as the target, so the rename stays on one filesystem
    let temp_path = temp_path_for(path);

    let result = write_then_rename(&temp_path, path, data);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Run `f` while holding an exclusive advisory lock on `<path>.lock`
///
/// The lock is taken on a sibling file because `path` itself is replaced by
/// rename on every write. Blocks until other holders, in this or another
/// process, release it.
pub fn with_exclusive_lock<P, R, F>(path: P, f: F) -> Result<R, ParamError>
where
    P: AsRef<Path>,
    F: FnOnce() -> Result<R, ParamError>,
{
    let lock_path = lock_path_for(path.as_ref());

    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ParamError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let lock_file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| {
            ParamError::Storage(format!("Failed to open {}: {}", lock_path.display(), e))
        })?;

    FileExt::lock_exclusive(&lock_file).map_err(|e| {
        ParamError::Storage(format!("Failed to lock {}: {}", lock_path.display(), e))
    })?;

    let result = f();

    // Closing the file releases the lock as well
    let _ = FileExt::unlock(&lock_file);
    result
}

fn lock_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    path.with_file_name(format!("{}.lock", file_name))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let file_name = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    path.with_file_name(format!(".{}.{}.{}.tmp", file_name, std::process::id(), n))
}

fn write_then_rename<T: Serialize>(temp_path: &Path, path: &Path, data: &T) -> Result<(), ParamError> {
    let file = File::create(temp_path)
        .map_err(|e| ParamError::Storage(format!("Failed to create temp file: {}", e)))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| ParamError::Storage(format!("Failed to serialize data: {}", e)))?;

    writer
        .flush()
        .map_err(|e| ParamError::Storage(format!("Failed to flush data: {}", e)))?;

    writer
        .get_ref()
        .sync_all()
        .map_err(|e| ParamError::Storage(format!("Failed to sync data: {}", e)))?;

    fs::rename(temp_path, path)
        .map_err(|e| ParamError::Storage(format!("Failed to rename temp file: {}", e)))
}
