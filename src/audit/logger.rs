//! Audit logger for the append-only audit trail
//!
//! Provides the AuditLogger struct that writes audit records to a log file.
//! Each record is written as a single JSON line and flushed immediately.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{ParamError, ParamResult};

use super::entry::AuditRecord;
use super::AuditLog;

/// Handles writing audit records to the audit log file
///
/// The log file uses a line-delimited JSON format (JSONL) where each line
/// is a complete JSON object representing one record.
pub struct AuditLogger {
    /// Path to the audit log file
    log_path: PathBuf,
    /// Serialises appends so concurrent writers never interleave lines
    write_lock: Mutex<()>,
}

impl AuditLogger {
    /// Create a new AuditLogger that writes to the specified path
    pub fn new(log_path: PathBuf) -> Self {
        Self {
            log_path,
            write_lock: Mutex::new(()),
        }
    }

    /// Get the number of records in the audit log
    pub fn entry_count(&self) -> ParamResult<usize> {
        if !self.log_path.exists() {
            return Ok(0);
        }

        let file = File::open(&self.log_path)
            .map_err(|e| ParamError::Storage(format!("Failed to open audit log: {}", e)))?;

        let reader = BufReader::new(file);
        let count = reader
            .lines()
            .filter_map(|l| l.ok())
            .filter(|l| !l.trim().is_empty())
            .count();

        Ok(count)
    }
}

impl AuditLog for AuditLogger {
    /// Append a record as one JSON line
    ///
    /// The whole line goes out in a single write, then the file is flushed.
    fn append(&self, record: &AuditRecord) -> ParamResult<()> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| ParamError::Json(format!("Failed to serialize audit record: {}", e)))?;
        line.push('\n');

        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| ParamError::Storage(format!("Failed to acquire audit lock: {}", e)))?;

        if let Some(parent) = self.log_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ParamError::Storage(format!("Failed to create audit log directory: {}", e))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| ParamError::Storage(format!("Failed to open audit log: {}", e)))?;

        file.write_all(line.as_bytes())
            .map_err(|e| ParamError::Storage(format!("Failed to write audit record: {}", e)))?;

        file.flush()
            .map_err(|e| ParamError::Storage(format!("Failed to flush audit log: {}", e)))?;

        Ok(())
    }

    /// Read all audit records from the log file
    ///
    /// Returns records in append order (oldest first).
    fn read_all(&self) -> ParamResult<Vec<AuditRecord>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .map_err(|e| ParamError::Storage(format!("Failed to open audit log: {}", e)))?;

        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| {
                ParamError::Storage(format!(
                    "Failed to read audit log line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;

            // Skip empty lines
            if line.trim().is_empty() {
                continue;
            }

            let record: AuditRecord = serde_json::from_str(&line).map_err(|e| {
                ParamError::Json(format!(
                    "Failed to parse audit record at line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;

            records.push(record);
        }

        Ok(records)
    }
}
