//! Audit trail for paramsync
//!
//! Every submitted change produces one record in an append-only log,
//! whether or not the matching parameter write later succeeds.
//!
//! # Architecture
//!
//! - `AuditRecord`: actor identity plus the change payload (ciphertext for
//!   secrets), a timestamp and the producing operation.
//! - `AuditLog`: the append/read seam the reconciler and copy engine use.
//! - `AuditLogger`: JSONL file implementation of `AuditLog`.
//!
//! # Example
//!
//! ```rust,ignore
//! use paramsync::audit::{AuditLog, AuditLogger, AuditRecord};
//!
//! let log = AuditLogger::new(paths.audit_log());
//! log.append(&AuditRecord::from_change(&actor, &change))?;
//! let history = log.history(&change.key)?;
//! ```

mod entry;
mod logger;

pub use entry::{AuditRecord, Origin};
pub use logger::AuditLogger;

use crate::error::ParamResult;
use crate::models::ParameterKey;

/// Append-only store of audit records
pub trait AuditLog: Send + Sync {
    /// Append one record; a single atomic write
    fn append(&self, record: &AuditRecord) -> ParamResult<()>;

    /// All records in append order
    fn read_all(&self) -> ParamResult<Vec<AuditRecord>>;

    /// The most recent `count` records, oldest first
    fn read_recent(&self, count: usize) -> ParamResult<Vec<AuditRecord>> {
        let mut all = self.read_all()?;
        let start = all.len().saturating_sub(count);
        Ok(all.split_off(start))
    }

    /// Change history of a single key in append order
    fn history(&self, key: &ParameterKey) -> ParamResult<Vec<AuditRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.name == key.name && r.prefix == key.prefix)
            .collect())
    }
}
