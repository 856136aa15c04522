//! Read-time masking of secret values
//!
//! Applied to everything that leaves the crate through a read path
//! (parameter listings, audit history, logs). It never decrypts and never
//! touches stored data.

use crate::audit::AuditRecord;
use crate::config::settings::DEFAULT_MASK;
use crate::models::Parameter;

/// A record whose value may be secret
pub trait Redactable: Clone {
    fn is_secret(&self) -> bool;
    fn value_mut(&mut self) -> &mut String;
}

impl Redactable for Parameter {
    fn is_secret(&self) -> bool {
        self.secret
    }

    fn value_mut(&mut self) -> &mut String {
        &mut self.value
    }
}

impl Redactable for AuditRecord {
    fn is_secret(&self) -> bool {
        self.secret
    }

    fn value_mut(&mut self) -> &mut String {
        &mut self.value
    }
}

/// Copy of `records` with every secret value replaced by the default mask
pub fn redact<T: Redactable>(records: &[T]) -> Vec<T> {
    redact_with(records, DEFAULT_MASK)
}

/// Copy of `records` with every secret value replaced by `mask`
///
/// A blank mask falls back to the default so the sentinel is never empty.
pub fn redact_with<T: Redactable>(records: &[T], mask: &str) -> Vec<T> {
    let mask = if mask.trim().is_empty() { DEFAULT_MASK } else { mask };

    records
        .iter()
        .map(|record| {
            let mut record = record.clone();
            if record.is_secret() {
                *record.value_mut() = mask.to_string();
            }
            record
        })
        .collect()
}
