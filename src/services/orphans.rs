//! Orphaned audit record detection
//!
//! The audit append and the parameter write are two separate commits, so a
//! failure between them leaves a record with no matching state. This sweep
//! finds keys whose latest record disagrees with the current parameter. It
//! only reports; nothing is repaired.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::audit::{AuditLog, AuditRecord, Origin};
use crate::error::ParamResult;
use crate::models::ParameterKey;
use crate::storage::ParameterStore;

/// How the latest record and the current state disagree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanKind {
    /// The record's key has no parameter at all
    MissingParameter,
    /// The parameter exists but carries a different payload
    PayloadMismatch,
}

impl std::fmt::Display for OrphanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingParameter => write!(f, "missing parameter"),
            Self::PayloadMismatch => write!(f, "payload mismatch"),
        }
    }
}

/// A key whose latest audit record was never applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Orphan {
    pub key: ParameterKey,
    pub kind: OrphanKind,
    pub recorded_at: DateTime<Utc>,
    pub origin: Origin,
}

/// Compare the latest audit record of every key with current state
pub fn find_orphans(
    parameters: &dyn ParameterStore,
    audit: &dyn AuditLog,
) -> ParamResult<Vec<Orphan>> {
    let mut latest: BTreeMap<ParameterKey, AuditRecord> = BTreeMap::new();
    for record in audit.read_all()? {
        latest.insert(record.key(), record);
    }

    let mut orphans = Vec::new();
    for (key, record) in latest {
        let kind = match parameters.get(&key)? {
            None => OrphanKind::MissingParameter,
            Some(p) if !p.same_payload(&record.value, record.secret, &record.comment) => {
                OrphanKind::PayloadMismatch
            }
            Some(_) => continue,
        };

        orphans.push(Orphan {
            key,
            kind,
            recorded_at: record.recorded_at,
            origin: record.origin,
        });
    }

    debug!(count = orphans.len(), "orphan sweep finished");
    Ok(orphans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLogger;
    use crate::models::{ChangeItem, Identity, Parameter};
    use crate::storage::ParameterRepository;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ParameterRepository, AuditLogger) {
        let temp = TempDir::new().unwrap();
        let repo = ParameterRepository::new(temp.path().join("parameters.json"));
        let audit = AuditLogger::new(temp.path().join("audit.log"));
        (temp, repo, audit)
    }

    fn record(name: &str, value: &str) -> AuditRecord {
        let change = ChangeItem::new(name, "prod", value, false, "").validate(0).unwrap();
        AuditRecord::from_change(&Identity::new("ada", "a@x"), &change)
    }

    #[test]
    fn test_consistent_state_has_no_orphans() {
        let (_temp, repo, audit) = setup();
        audit.append(&record("a", "1")).unwrap();
        audit.append(&record("a", "2")).unwrap();
        repo.insert(Parameter::new("a", "prod", "2", false, "")).unwrap();

        assert!(find_orphans(&repo, &audit).unwrap().is_empty());
    }

    #[test]
    fn test_missing_and_mismatched() {
        let (_temp, repo, audit) = setup();
        audit.append(&record("gone", "1")).unwrap();
        audit.append(&record("stale", "1")).unwrap();
        audit.append(&record("stale", "2")).unwrap();
        repo.insert(Parameter::new("stale", "prod", "1", false, "")).unwrap();

        let orphans = find_orphans(&repo, &audit).unwrap();
        assert_eq!(orphans.len(), 2);
        assert_eq!(orphans[0].key, ParameterKey::new("gone", "prod"));
        assert_eq!(orphans[0].kind, OrphanKind::MissingParameter);
        assert_eq!(orphans[1].key, ParameterKey::new("stale", "prod"));
        assert_eq!(orphans[1].kind, OrphanKind::PayloadMismatch);
    }

    #[test]
    fn test_parameters_without_records_ignored() {
        let (_temp, repo, audit) = setup();
        repo.insert(Parameter::new("manual", "prod", "1", false, "")).unwrap();
        assert!(find_orphans(&repo, &audit).unwrap().is_empty());
    }
}
