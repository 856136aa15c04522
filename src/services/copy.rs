//! Prefix-to-prefix copy
//!
//! Replicates parameters from a source prefix into a target prefix without
//! ever overwriting: names that already exist at the target are skipped,
//! which makes repeated copies idempotent.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::audit::{AuditLog, AuditRecord};
use crate::error::{ParamError, ParamResult};
use crate::models::{Identity, ParameterKey};
use crate::storage::{ParameterStore, Storage};

use super::diff::check_prefix;

/// What a copy did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopyReport {
    /// Names inserted at the target
    pub copied: BTreeSet<String>,
    /// Names left alone because the target already had them
    pub skipped: BTreeSet<String>,
}

/// Service copying parameters between prefixes
pub struct CopyEngine<'a> {
    parameters: &'a dyn ParameterStore,
    audit: &'a dyn AuditLog,
}

impl<'a> CopyEngine<'a> {
    pub fn new(parameters: &'a dyn ParameterStore, audit: &'a dyn AuditLog) -> Self {
        Self { parameters, audit }
    }

    pub fn from_storage(storage: &'a Storage) -> Self {
        Self::new(&storage.parameters, &storage.audit)
    }

    /// Copy every parameter under `source` that `target` lacks
    ///
    /// Values are copied as stored, so secrets keep their ciphertext. Each
    /// copied parameter gets an audit record attributed to `actor`, appended
    /// before the insert. A failed append leaves the target untouched, so a
    /// retry copies the name again. An insert that loses a race after the
    /// append leaves a record that `find_orphans` reports.
    pub fn copy(&self, source: &str, target: &str, actor: &Identity) -> ParamResult<CopyReport> {
        check_prefix(source, "source")?;
        check_prefix(target, "target")?;
        if source == target {
            return Err(ParamError::InvalidInput(format!(
                "Source and target prefix are both '{}'",
                source
            )));
        }
        actor.validate()?;

        let mut report = CopyReport::default();

        for parameter in self.parameters.list_by_prefix(source)? {
            let key = ParameterKey::new(&parameter.name, target);
            let applied = report.copied.len();
            let index = applied + report.skipped.len();
            let wrap = |e: ParamError| ParamError::item(index, key.to_string(), applied, e);

            if self.parameters.get(&key).map_err(wrap)?.is_some() {
                debug!(key = %key, "target exists, skipping");
                report.skipped.insert(parameter.name);
                continue;
            }

            let copy = parameter.with_prefix(target);
            self.audit
                .append(&AuditRecord::from_copy(actor, &copy))
                .map_err(wrap)?;

            match self.parameters.insert(copy) {
                Ok(()) => {
                    report.copied.insert(parameter.name);
                }
                Err(e) if e.is_duplicate() => {
                    // Created concurrently since our lookup; still never overwrite
                    warn!(key = %key, "target created concurrently, copy record left unapplied");
                    report.skipped.insert(parameter.name);
                }
                Err(e) => return Err(wrap(e)),
            }
        }

        info!(
            source,
            target,
            copied = report.copied.len(),
            skipped = report.skipped.len(),
            "prefix copied"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditLogger, Origin};
    use crate::models::Parameter;
    use crate::services::orphans::{find_orphans, OrphanKind};
    use crate::storage::ParameterRepository;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ParameterRepository, AuditLogger) {
        let temp = TempDir::new().unwrap();
        let repo = ParameterRepository::new(temp.path().join("parameters.json"));
        let audit = AuditLogger::new(temp.path().join("audit.log"));
        (temp, repo, audit)
    }

    fn actor() -> Identity {
        Identity::new("ada", "ada@example.com")
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_copy_skips_existing_names() {
        let (_temp, repo, audit) = setup();
        repo.insert(Parameter::new("db_host", "staging", "10.0.0.1", false, "")).unwrap();
        repo.insert(Parameter::new("api_key", "staging", "v1:n:c", true, "key")).unwrap();
        repo.insert(Parameter::new("db_host", "prod", "10.1.0.1", false, "")).unwrap();

        let report = CopyEngine::new(&repo, &audit)
            .copy("staging", "prod", &actor())
            .unwrap();

        assert_eq!(report.copied, set(&["api_key"]));
        assert_eq!(report.skipped, set(&["db_host"]));

        // Existing target value untouched, copied secret keeps ciphertext
        let host = repo.get(&ParameterKey::new("db_host", "prod")).unwrap().unwrap();
        assert_eq!(host.value, "10.1.0.1");
        let key = repo.get(&ParameterKey::new("api_key", "prod")).unwrap().unwrap();
        assert_eq!(key, Parameter::new("api_key", "prod", "v1:n:c", true, "key"));

        let records = audit.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].origin, Origin::Copy);
        assert_eq!(records[0].key(), ParameterKey::new("api_key", "prod"));
        assert_eq!(records[0].username, "ada");
    }

    #[test]
    fn test_copy_is_idempotent() {
        let (_temp, repo, audit) = setup();
        repo.insert(Parameter::new("a", "staging", "1", false, "")).unwrap();
        repo.insert(Parameter::new("b", "staging", "2", false, "")).unwrap();
        let engine = CopyEngine::new(&repo, &audit);

        let first = engine.copy("staging", "prod", &actor()).unwrap();
        let second = engine.copy("staging", "prod", &actor()).unwrap();

        assert_eq!(first.copied, set(&["a", "b"]));
        assert!(second.copied.is_empty());
        assert_eq!(second.skipped, set(&["a", "b"]));
        assert_eq!(audit.read_all().unwrap().len(), 2);
    }

    /// Audit log that rejects every append
    struct UnwritableLog;

    impl AuditLog for UnwritableLog {
        fn append(&self, _: &AuditRecord) -> ParamResult<()> {
            Err(ParamError::Storage("Failed to open audit log".into()))
        }
        fn read_all(&self) -> ParamResult<Vec<AuditRecord>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_failed_audit_leaves_target_untouched_and_retry_copies() {
        let (_temp, repo, audit) = setup();
        repo.insert(Parameter::new("a", "staging", "1", false, "")).unwrap();

        let err = CopyEngine::new(&repo, &UnwritableLog)
            .copy("staging", "prod", &actor())
            .unwrap_err();
        match err {
            ParamError::Item { index, applied, .. } => {
                assert_eq!(index, 0);
                assert_eq!(applied, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(repo.get(&ParameterKey::new("a", "prod")).unwrap().is_none());

        let report = CopyEngine::new(&repo, &audit)
            .copy("staging", "prod", &actor())
            .unwrap();
        assert_eq!(report.copied, set(&["a"]));

        let records = audit.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key(), ParameterKey::new("a", "prod"));
        assert!(find_orphans(&repo, &audit).unwrap().is_empty());
    }

    /// Hides the target row from `get`, as if it were created after our lookup
    struct LateTarget(ParameterRepository);

    impl ParameterStore for LateTarget {
        fn get(&self, _: &ParameterKey) -> ParamResult<Option<Parameter>> {
            Ok(None)
        }
        fn insert(&self, p: Parameter) -> ParamResult<()> {
            self.0.insert(p)
        }
        fn update(&self, p: Parameter) -> ParamResult<()> {
            self.0.update(p)
        }
        fn list_by_prefix(&self, prefix: &str) -> ParamResult<Vec<Parameter>> {
            self.0.list_by_prefix(prefix)
        }
        fn list_all(&self) -> ParamResult<Vec<Parameter>> {
            self.0.list_all()
        }
    }

    #[test]
    fn test_lost_insert_race_is_skipped_and_reported_as_orphan() {
        let (_temp, repo, audit) = setup();
        repo.insert(Parameter::new("a", "staging", "1", false, "")).unwrap();
        repo.insert(Parameter::new("a", "prod", "9", false, "")).unwrap();
        let parameters = LateTarget(repo);

        let report = CopyEngine::new(&parameters, &audit)
            .copy("staging", "prod", &actor())
            .unwrap();

        assert!(report.copied.is_empty());
        assert_eq!(report.skipped, set(&["a"]));
        let kept = parameters.0.get(&ParameterKey::new("a", "prod")).unwrap().unwrap();
        assert_eq!(kept.value, "9");

        let orphans = find_orphans(&parameters.0, &audit).unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].kind, OrphanKind::PayloadMismatch);
    }

    #[test]
    fn test_empty_source_copies_nothing() {
        let (_temp, repo, audit) = setup();
        let report = CopyEngine::new(&repo, &audit)
            .copy("staging", "prod", &actor())
            .unwrap();
        assert_eq!(report, CopyReport::default());
    }

    #[test]
    fn test_invalid_prefixes_rejected() {
        let (_temp, repo, audit) = setup();
        let engine = CopyEngine::new(&repo, &audit);

        assert!(engine.copy("", "prod", &actor()).unwrap_err().is_validation());
        assert!(engine.copy("prod", "prod", &actor()).unwrap_err().is_client_error());
        assert!(engine
            .copy("staging", "prod", &Identity::new("", ""))
            .unwrap_err()
            .is_validation());
    }
}
