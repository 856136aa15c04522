//! Reconciliation service
//!
//! Applies a batch of change requests to current state plus audit history.
//! For each item, in order: encrypt the value if secret, append the audit
//! record, then create or update the parameter.
//!
//! The audit append and the parameter write are two independent commits.
//! A failure between them leaves an audit record without the matching state
//! change; `services::orphans` can report such keys. Items already processed
//! keep their effects when a later item fails.

use tracing::{debug, info, warn};

use crate::audit::{AuditLog, AuditRecord};
use crate::crypto::SecretCipher;
use crate::error::{ParamError, ParamResult};
use crate::models::{ChangeItem, Identity, Parameter, ValidChange};
use crate::storage::{ParameterStore, Storage};

/// How a parameter write was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No parameter existed for the key
    Created,
    /// An existing parameter was overwritten
    Updated,
    /// The insert lost a race to a concurrent creator and became an update
    ConflictResolved,
}

/// Result of a fully applied batch
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// One record per item, in submission order
    pub records: Vec<AuditRecord>,
    /// Parallel to `records`
    pub outcomes: Vec<UpsertOutcome>,
}

/// Service for applying change batches
pub struct Reconciler<'a> {
    parameters: &'a dyn ParameterStore,
    audit: &'a dyn AuditLog,
    cipher: &'a SecretCipher,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler over explicit collaborators
    pub fn new(
        parameters: &'a dyn ParameterStore,
        audit: &'a dyn AuditLog,
        cipher: &'a SecretCipher,
    ) -> Self {
        Self {
            parameters,
            audit,
            cipher,
        }
    }

    /// Create a reconciler over the on-disk storage
    pub fn from_storage(storage: &'a Storage, cipher: &'a SecretCipher) -> Self {
        Self::new(&storage.parameters, &storage.audit, cipher)
    }

    /// Check a whole batch without side effects
    ///
    /// Every problem in every item is reported in one error.
    pub fn validate_batch(batch: &[ChangeItem]) -> ParamResult<Vec<ValidChange>> {
        let mut valid = Vec::with_capacity(batch.len());
        let mut problems = Vec::new();

        for (index, item) in batch.iter().enumerate() {
            match item.validate(index) {
                Ok(change) => valid.push(change),
                Err(ParamError::Validation { context, fields }) => {
                    problems.extend(fields.into_iter().map(|f| format!("{}: {}", context, f)));
                }
                Err(other) => return Err(other),
            }
        }

        if problems.is_empty() {
            Ok(valid)
        } else {
            Err(ParamError::validation("batch", problems))
        }
    }

    /// Apply a batch and return the audit records it produced
    pub fn reconcile(&self, batch: &[ChangeItem], actor: &Identity) -> ParamResult<Vec<AuditRecord>> {
        Ok(self.reconcile_detailed(batch, actor)?.records)
    }

    /// Apply a batch and report how each item's parameter write was resolved
    ///
    /// Stops at the first failing item and returns `ParamError::Item`
    /// naming it; earlier items are not rolled back.
    pub fn reconcile_detailed(
        &self,
        batch: &[ChangeItem],
        actor: &Identity,
    ) -> ParamResult<ReconcileOutcome> {
        actor.validate()?;

        let mut records = Vec::with_capacity(batch.len());
        let mut outcomes = Vec::with_capacity(batch.len());

        for (index, item) in batch.iter().enumerate() {
            let change = item.validate(index).map_err(|e| {
                warn!(index, item = %item.label(), error = %e, "rejecting change item");
                ParamError::item(index, item.label(), index, e)
            })?;

            let key = change.key.to_string();
            let (record, outcome) = self.apply(change, actor).map_err(|e| {
                warn!(index, key = %key, error = %e, "change item failed");
                ParamError::item(index, key.clone(), index, e)
            })?;

            records.push(record);
            outcomes.push(outcome);
        }

        info!(
            items = records.len(),
            user = %actor.user_name,
            "batch reconciled"
        );

        Ok(ReconcileOutcome { records, outcomes })
    }

    fn apply(
        &self,
        mut change: ValidChange,
        actor: &Identity,
    ) -> ParamResult<(AuditRecord, UpsertOutcome)> {
        if change.secret {
            change.value = self.cipher.encrypt(&change.value)?;
        }

        let record = AuditRecord::from_change(actor, &change);
        self.audit.append(&record)?;
        debug!(key = %change.key, secret = change.secret, "audit record appended");

        let outcome = self.upsert(&change)?;
        debug!(key = %change.key, outcome = ?outcome, "parameter written");

        Ok((record, outcome))
    }

    /// Create-vs-update decision
    ///
    /// A uniqueness violation on insert means another writer created the key
    /// first; it is resolved as an update (last write wins).
    fn upsert(&self, change: &ValidChange) -> ParamResult<UpsertOutcome> {
        if let Some(mut existing) = self.parameters.get(&change.key)? {
            existing.apply(&change.value, change.secret, &change.comment);
            self.parameters.update(existing)?;
            return Ok(UpsertOutcome::Updated);
        }

        let parameter = Parameter::new(
            &change.key.name,
            &change.key.prefix,
            &change.value,
            change.secret,
            &change.comment,
        );

        match self.parameters.insert(parameter.clone()) {
            Ok(()) => Ok(UpsertOutcome::Created),
            Err(e) if e.is_duplicate() => {
                debug!(key = %change.key, "insert conflict, updating instead");
                self.parameters.update(parameter)?;
                Ok(UpsertOutcome::ConflictResolved)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLogger;
    use crate::crypto::DerivedKey;
    use crate::models::ParameterKey;
    use crate::services::redact::redact;
    use crate::storage::ParameterRepository;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        parameters: ParameterRepository,
        audit: AuditLogger,
        cipher: SecretCipher,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            Self {
                parameters: ParameterRepository::new(temp.path().join("parameters.json")),
                audit: AuditLogger::new(temp.path().join("audit.log")),
                cipher: SecretCipher::new(DerivedKey::from_bytes([5; 32])),
                _temp: temp,
            }
        }

        fn reconciler(&self) -> Reconciler<'_> {
            Reconciler::new(&self.parameters, &self.audit, &self.cipher)
        }
    }

    fn actor() -> Identity {
        Identity::new("ada", "ada@example.com")
    }

    /// Parameter store whose writes always fail
    struct BrokenWrites(ParameterRepository);

    impl ParameterStore for BrokenWrites {
        fn get(&self, key: &ParameterKey) -> ParamResult<Option<Parameter>> {
            self.0.get(key)
        }
        fn insert(&self, _: Parameter) -> ParamResult<()> {
            Err(ParamError::Storage("database unavailable".into()))
        }
        fn update(&self, _: Parameter) -> ParamResult<()> {
            Err(ParamError::Storage("database unavailable".into()))
        }
        fn list_by_prefix(&self, prefix: &str) -> ParamResult<Vec<Parameter>> {
            self.0.list_by_prefix(prefix)
        }
        fn list_all(&self) -> ParamResult<Vec<Parameter>> {
            self.0.list_all()
        }
    }

    /// Hides an existing row from the first `get`, as if a concurrent
    /// creator committed between our lookup and our insert
    struct LateCreator {
        inner: ParameterRepository,
        hidden: AtomicBool,
    }

    impl ParameterStore for LateCreator {
        fn get(&self, key: &ParameterKey) -> ParamResult<Option<Parameter>> {
            if self.hidden.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.get(key)
        }
        fn insert(&self, p: Parameter) -> ParamResult<()> {
            self.inner.insert(p)
        }
        fn update(&self, p: Parameter) -> ParamResult<()> {
            self.inner.update(p)
        }
        fn list_by_prefix(&self, prefix: &str) -> ParamResult<Vec<Parameter>> {
            self.inner.list_by_prefix(prefix)
        }
        fn list_all(&self) -> ParamResult<Vec<Parameter>> {
            self.inner.list_all()
        }
    }

    #[test]
    fn test_create_then_update_scenario() {
        let fx = Fixture::new();
        let key = ParameterKey::new("db_host", "test");

        let first = vec![ChangeItem::new("db_host", "test", "10.0.0.1", false, "primary")];
        let out = fx.reconciler().reconcile_detailed(&first, &actor()).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.outcomes, vec![UpsertOutcome::Created]);
        assert_eq!(fx.parameters.count().unwrap(), 1);
        assert_eq!(fx.audit.read_all().unwrap().len(), 1);

        let second = vec![ChangeItem::new("db_host", "test", "10.0.0.2", false, "primary")];
        let out = fx.reconciler().reconcile_detailed(&second, &actor()).unwrap();
        assert_eq!(out.outcomes, vec![UpsertOutcome::Updated]);

        assert_eq!(fx.parameters.count().unwrap(), 1);
        assert_eq!(fx.parameters.get(&key).unwrap().unwrap().value, "10.0.0.2");
        assert_eq!(fx.audit.history(&key).unwrap().len(), 2);
    }

    #[test]
    fn test_same_submission_twice_is_idempotent_on_state() {
        let fx = Fixture::new();
        let batch = vec![ChangeItem::new("db_host", "test", "10.0.0.1", false, "primary")];

        fx.reconciler().reconcile(&batch, &actor()).unwrap();
        fx.reconciler().reconcile(&batch, &actor()).unwrap();

        let params = fx.parameters.list_all().unwrap();
        assert_eq!(params, vec![Parameter::new("db_host", "test", "10.0.0.1", false, "primary")]);
        assert_eq!(fx.audit.read_all().unwrap().len(), 2);
    }

    #[test]
    fn test_one_record_per_item_in_order() {
        let fx = Fixture::new();
        let batch: Vec<_> = (0..5)
            .map(|i| ChangeItem::new(format!("p{}", i), "test", "v", false, ""))
            .collect();

        let records = fx.reconciler().reconcile(&batch, &actor()).unwrap();

        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["p0", "p1", "p2", "p3", "p4"]);
        let logged: Vec<_> = fx.audit.read_all().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(logged, names);
    }

    #[test]
    fn test_secret_stored_encrypted_and_redacted() {
        let fx = Fixture::new();
        let batch = vec![ChangeItem::new("api_key", "prod", "xyz", true, "")];

        let records = fx.reconciler().reconcile(&batch, &actor()).unwrap();

        let stored = fx
            .parameters
            .get(&ParameterKey::new("api_key", "prod"))
            .unwrap()
            .unwrap();
        assert_ne!(stored.value, "xyz");
        assert_eq!(fx.cipher.decrypt(&stored.value).unwrap(), "xyz");
        assert_ne!(records[0].value, "xyz");

        let shown = redact(&fx.parameters.list_all().unwrap());
        assert_ne!(shown[0].value, "xyz");
        assert_ne!(shown[0].value, stored.value);
    }

    #[test]
    fn test_secret_without_key_fails_before_any_write() {
        let temp = TempDir::new().unwrap();
        let parameters = ParameterRepository::new(temp.path().join("p.json"));
        let audit = AuditLogger::new(temp.path().join("audit.log"));
        let cipher = SecretCipher::locked();
        let reconciler = Reconciler::new(&parameters, &audit, &cipher);

        let batch = vec![
            ChangeItem::new("db_host", "prod", "10.0.0.1", false, ""),
            ChangeItem::new("api_key", "prod", "xyz", true, ""),
        ];
        let err = reconciler.reconcile(&batch, &actor()).unwrap_err();

        match err {
            ParamError::Item { index, applied, source, .. } => {
                assert_eq!(index, 1);
                assert_eq!(applied, 1);
                assert!(matches!(*source, ParamError::Cipher(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        // The first item keeps its effects, the secret left no trace
        assert_eq!(parameters.count().unwrap(), 1);
        assert_eq!(audit.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_field_aborts_remaining_items() {
        let fx = Fixture::new();
        let mut broken = ChangeItem::new("b", "test", "v", false, "");
        broken.comment = None;
        let batch = vec![
            ChangeItem::new("a", "test", "v", false, ""),
            broken,
            ChangeItem::new("c", "test", "v", false, ""),
        ];

        let err = fx.reconciler().reconcile(&batch, &actor()).unwrap_err();

        assert!(err.is_validation());
        assert!(err.to_string().contains("comment"));
        let names: Vec<_> = fx.parameters.list_all().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["a"]);
        assert_eq!(fx.audit.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_validate_batch_reports_every_item() {
        let mut first = ChangeItem::new("a", "test", "v", false, "");
        first.value = None;
        let mut third = ChangeItem::new("c", "", "v", false, "");
        third.secret = None;
        let batch = vec![first, ChangeItem::new("b", "test", "v", false, ""), third];

        let err = Reconciler::validate_batch(&batch).unwrap_err();
        let msg = err.to_string();

        assert!(msg.contains("item 0: value"));
        assert!(msg.contains("item 2: prefix (empty)"));
        assert!(msg.contains("item 2: secret"));
        assert!(!msg.contains("item 1"));
    }

    #[test]
    fn test_blank_identity_rejected() {
        let fx = Fixture::new();
        let batch = vec![ChangeItem::new("a", "test", "v", false, "")];
        let err = fx
            .reconciler()
            .reconcile(&batch, &Identity::new("", "a@x"))
            .unwrap_err();

        assert!(err.is_client_error());
        assert_eq!(fx.audit.read_all().unwrap().len(), 0);
    }

    #[test]
    fn test_audit_appended_even_when_write_fails() {
        let temp = TempDir::new().unwrap();
        let parameters = BrokenWrites(ParameterRepository::new(temp.path().join("p.json")));
        let audit = AuditLogger::new(temp.path().join("audit.log"));
        let cipher = SecretCipher::locked();
        let reconciler = Reconciler::new(&parameters, &audit, &cipher);

        let batch = vec![ChangeItem::new("db_host", "test", "10.0.0.1", false, "")];
        let err = reconciler.reconcile(&batch, &actor()).unwrap_err();

        assert!(!err.is_client_error());
        assert_eq!(audit.read_all().unwrap().len(), 1);
        assert!(parameters.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_insert_conflict_resolved_as_update() {
        let temp = TempDir::new().unwrap();
        let inner = ParameterRepository::new(temp.path().join("p.json"));
        inner
            .insert(Parameter::new("db_host", "test", "old", false, ""))
            .unwrap();
        let parameters = LateCreator {
            inner,
            hidden: AtomicBool::new(true),
        };
        let audit = AuditLogger::new(temp.path().join("audit.log"));
        let cipher = SecretCipher::locked();
        let reconciler = Reconciler::new(&parameters, &audit, &cipher);

        let batch = vec![ChangeItem::new("db_host", "test", "new", false, "winner")];
        let out = reconciler.reconcile_detailed(&batch, &actor()).unwrap();

        assert_eq!(out.outcomes, vec![UpsertOutcome::ConflictResolved]);
        let stored = parameters.list_all().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].value, "new");
        assert_eq!(stored[0].comment, "winner");
    }

    #[test]
    fn test_stale_repository_resolves_conflict_as_update() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("p.json");
        let first = ParameterRepository::new(path.clone());
        let second = ParameterRepository::new(path.clone());
        first.load().unwrap();
        second.load().unwrap();
        let audit = AuditLogger::new(temp.path().join("audit.log"));
        let cipher = SecretCipher::locked();

        Reconciler::new(&first, &audit, &cipher)
            .reconcile(&[ChangeItem::new("db_host", "test", "a", false, "")], &actor())
            .unwrap();
        let out = Reconciler::new(&second, &audit, &cipher)
            .reconcile_detailed(
                &[
                    ChangeItem::new("db_host", "test", "b", false, ""),
                    ChangeItem::new("api_url", "test", "c", false, ""),
                ],
                &actor(),
            )
            .unwrap();

        assert_eq!(out.outcomes, vec![UpsertOutcome::ConflictResolved, UpsertOutcome::Created]);
        let fresh = ParameterRepository::new(path);
        fresh.load().unwrap();
        let stored: Vec<_> = fresh
            .list_all()
            .unwrap()
            .into_iter()
            .map(|p| (p.name, p.value))
            .collect();
        assert_eq!(
            stored,
            vec![
                ("api_url".to_string(), "c".to_string()),
                ("db_host".to_string(), "b".to_string())
            ]
        );
    }

    #[test]
    fn test_concurrent_writers_last_write_wins() {
        let fx = Fixture::new();
        let writers = 8;

        std::thread::scope(|scope| {
            for i in 0..writers {
                let fx = &fx;
                scope.spawn(move || {
                    let batch = vec![ChangeItem::new(
                        "db_host",
                        "test",
                        format!("10.0.0.{}", i),
                        false,
                        "",
                    )];
                    fx.reconciler().reconcile(&batch, &actor()).unwrap();
                });
            }
        });

        // No locking or versioning: exactly one row survives, holding one of
        // the submitted values, and every other write is lost
        let params = fx.parameters.list_all().unwrap();
        assert_eq!(params.len(), 1);
        let submitted: Vec<_> = (0..writers).map(|i| format!("10.0.0.{}", i)).collect();
        assert!(submitted.contains(&params[0].value));
        assert_eq!(fx.audit.read_all().unwrap().len(), writers);
    }
}
