//! Service layer for paramsync
//!
//! Business operations on top of the storage layer: reconciling change
//! batches, comparing and copying prefixes, pushing to the external store,
//! and the read-side helpers (redaction, path building, orphan detection).

pub mod copy;
pub mod diff;
pub mod orphans;
pub mod path;
pub mod reconciler;
pub mod redact;
pub mod sync;

pub use copy::{CopyEngine, CopyReport};
pub use diff::{DiffEngine, ParameterDiff};
pub use orphans::{find_orphans, Orphan, OrphanKind};
pub use path::build_path;
pub use reconciler::{ReconcileOutcome, Reconciler, UpsertOutcome};
pub use redact::{redact, redact_with, Redactable};
pub use sync::{ExternalStore, FileExternalStore, SyncClient, SyncReport, SyncStatus};
