//! paramsync - parameter and secret reconciliation
//!
//! This library provides the core of the paramsync tool: a store of
//! namespaced configuration parameters, an append-only audit trail of every
//! submitted change, at-rest encryption of secret values, and services to
//! compare, copy and push prefixes to an external hierarchical store.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `logging`: `tracing` subscriber setup for the binary
//! - `models`: Parameters, keys, change items and actor identity
//! - `crypto`: AES-256-GCM secret cipher with Argon2id key derivation
//! - `storage`: JSON current-state storage with atomic writes
//! - `audit`: Append-only JSONL audit log
//! - `services`: Reconciler, diff, copy, sync, redaction, path building
//! - `display`: Table formatting for the CLI
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use paramsync::config::paths::ParamPaths;
//! use paramsync::crypto::SecretCipher;
//! use paramsync::models::{ChangeItem, Identity};
//! use paramsync::services::Reconciler;
//! use paramsync::storage::Storage;
//!
//! let mut storage = Storage::new(ParamPaths::new()?)?;
//! storage.load_all()?;
//!
//! let cipher = SecretCipher::locked();
//! let batch = vec![ChangeItem::new("db_host", "test", "10.0.0.1", false, "primary")];
//! let actor = Identity::new("ada", "ada@example.com");
//! let records = Reconciler::from_storage(&storage, &cipher).reconcile(&batch, &actor)?;
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod display;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{ParamError, ParamResult};
