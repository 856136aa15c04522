//! Audit record data structures
//!
//! Defines the structure of audit log records and the operation that
//! produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Identity, Parameter, ParameterKey, ValidChange};

/// Operation that appended a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Submitted through a change batch
    #[default]
    Save,
    /// Replicated from another prefix
    Copy,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Save => write!(f, "SAVE"),
            Origin::Copy => write!(f, "COPY"),
        }
    }
}

/// A single audit log record
///
/// Records are never updated or deleted; file order is the only order.
/// `value` is ciphertext when `secret` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub username: String,
    pub useremail: String,
    pub name: String,
    pub prefix: String,
    pub value: String,
    pub secret: bool,
    #[serde(default)]
    pub comment: String,

    /// When the record was appended (UTC)
    pub recorded_at: DateTime<Utc>,

    /// Which operation produced the record
    #[serde(default)]
    pub origin: Origin,
}

impl AuditRecord {
    /// Record for a validated change submitted by `actor`
    ///
    /// The change must already carry ciphertext if it is secret.
    pub fn from_change(actor: &Identity, change: &ValidChange) -> Self {
        Self {
            username: actor.user_name.clone(),
            useremail: actor.user_email.clone(),
            name: change.key.name.clone(),
            prefix: change.key.prefix.clone(),
            value: change.value.clone(),
            secret: change.secret,
            comment: change.comment.clone(),
            recorded_at: Utc::now(),
            origin: Origin::Save,
        }
    }

    /// Record for a parameter copied into place by `actor`
    pub fn from_copy(actor: &Identity, parameter: &Parameter) -> Self {
        Self {
            username: actor.user_name.clone(),
            useremail: actor.user_email.clone(),
            name: parameter.name.clone(),
            prefix: parameter.prefix.clone(),
            value: parameter.value.clone(),
            secret: parameter.secret,
            comment: parameter.comment.clone(),
            recorded_at: Utc::now(),
            origin: Origin::Copy,
        }
    }

    /// The parameter key this record refers to
    pub fn key(&self) -> ParameterKey {
        ParameterKey::new(&self.name, &self.prefix)
    }

    /// Format the record for human-readable output
    ///
    /// Callers must redact the record first; this prints `value` as-is.
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {} by {} <{}>",
            self.recorded_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.origin,
            self.key(),
            self.username,
            self.useremail
        );

        output.push_str(&format!("\n  value: {}", self.value));
        if self.secret {
            output.push_str(" (secret)");
        }
        if !self.comment.is_empty() {
            output.push_str(&format!("\n  comment: {}", self.comment));
        }

        output
    }
}
