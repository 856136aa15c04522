//! Change requests and actor identity
//!
//! Incoming items are decoded with every field optional so that a missing
//! field can be reported by name instead of failing the whole decode.

use serde::{Deserialize, Serialize};

use crate::error::{ParamError, ParamResult};

use super::parameter::ParameterKey;

/// Who submitted a batch
///
/// Not authenticated here; the caller is trusted to have done that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "userEmail")]
    pub user_email: String,
}

impl Identity {
    pub fn new(user_name: impl Into<String>, user_email: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            user_email: user_email.into(),
        }
    }

    /// Reject identities with blank fields
    pub fn validate(&self) -> ParamResult<()> {
        let mut missing = Vec::new();
        if self.user_name.trim().is_empty() {
            missing.push("userName".to_string());
        }
        if self.user_email.trim().is_empty() {
            missing.push("userEmail".to_string());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ParamError::validation("identity", missing))
        }
    }
}

/// A change request as submitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ChangeItem {
    /// Build a complete change item
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        value: impl Into<String>,
        secret: bool,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            prefix: Some(prefix.into()),
            value: Some(value.into()),
            secret: Some(secret),
            comment: Some(comment.into()),
        }
    }

    /// Best-effort label for error messages, even when fields are missing
    pub fn label(&self) -> String {
        format!(
            "/{}/{}",
            self.prefix.as_deref().unwrap_or("?"),
            self.name.as_deref().unwrap_or("?")
        )
    }

    /// Check every field before any side effect happens
    ///
    /// All problems are collected so the error names each missing field.
    /// Blank `name` or `prefix` is invalid because it would collapse the
    /// external path hierarchy.
    pub fn validate(&self, index: usize) -> ParamResult<ValidChange> {
        let mut fields = Vec::new();

        match self.name.as_deref() {
            None => fields.push("name".to_string()),
            Some(n) if n.trim().is_empty() => fields.push("name (empty)".to_string()),
            Some(_) => {}
        }
        match self.prefix.as_deref() {
            None => fields.push("prefix".to_string()),
            Some(p) if p.trim().is_empty() => fields.push("prefix (empty)".to_string()),
            Some(_) => {}
        }
        if self.value.is_none() {
            fields.push("value".to_string());
        }
        if self.secret.is_none() {
            fields.push("secret".to_string());
        }
        if self.comment.is_none() {
            fields.push("comment".to_string());
        }

        match (&self.name, &self.prefix, &self.value, self.secret, &self.comment) {
            (Some(name), Some(prefix), Some(value), Some(secret), Some(comment))
                if fields.is_empty() =>
            {
                Ok(ValidChange {
                    key: ParameterKey::new(name, prefix),
                    value: value.clone(),
                    secret,
                    comment: comment.clone(),
                })
            }
            _ => Err(ParamError::validation(format!("item {}", index), fields)),
        }
    }
}

/// A change item whose fields are all present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidChange {
    pub key: ParameterKey,
    pub value: String,
    pub secret: bool,
    pub comment: String,
}
