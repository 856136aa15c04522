//! Prefix comparison
//!
//! Computes which names were added, removed or changed between two prefixes.
//! Secret values are compared as plaintext because encryption is not
//! deterministic: two ciphertexts of the same value differ.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::crypto::SecretCipher;
use crate::error::{ParamError, ParamResult};
use crate::models::Parameter;
use crate::storage::ParameterStore;

/// Names that differ between a base prefix and another prefix
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParameterDiff {
    /// Present under the second prefix only
    pub added: BTreeSet<String>,
    /// Present under the first prefix only
    pub removed: BTreeSet<String>,
    /// Present under both with a different value, secret flag or comment
    pub changed: BTreeSet<String>,
}

impl ParameterDiff {
    /// True when both prefixes hold identical parameters
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// The diff seen from the other side
    pub fn reversed(&self) -> Self {
        Self {
            added: self.removed.clone(),
            removed: self.added.clone(),
            changed: self.changed.clone(),
        }
    }
}

/// Service comparing two prefixes of the parameter store
pub struct DiffEngine<'a> {
    parameters: &'a dyn ParameterStore,
    cipher: &'a SecretCipher,
}

impl<'a> DiffEngine<'a> {
    pub fn new(parameters: &'a dyn ParameterStore, cipher: &'a SecretCipher) -> Self {
        Self { parameters, cipher }
    }

    /// Compare `prefix_a` (base) with `prefix_b`
    pub fn diff(&self, prefix_a: &str, prefix_b: &str) -> ParamResult<ParameterDiff> {
        check_prefix(prefix_a, "prefix A")?;
        check_prefix(prefix_b, "prefix B")?;

        let a = by_name(self.parameters.list_by_prefix(prefix_a)?);
        let b = by_name(self.parameters.list_by_prefix(prefix_b)?);

        let mut diff = ParameterDiff::default();

        for (name, left) in &a {
            match b.get(name) {
                None => {
                    diff.removed.insert(name.clone());
                }
                Some(right) => {
                    if !self.same(left, right)? {
                        diff.changed.insert(name.clone());
                    }
                }
            }
        }

        diff.added = b
            .keys()
            .filter(|name| !a.contains_key(*name))
            .cloned()
            .collect();

        debug!(
            prefix_a,
            prefix_b,
            added = diff.added.len(),
            removed = diff.removed.len(),
            changed = diff.changed.len(),
            "prefixes compared"
        );

        Ok(diff)
    }

    fn same(&self, left: &Parameter, right: &Parameter) -> ParamResult<bool> {
        if left.secret != right.secret || left.comment != right.comment {
            return Ok(false);
        }
        if left.value == right.value {
            return Ok(true);
        }
        if !left.secret {
            return Ok(false);
        }

        let l = self.cipher.decrypt(&left.value)?;
        let r = self.cipher.decrypt(&right.value)?;
        Ok(l == r)
    }
}

fn by_name(parameters: Vec<Parameter>) -> BTreeMap<String, Parameter> {
    parameters.into_iter().map(|p| (p.name.clone(), p)).collect()
}

pub(crate) fn check_prefix(prefix: &str, field: &str) -> ParamResult<()> {
    if prefix.trim().is_empty() {
        return Err(ParamError::validation("prefixes", vec![format!("{} (empty)", field)]));
    }
    Ok(())
}
