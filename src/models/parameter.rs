//! Parameter model
//!
//! The current-state entity: one value per `(name, prefix)` key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a parameter
///
/// Ordered by prefix first so listings group naturally by namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParameterKey {
    /// Namespace the parameter lives under
    pub prefix: String,
    /// Parameter name within the prefix
    pub name: String,
}

impl ParameterKey {
    /// Create a key from a name and a prefix
    pub fn new(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.prefix, self.name)
    }
}

/// A stored parameter
///
/// `value` holds ciphertext when `secret` is set, plaintext otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub prefix: String,
    pub value: String,
    pub secret: bool,
    #[serde(default)]
    pub comment: String,
}

impl Parameter {
    /// Create a new parameter
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        value: impl Into<String>,
        secret: bool,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            value: value.into(),
            secret,
            comment: comment.into(),
        }
    }

    /// The identity key of this parameter
    pub fn key(&self) -> ParameterKey {
        ParameterKey::new(&self.name, &self.prefix)
    }

    /// Overwrite the mutable fields from another parameter with the same key
    ///
    /// `name` and `prefix` are identity fields and never change.
    pub fn apply(&mut self, value: impl Into<String>, secret: bool, comment: impl Into<String>) {
        self.value = value.into();
        self.secret = secret;
        self.comment = comment.into();
    }

    /// The same parameter placed under a different prefix
    pub fn with_prefix(&self, prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..self.clone()
        }
    }

    /// Whether the payload (value, secret flag, comment) matches another record's
    pub fn same_payload(&self, value: &str, secret: bool, comment: &str) -> bool {
        self.value == value && self.secret == secret && self.comment == comment
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = ParameterKey::new("db_host", "test");
        assert_eq!(key.to_string(), "/test/db_host");
    }

    #[test]
    fn test_key_orders_by_prefix_then_name() {
        let mut keys = vec![
            ParameterKey::new("b", "prod"),
            ParameterKey::new("z", "dev"),
            ParameterKey::new("a", "prod"),
        ];
        keys.sort();
        assert_eq!(keys[0], ParameterKey::new("z", "dev"));
        assert_eq!(keys[1], ParameterKey::new("a", "prod"));
        assert_eq!(keys[2], ParameterKey::new("b", "prod"));
    }

    #[test]
    fn test_apply_keeps_identity() {
        let mut param = Parameter::new("db_host", "test", "10.0.0.1", false, "primary");
        param.apply("10.0.0.2", false, "moved");

        assert_eq!(param.key(), ParameterKey::new("db_host", "test"));
        assert_eq!(param.value, "10.0.0.2");
        assert_eq!(param.comment, "moved");
    }

    #[test]
    fn test_with_prefix() {
        let param = Parameter::new("api_key", "staging", "v1:abc:def", true, "");
        let copied = param.with_prefix("prod");

        assert_eq!(copied.prefix, "prod");
        assert_eq!(copied.name, "api_key");
        assert_eq!(copied.value, param.value);
        assert!(copied.secret);
    }

    #[test]
    fn test_missing_comment_defaults_to_empty() {
        let json = r#"{"name":"a","prefix":"p","value":"v","secret":false}"#;
        let param: Parameter = serde_json::from_str(json).unwrap();
        assert_eq!(param.comment, "");
    }
}
