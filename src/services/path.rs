//! External store path building

use crate::error::{ParamError, ParamResult};
use crate::models::ParameterKey;

/// Map a prefix and name to the external store's hierarchical path
///
/// Always `"/" + prefix + "/" + name`. Empty segments are rejected because
/// they would collapse the hierarchy.
pub fn build_path(prefix: &str, name: &str) -> ParamResult<String> {
    if prefix.is_empty() {
        return Err(ParamError::Path(format!(
            "Empty prefix for parameter '{}'",
            name
        )));
    }
    if name.is_empty() {
        return Err(ParamError::Path(format!(
            "Empty name under prefix '{}'",
            prefix
        )));
    }

    Ok(format!("/{}/{}", prefix, name))
}

/// `build_path` for a parameter key
pub fn path_for(key: &ParameterKey) -> ParamResult<String> {
    build_path(&key.prefix, &key.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_path() {
        assert_eq!(build_path("test", "db_host").unwrap(), "/test/db_host");
    }

    #[test]
    fn test_segments_are_taken_verbatim() {
        for (prefix, name) in [("a", "b"), ("svc/api", "key"), (" ", "x"), ("prod", "API_KEY")] {
            assert_eq!(
                build_path(prefix, name).unwrap(),
                format!("/{}/{}", prefix, name)
            );
        }
    }

    #[test]
    fn test_empty_segments_rejected() {
        assert!(matches!(build_path("", "db_host"), Err(ParamError::Path(_))));
        assert!(matches!(build_path("test", ""), Err(ParamError::Path(_))));
        assert!(matches!(build_path("", ""), Err(ParamError::Path(_))));
    }

    #[test]
    fn test_path_for_key() {
        let key = ParameterKey::new("api_key", "prod");
        assert_eq!(path_for(&key).unwrap(), "/prod/api_key");
    }
}
