//! User settings for paramsync
//!
//! Manages encryption key parameters, external sync timeouts and the
//! redaction mask.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::paths::ParamPaths;
use crate::crypto::key_derivation::KeyDerivationParams;
use crate::error::ParamError;

/// Mask shown in place of secret values on every outward read
pub const DEFAULT_MASK: &str = "********";

/// Encryption settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EncryptionSettings {
    /// Key derivation parameters (salt, memory cost, etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_params: Option<KeyDerivationParams>,

    /// A known string encrypted with the key, used to reject wrong passphrases
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_hash: Option<String>,
}

impl EncryptionSettings {
    /// Whether a key has been configured
    pub fn is_configured(&self) -> bool {
        self.key_params.is_some()
    }
}

/// External store synchronisation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Upper bound for a single put to the external store, in milliseconds
    #[serde(default = "default_item_timeout_ms")]
    pub item_timeout_ms: u64,
}

fn default_item_timeout_ms() -> u64 {
    5000
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            item_timeout_ms: default_item_timeout_ms(),
        }
    }
}

impl SyncSettings {
    /// Per-item timeout; never zero
    pub fn item_timeout(&self) -> Duration {
        Duration::from_millis(self.item_timeout_ms.max(1))
    }
}

/// Redaction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionSettings {
    /// Sentinel shown instead of secret values
    #[serde(default = "default_mask")]
    pub mask: String,
}

fn default_mask() -> String {
    DEFAULT_MASK.to_string()
}

impl Default for RedactionSettings {
    fn default() -> Self {
        Self {
            mask: default_mask(),
        }
    }
}

impl RedactionSettings {
    /// The configured mask, or the default when blank
    pub fn mask(&self) -> &str {
        if self.mask.trim().is_empty() {
            DEFAULT_MASK
        } else {
            &self.mask
        }
    }
}

/// User settings for paramsync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Secret value encryption
    #[serde(default)]
    pub encryption: EncryptionSettings,

    /// External store synchronisation
    #[serde(default)]
    pub sync: SyncSettings,

    /// Outward read masking
    #[serde(default)]
    pub redaction: RedactionSettings,
}

fn default_schema_version() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            encryption: EncryptionSettings::default(),
            sync: SyncSettings::default(),
            redaction: RedactionSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &ParamPaths) -> Result<Self, ParamError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| ParamError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents)
                .map_err(|e| ParamError::Config(format!("Failed to parse settings file: {}", e)))?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &ParamPaths) -> Result<(), ParamError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ParamError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| ParamError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}
