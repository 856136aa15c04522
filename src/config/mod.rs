//! Configuration module for paramsync
//!
//! This module provides configuration management including:
//! - Platform-aware path resolution
//! - Settings persistence (encryption, sync, redaction)

pub mod paths;
pub mod settings;

pub use paths::ParamPaths;
pub use settings::Settings;
