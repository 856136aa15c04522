//! Display formatting for terminal output
//!
//! Renders parameters, audit history and service reports as tables. Callers
//! pass already-redacted records; nothing here decrypts or masks.

pub mod parameter;
pub mod report;

pub use parameter::{format_history, format_parameter_list};
pub use report::{format_copy_report, format_diff, format_orphans, format_sync_report};
