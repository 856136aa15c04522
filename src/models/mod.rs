//! Core data models for paramsync
//!
//! Parameters, their identity keys, and the change requests that mutate them.

pub mod change;
pub mod parameter;

pub use change::{ChangeItem, Identity, ValidChange};
pub use parameter::{Parameter, ParameterKey};
