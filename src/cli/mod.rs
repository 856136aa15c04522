//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod key;
pub mod params;
pub mod sync;

pub use key::{handle_key_command, KeyCommands};
pub use params::{handle_history, handle_list, handle_orphans, handle_save, HistoryArgs, SaveArgs};
pub use sync::{handle_copy, handle_diff, handle_sync};

use std::io::IsTerminal;

use serde::Serialize;
use tracing::warn;

use crate::config::settings::Settings;
use crate::crypto::{SecretCipher, SecureString};
use crate::error::{ParamError, ParamResult};
use crate::models::Identity;

/// Environment variable holding the passphrase for non-interactive use
pub const PASSPHRASE_ENV: &str = "PARAMSYNC_PASSPHRASE";

/// Open the secret cipher for a command
///
/// With no key configured, or when `needed` is false, the cipher stays
/// locked and any secret value the command touches fails with a cipher
/// error. Otherwise the passphrase comes from `PARAMSYNC_PASSPHRASE` or an
/// interactive prompt.
pub fn open_cipher(settings: &Settings, needed: bool) -> ParamResult<SecretCipher> {
    let params = match settings.encryption.key_params.as_ref() {
        Some(params) if needed => params,
        _ => return Ok(SecretCipher::locked()),
    };

    let passphrase = match std::env::var(PASSPHRASE_ENV) {
        Ok(p) if !p.is_empty() => SecureString::new(p),
        _ if std::io::stdin().is_terminal() => prompt_passphrase("Passphrase: ")?,
        _ => {
            warn!("no passphrase available, secret values stay locked");
            return Ok(SecretCipher::locked());
        }
    };

    SecretCipher::unlock(
        &passphrase,
        params,
        settings.encryption.verification_hash.as_deref(),
    )
}

/// Prompt for a passphrase (hidden input)
pub(crate) fn prompt_passphrase(prompt: &str) -> ParamResult<SecureString> {
    rpassword::prompt_password(prompt)
        .map(SecureString::new)
        .map_err(|e| ParamError::Cipher(format!("Failed to read passphrase: {}", e)))
}

/// Actor identity from flags, falling back to one embedded in the input
pub(crate) fn resolve_identity(
    user: Option<String>,
    email: Option<String>,
    embedded: Option<Identity>,
) -> ParamResult<Identity> {
    let embedded = embedded.unwrap_or_else(|| Identity::new("", ""));
    let identity = Identity::new(
        user.unwrap_or(embedded.user_name),
        email.unwrap_or(embedded.user_email),
    );
    identity.validate()?;
    Ok(identity)
}

/// Pretty JSON to stdout
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> ParamResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
