//! Encryption key CLI commands
//!
//! Sets up the Argon2id parameters and verification token that secret
//! parameter values are encrypted under.

use clap::Subcommand;
use tracing::info;

use crate::config::{paths::ParamPaths, settings::Settings};
use crate::crypto::{KeyDerivationParams, SecretCipher, SecureString};
use crate::error::{ParamError, ParamResult};
use crate::storage::{ParameterStore, Storage};

use super::{prompt_passphrase, PASSPHRASE_ENV};

const MIN_PASSPHRASE_LEN: usize = 8;

/// Encryption key management commands
#[derive(Subcommand)]
pub enum KeyCommands {
    /// Configure the key secret values are encrypted under
    Init {
        /// Replace an existing key; stored secrets become unreadable
        #[arg(long)]
        force: bool,

        /// Argon2 memory cost in KiB
        #[arg(long, default_value_t = KeyDerivationParams::default().memory_cost)]
        memory_cost: u32,

        /// Argon2 iterations
        #[arg(long, default_value_t = KeyDerivationParams::default().time_cost)]
        time_cost: u32,
    },

    /// Show key configuration and verify the passphrase if one is supplied
    Status,
}

/// Handle key commands
pub fn handle_key_command(
    paths: &ParamPaths,
    settings: &mut Settings,
    storage: &Storage,
    cmd: KeyCommands,
) -> ParamResult<()> {
    match cmd {
        KeyCommands::Init {
            force,
            memory_cost,
            time_cost,
        } => {
            let mut key_params = KeyDerivationParams::new();
            key_params.memory_cost = memory_cost;
            key_params.time_cost = time_cost;
            check_cost(&key_params)?;
            init_key(paths, settings, storage, key_params, force)
        }
        KeyCommands::Status => show_status(settings, storage),
    }
}

fn secret_count(storage: &Storage) -> ParamResult<usize> {
    Ok(storage
        .parameters
        .list_all()?
        .iter()
        .filter(|p| p.secret)
        .count())
}

/// Reject costs Argon2 itself would refuse
fn check_cost(params: &KeyDerivationParams) -> ParamResult<()> {
    if params.time_cost < 1 {
        return Err(ParamError::InvalidInput(
            "--time-cost must be at least 1".to_string(),
        ));
    }
    let min_memory = 8 * params.parallelism;
    if params.memory_cost < min_memory {
        return Err(ParamError::InvalidInput(format!(
            "--memory-cost must be at least {} KiB",
            min_memory
        )));
    }
    Ok(())
}

fn init_key(
    paths: &ParamPaths,
    settings: &mut Settings,
    storage: &Storage,
    key_params: KeyDerivationParams,
    force: bool,
) -> ParamResult<()> {
    if settings.encryption.is_configured() && !force {
        println!("An encryption key is already configured.");
        println!("Use 'paramsync key init --force' to replace it.");
        return Ok(());
    }

    let secrets = secret_count(storage)?;
    if secrets > 0 && !force {
        return Err(ParamError::InvalidInput(format!(
            "{} secret parameter(s) exist; re-run with --force to replace the key anyway",
            secrets
        )));
    }

    let passphrase = new_passphrase()?;

    println!("Deriving encryption key...");
    let cipher = SecretCipher::unlock(&passphrase, &key_params, None)?;

    settings.encryption.key_params = Some(key_params);
    settings.encryption.verification_hash = Some(cipher.verification_token()?);
    settings.save(paths)?;

    info!(replaced_secrets = secrets, "encryption key configured");
    println!("Encryption key configured.");
    if secrets > 0 {
        println!(
            "WARNING: {} existing secret value(s) were encrypted under the old key.",
            secrets
        );
    }
    println!("Keep your passphrase safe - there is no recovery mechanism!");

    Ok(())
}

fn show_status(settings: &Settings, storage: &Storage) -> ParamResult<()> {
    println!("Encryption Key");
    println!("==============");

    match settings.encryption.key_params.as_ref() {
        Some(params) => {
            println!("Status: CONFIGURED");
            println!("  Algorithm: Argon2id + AES-256-GCM");
            println!("  Memory Cost: {} KiB", params.memory_cost);
            println!("  Time Cost: {} iterations", params.time_cost);
            println!("  Parallelism: {} threads", params.parallelism);

            if let Ok(passphrase) = std::env::var(PASSPHRASE_ENV) {
                let verified = SecretCipher::unlock(
                    &passphrase,
                    params,
                    settings.encryption.verification_hash.as_deref(),
                )
                .is_ok();
                println!(
                    "  {}: {}",
                    PASSPHRASE_ENV,
                    if verified { "valid" } else { "INVALID" }
                );
            }
        }
        None => {
            println!("Status: NOT CONFIGURED");
            println!("Secret parameters cannot be saved until you run 'paramsync key init'.");
        }
    }

    println!("Secret parameters: {}", secret_count(storage)?);
    Ok(())
}

/// Passphrase from the environment, or prompted twice
fn new_passphrase() -> ParamResult<SecureString> {
    if let Ok(p) = std::env::var(PASSPHRASE_ENV) {
        if p.len() < MIN_PASSPHRASE_LEN {
            return Err(ParamError::InvalidInput(format!(
                "Passphrase must be at least {} characters",
                MIN_PASSPHRASE_LEN
            )));
        }
        return Ok(SecureString::new(p));
    }

    loop {
        let first = prompt_passphrase("Enter new passphrase: ")?;
        if first.len() < MIN_PASSPHRASE_LEN {
            println!(
                "Passphrase must be at least {} characters. Please try again.",
                MIN_PASSPHRASE_LEN
            );
            continue;
        }

        let second = prompt_passphrase("Confirm passphrase: ")?;
        if first.as_str() != second.as_str() {
            println!("Passphrases do not match. Please try again.");
            continue;
        }

        return Ok(first);
    }
}
