//! Cross-prefix and external store CLI commands

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::settings::Settings;
use crate::display::{format_copy_report, format_diff, format_sync_report};
use crate::error::{ParamError, ParamResult};
use crate::services::{CopyEngine, DiffEngine, FileExternalStore, SyncClient};
use crate::storage::{ParameterStore, Storage};

use super::{open_cipher, print_json, resolve_identity};

fn has_secrets(storage: &Storage, prefixes: &[&str]) -> ParamResult<bool> {
    for prefix in prefixes {
        if storage
            .parameters
            .list_by_prefix(prefix)?
            .iter()
            .any(|p| p.secret)
        {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Push a prefix to the file-backed external store
///
/// Exits with an error when any item failed so scripts notice partial syncs.
pub fn handle_sync(
    storage: &Storage,
    settings: &Settings,
    prefix: &str,
    target: Option<PathBuf>,
) -> ParamResult<()> {
    let target = target.unwrap_or_else(|| storage.paths().external_store_file());
    let store = Arc::new(FileExternalStore::new(target));
    let cipher = open_cipher(settings, has_secrets(storage, &[prefix])?)?;

    let report = SyncClient::new(
        &storage.parameters,
        &cipher,
        store,
        settings.sync.item_timeout(),
    )
    .sync(prefix)?;

    println!("{}", format_sync_report(&report));

    if report.is_complete() {
        Ok(())
    } else {
        Err(ParamError::ExternalSync(format!(
            "{} of {} parameter(s) failed to sync",
            report.failed(),
            report.results.len()
        )))
    }
}

/// Compare two prefixes
pub fn handle_diff(
    storage: &Storage,
    settings: &Settings,
    prefix_a: &str,
    prefix_b: &str,
    json: bool,
) -> ParamResult<()> {
    let cipher = open_cipher(settings, has_secrets(storage, &[prefix_a, prefix_b])?)?;
    let diff = DiffEngine::new(&storage.parameters, &cipher).diff(prefix_a, prefix_b)?;

    if json {
        print_json(&diff)
    } else {
        println!("{}", format_diff(prefix_a, prefix_b, &diff));
        Ok(())
    }
}

/// Copy missing parameters from one prefix to another
pub fn handle_copy(
    storage: &Storage,
    source: &str,
    target: &str,
    user: Option<String>,
    email: Option<String>,
    json: bool,
) -> ParamResult<()> {
    let actor = resolve_identity(user, email, None)?;
    let report = CopyEngine::from_storage(storage).copy(source, target, &actor)?;

    if json {
        print_json(&report)
    } else {
        println!("{}", format_copy_report(source, target, &report));
        Ok(())
    }
}
