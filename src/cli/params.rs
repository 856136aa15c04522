//! Parameter CLI commands
//!
//! Submitting change batches and the redacted read paths.

use std::path::PathBuf;

use clap::Args;
use serde::Deserialize;

use crate::audit::AuditLog;
use crate::config::settings::Settings;
use crate::display::{format_history, format_orphans, format_parameter_list};
use crate::error::{ParamError, ParamResult};
use crate::models::{ChangeItem, Identity, ParameterKey};
use crate::services::{find_orphans, redact_with, Reconciler};
use crate::storage::{read_document, ParameterStore, Storage};

use super::{open_cipher, print_json, resolve_identity};

/// Arguments for `save`
#[derive(Args)]
pub struct SaveArgs {
    /// JSON or YAML file: a list of items, or `{userInfo, parameters}`
    pub file: PathBuf,

    /// Submitting user's name (overrides userInfo in the file)
    #[arg(short, long, env = "PARAMSYNC_USER")]
    pub user: Option<String>,

    /// Submitting user's email (overrides userInfo in the file)
    #[arg(short, long, env = "PARAMSYNC_EMAIL")]
    pub email: Option<String>,

    /// Skip upfront validation; items before an invalid one are still applied
    #[arg(long)]
    pub no_precheck: bool,

    /// Print the audit records as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `history`
#[derive(Args)]
pub struct HistoryArgs {
    /// Only records under this prefix
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Only records for this name (requires --prefix)
    #[arg(short, long, requires = "prefix")]
    pub name: Option<String>,

    /// Show at most this many of the most recent records
    #[arg(short, long)]
    pub limit: Option<usize>,

    #[arg(long)]
    pub json: bool,
}

/// Accepted shapes of a batch file
#[derive(Deserialize)]
#[serde(untagged)]
enum BatchFile {
    Items(Vec<ChangeItem>),
    WithIdentity {
        #[serde(rename = "userInfo", default)]
        user_info: Option<Identity>,
        parameters: Vec<ChangeItem>,
    },
}

impl BatchFile {
    fn into_parts(self) -> (Option<Identity>, Vec<ChangeItem>) {
        match self {
            Self::Items(items) => (None, items),
            Self::WithIdentity {
                user_info,
                parameters,
            } => (user_info, parameters),
        }
    }
}

/// Reconcile a batch file and print the redacted audit records
pub fn handle_save(storage: &Storage, settings: &Settings, args: SaveArgs) -> ParamResult<()> {
    let batch: BatchFile = read_document(&args.file)?;
    let (embedded, items) = batch.into_parts();
    let actor = resolve_identity(args.user, args.email, embedded)?;

    if items.is_empty() {
        return Err(ParamError::InvalidInput(format!(
            "{} contains no parameters",
            args.file.display()
        )));
    }

    if !args.no_precheck {
        Reconciler::validate_batch(&items)?;
    }

    let needs_key = items.iter().any(|item| item.secret == Some(true));
    let cipher = open_cipher(settings, needs_key)?;

    let records = Reconciler::from_storage(storage, &cipher).reconcile(&items, &actor)?;
    let records = redact_with(&records, settings.redaction.mask());

    if args.json {
        print_json(&records)
    } else {
        println!("{}", format_history(&records));
        println!("Saved {} parameter(s).", records.len());
        Ok(())
    }
}

/// List current parameters, secrets masked
pub fn handle_list(
    storage: &Storage,
    settings: &Settings,
    prefix: Option<String>,
    json: bool,
) -> ParamResult<()> {
    let parameters = match prefix.as_deref() {
        Some(prefix) => storage.parameters.list_by_prefix(prefix)?,
        None => storage.parameters.list_all()?,
    };
    let parameters = redact_with(&parameters, settings.redaction.mask());

    if json {
        print_json(&parameters)
    } else {
        println!("{}", format_parameter_list(&parameters));
        Ok(())
    }
}

/// Show audit history, secrets masked
pub fn handle_history(storage: &Storage, settings: &Settings, args: HistoryArgs) -> ParamResult<()> {
    let mut records = match (&args.prefix, &args.name) {
        (Some(prefix), Some(name)) => storage.audit.history(&ParameterKey::new(name, prefix))?,
        (Some(prefix), None) => storage
            .audit
            .read_all()?
            .into_iter()
            .filter(|r| &r.prefix == prefix)
            .collect(),
        _ => storage.audit.read_all()?,
    };

    if let Some(limit) = args.limit {
        let start = records.len().saturating_sub(limit);
        records.drain(..start);
    }
    let records = redact_with(&records, settings.redaction.mask());

    if args.json {
        print_json(&records)
    } else {
        println!("{}", format_history(&records));
        Ok(())
    }
}

/// Report keys whose latest audit record was never applied
pub fn handle_orphans(storage: &Storage, json: bool) -> ParamResult<()> {
    let orphans = find_orphans(&storage.parameters, &storage.audit)?;

    if json {
        print_json(&orphans)
    } else {
        println!("{}", format_orphans(&orphans));
        Ok(())
    }
}
