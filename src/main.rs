use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use paramsync::cli::{
    handle_copy, handle_diff, handle_history, handle_key_command, handle_list, handle_orphans,
    handle_save, handle_sync, HistoryArgs, KeyCommands, SaveArgs,
};
use paramsync::config::{paths::ParamPaths, settings::Settings};
use paramsync::error::ParamError;
use paramsync::storage::Storage;

#[derive(Parser)]
#[command(
    name = "paramsync",
    version,
    about = "Parameter and secret management with an audit trail",
    long_about = "paramsync keeps namespaced configuration parameters and encrypted \
                  secrets, records every submitted change in an append-only audit \
                  log, and pushes prefixes to an external parameter store."
)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directories and default settings
    Init,

    /// Show current configuration and paths
    Config,

    /// Encryption key management
    #[command(subcommand)]
    Key(KeyCommands),

    /// Submit a batch of parameter changes
    Save(SaveArgs),

    /// List current parameters (secrets masked)
    #[command(alias = "ls")]
    List {
        /// Only parameters under this prefix
        #[arg(short, long)]
        prefix: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Show the audit trail (secrets masked)
    History(HistoryArgs),

    /// Push every parameter under a prefix to the external store
    Sync {
        prefix: String,
        /// External store file (defaults to the one in the data directory)
        #[arg(short, long)]
        target: Option<PathBuf>,
    },

    /// Compare the parameters under two prefixes
    Diff {
        /// Base prefix
        prefix_a: String,
        /// Prefix compared against the base
        prefix_b: String,
        #[arg(long)]
        json: bool,
    },

    /// Copy parameters missing from the target prefix
    Copy {
        source: String,
        target: String,
        #[arg(short, long, env = "PARAMSYNC_USER")]
        user: Option<String>,
        #[arg(short, long, env = "PARAMSYNC_EMAIL")]
        email: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Find audit records whose change never reached current state
    Orphans {
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = paramsync::logging::init(cli.verbose) {
        eprintln!("Warning: logging unavailable: {}", e);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let client_error = e
                .downcast_ref::<ParamError>()
                .is_some_and(ParamError::is_client_error);
            if client_error {
                ExitCode::from(2)
            } else {
                ExitCode::from(1)
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // Initialize paths and settings
    let paths = ParamPaths::new()?;
    let mut settings = Settings::load_or_create(&paths)?;

    // Initialize storage
    let mut storage = Storage::new(paths.clone())?;
    storage.load_all()?;

    match cli.command {
        Some(Commands::Init) => {
            println!("Initializing paramsync at: {}", paths.base_dir().display());
            settings.save(&paths)?;
            println!("Initialization complete!");
            println!();
            println!("Run 'paramsync key init' before saving secret parameters.");
        }
        Some(Commands::Config) => {
            println!("paramsync Configuration");
            println!("=======================");
            println!("Base directory:      {}", paths.base_dir().display());
            println!("Parameters:          {}", paths.parameters_file().display());
            println!("Audit log:           {}", paths.audit_log().display());
            println!("External store:      {}", paths.external_store_file().display());
            println!("Initialized:         {}", storage.is_initialized());
            println!("Parameters stored:   {}", storage.parameters.count()?);
            println!("Audit records:       {}", storage.audit.entry_count()?);
            println!();
            println!("Settings:");
            println!("  Encryption key:    {}", if settings.encryption.is_configured() { "configured" } else { "not configured" });
            println!("  Sync item timeout: {} ms", settings.sync.item_timeout().as_millis());
            println!("  Redaction mask:    {}", settings.redaction.mask());
        }
        Some(Commands::Key(cmd)) => {
            handle_key_command(&paths, &mut settings, &storage, cmd)?;
        }
        Some(Commands::Save(args)) => handle_save(&storage, &settings, args)?,
        Some(Commands::List { prefix, json }) => handle_list(&storage, &settings, prefix, json)?,
        Some(Commands::History(args)) => handle_history(&storage, &settings, args)?,
        Some(Commands::Sync { prefix, target }) => {
            handle_sync(&storage, &settings, &prefix, target)?;
        }
        Some(Commands::Diff { prefix_a, prefix_b, json }) => {
            handle_diff(&storage, &settings, &prefix_a, &prefix_b, json)?;
        }
        Some(Commands::Copy { source, target, user, email, json }) => {
            handle_copy(&storage, &source, &target, user, email, json)?;
        }
        Some(Commands::Orphans { json }) => handle_orphans(&storage, json)?,
        None => {
            println!("paramsync - parameter and secret management");
            println!();
            println!("Run 'paramsync --help' for usage information.");
        }
    }

    Ok(())
}
