//! # missao-sync: Offline Mission Sync CLI
//!
//! Entry point for the `missao-sync` binary. Each stage of the offline
//! mission workflow is its own subcommand:
//!
//! - `export`: snapshot the production store to a local file.
//! - `load`: reset the local emulator to a snapshot and seed the operator login.
//! - `reconcile`: back up the local emulator and merge it into production.
//! - `inspect`: show what a snapshot file contains.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE: &str = "missao-sync.log";

// --- CLI Definition ---

#[derive(Parser, Debug)]
#[command(name = "missao-sync", author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to `missao-sync.yml` when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding snapshot files (overrides `snapshot_dir`)
    #[arg(long, global = true)]
    snapshot_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Snapshot every tracked collection of the production store
    Export,
    /// Load a snapshot into the local emulator and seed the operator login
    Load(SnapshotArgs),
    /// Back up the local emulator and merge it into the production store
    Reconcile(ReconcileArgs),
    /// Print the record counts of a snapshot
    Inspect(SnapshotArgs),
}

#[derive(Parser, Debug)]
struct SnapshotArgs {
    /// Snapshot file; the newest one in the snapshot directory when omitted
    snapshot: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ReconcileArgs {
    /// Read and back up the local store without writing to production
    #[arg(long)]
    dry_run: bool,
}

impl Commands {
    fn stage(&self) -> &'static str {
        match self {
            Commands::Export => "Export",
            Commands::Load(_) => "Load",
            Commands::Reconcile(_) => "Reconcile",
            Commands::Inspect(_) => "Inspect",
        }
    }
}

// --- Main Application Entry ---

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let log_file = File::create(LOG_FILE)?;
    let subscriber = fmt::Subscriber::builder()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let stage = cli.command.stage();
    info!(stage, "Starting.");

    if let Err(e) = run(cli).await {
        error!(stage, error = %format!("{e:#}"), "Stage failed.");
        eprintln!("{stage} failed: {e:#}");
        std::process::exit(1);
    }

    info!(stage, "Finished.");
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = config::get_config(cli.config.as_deref())?;
    if let Some(dir) = cli.snapshot_dir {
        config.snapshot_dir = dir;
    }

    match cli.command {
        Commands::Export => commands::handle_export(&config).await,
        Commands::Load(args) => commands::handle_load(&config, args.snapshot.as_deref()).await,
        Commands::Reconcile(args) => commands::handle_reconcile(&config, args.dry_run).await,
        Commands::Inspect(args) => commands::handle_inspect(&config, args.snapshot.as_deref()),
    }
}
