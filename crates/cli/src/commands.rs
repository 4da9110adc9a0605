//! Handlers for the `missao-sync` subcommands.
//!
//! Each handler builds the stores its stage needs from [`AppConfig`], runs the
//! stage from the `missao-sync` library, and prints a short summary.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use chrono::Local;
use missao_sync::seed::CredentialSeeder;
use missao_sync::snapshot::{read_snapshot, resolve_snapshot_path};
use missao_sync::{
    export_snapshot, load_snapshot, reconcile, ExportOptions, LoadOptions, ReconcileOptions,
    SeedOutcome, SeedStatus, TRACKED_COLLECTIONS,
};
use missao_sync_firebase::{AuthEmulatorSeeder, FirestoreStore};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

pub async fn handle_export(config: &AppConfig) -> Result<()> {
    let remote = FirestoreStore::connect(&config.remote_target()).await?;
    println!("Exporting from {}...", remote.label());

    let options = ExportOptions {
        snapshot_dir: config.snapshot_dir.clone(),
        timestamp: Local::now().naive_local(),
        retry: config.retry_policy(),
    };
    let report = export_snapshot(&remote, &options).await?;

    println!(
        "💾 Snapshot written to '{}' ({} records).",
        report.path.display(),
        report.counts.values().sum::<usize>()
    );
    Ok(())
}

pub async fn handle_load(config: &AppConfig, snapshot: Option<&Path>) -> Result<()> {
    // Fails before the emulator is contacted when there is nothing to load.
    let source = resolve_snapshot_path(snapshot, &config.snapshot_dir)?;
    let local = FirestoreStore::connect(&config.local_target()).await?;
    let seeder = AuthEmulatorSeeder::new(
        &config.emulator.host,
        config.emulator.auth_port,
        &config.emulator.project_id,
    )
    .map_err(|e| warn!(error = %e, "Auth emulator client unavailable; seeding skipped."))
    .ok();

    let options = LoadOptions {
        snapshot: Some(source),
        snapshot_dir: config.snapshot_dir.clone(),
        batch_size: config.batch_size,
        retry: config.retry_policy(),
        seed: config.seed.clone(),
    };
    let report = load_snapshot(
        &local,
        seeder.as_ref().map(|s| s as &dyn CredentialSeeder),
        &options,
    )
    .await?;

    match &report.seed {
        SeedStatus::Seeded(outcome) => {
            let verb = match outcome {
                SeedOutcome::Created => "created",
                SeedOutcome::PasswordReset => "reset",
            };
            println!(
                "🔑 Operator login {verb}: {} / {}",
                config.seed.email, config.seed.password
            );
        }
        SeedStatus::Failed(reason) => {
            println!("⚠️  Operator login not seeded: {reason}");
        }
        SeedStatus::Skipped => println!("⚠️  Operator login not seeded."),
    }
    println!(
        "Loaded {} records from '{}' in {} batches.",
        report.counts.values().sum::<usize>(),
        report.source.display(),
        report.batches
    );
    Ok(())
}

pub async fn handle_reconcile(config: &AppConfig, dry_run: bool) -> Result<()> {
    // The remote key is validated before the local store is read.
    let remote = FirestoreStore::connect(&config.remote_target()).await?;
    let local = FirestoreStore::connect(&config.local_target()).await?;
    info!(local = %local.label(), remote = %remote.label(), dry_run, "Starting reconcile.");

    let mut options = ReconcileOptions::new(&config.snapshot_dir, Local::now().naive_local());
    options.batch_size = config.batch_size;
    options.retry = config.retry_policy();
    options.dry_run = dry_run;

    let report = reconcile(&local, &remote, &options).await?;

    let total = report.counts.values().sum::<usize>();
    if report.dry_run {
        print_counts(&report.counts);
        println!(
            "Dry run: {total} records would be merged into {}. Backup at '{}'.",
            remote.label(),
            report.backup.display()
        );
    } else {
        println!(
            "Merged {total} records into {} in {} batches. Backup at '{}'.",
            remote.label(),
            report.batches,
            report.backup.display()
        );
    }
    Ok(())
}

pub fn handle_inspect(config: &AppConfig, snapshot: Option<&Path>) -> Result<()> {
    let path = resolve_snapshot_path(snapshot, &config.snapshot_dir)?;
    let contents = read_snapshot(&path)
        .with_context(|| format!("could not inspect '{}'", path.display()))?;

    println!("Snapshot '{}':", path.display());
    let counts = contents.record_counts();
    for collection in TRACKED_COLLECTIONS {
        match counts.get(collection) {
            Some(n) => println!("  {collection}: {n}"),
            None => println!("  {collection}: missing"),
        }
    }
    for (name, n) in counts
        .iter()
        .filter(|(name, _)| !TRACKED_COLLECTIONS.contains(&name.as_str()))
    {
        println!("  {name}: {n} (untracked)");
    }
    println!("Total: {} records", contents.total_records());
    Ok(())
}

fn print_counts(counts: &BTreeMap<String, usize>) {
    for collection in TRACKED_COLLECTIONS {
        println!("  {collection}: {}", counts.get(collection).copied().unwrap_or(0));
    }
}
