///
/// This module implements the CLI interface for bucket-mirror: command parsing,
/// the async entrypoint, and the run summary printed for operators.
///
/// All mirroring logic lives in the [`bucket-mirror-core`] crate. This module is
/// strictly CLI glue: load config, open the storage backend, drive the targets.
///
/// ## How To Use
/// - For command-line users: `bucket-mirror sync --config mirror.yaml`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`bucket-mirror-core`]: ../../bucket-mirror-core/
use crate::load_config::load_config;
use crate::storage::open_bucket;
use anyhow::Result;
use bucket_mirror_core::synchronise::{synchronise_targets, TargetsReport};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

/// CLI for bucket-mirror: mirror local directories into an object-storage bucket.
#[derive(Parser)]
#[clap(
    name = "bucket-mirror",
    version,
    about = "Mirror local directory trees into an object-storage bucket, skipping objects that already exist"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload every configured target to the bucket using the given config file
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Per-target line of the printed run summary.
#[derive(Debug, Serialize)]
pub struct TargetSummary {
    pub local_path: PathBuf,
    pub destination_prefix: String,
    pub succeeded: bool,
    pub uploaded: usize,
    pub skipped: usize,
    pub directories: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub bucket: String,
    pub targets: Vec<TargetSummary>,
}

impl RunSummary {
    pub fn new(bucket: &str, report: &TargetsReport) -> Self {
        use bucket_mirror_core::error::SyncError;

        let targets = report
            .targets
            .iter()
            .map(|outcome| {
                let (succeeded, partial, errors) = match &outcome.result {
                    Ok(r) => (true, Some(r), Vec::new()),
                    Err(SyncError::Incomplete {
                        report, failures, ..
                    }) => (
                        false,
                        Some(report),
                        failures.iter().map(|f| f.to_string()).collect(),
                    ),
                    Err(e) => (false, None, vec![e.to_string()]),
                };
                TargetSummary {
                    local_path: outcome.target.local_path.clone(),
                    destination_prefix: outcome.target.destination_prefix.clone(),
                    succeeded,
                    uploaded: partial.map_or(0, |r| r.uploaded.len()),
                    skipped: partial.map_or(0, |r| r.skipped.len()),
                    directories: partial.map_or(0, |r| r.directories),
                    errors,
                }
            })
            .collect();

        Self {
            bucket: bucket.to_string(),
            targets,
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config } => {
            let config = load_config(config)?;
            let bucket = open_bucket(&config.backend)?;
            let options = config.sync.to_options();
            tracing::info!(
                command = "sync",
                bucket = %config.bucket_name,
                targets = config.targets.len(),
                ?options,
                "Starting synchronisation"
            );

            let report =
                synchronise_targets(bucket.as_ref(), &config.bucket_name, &config.targets, &options)
                    .await;

            let summary = RunSummary::new(&config.bucket_name, &report);
            println!("{}", serde_json::to_string_pretty(&summary)?);

            let failed = report.failed().count();
            if failed == 0 {
                tracing::info!(command = "sync", "Synchronisation complete");
                Ok(())
            } else {
                tracing::error!(command = "sync", failed, "Synchronisation finished with failed targets");
                anyhow::bail!(
                    "{failed} of {} target(s) failed; their mirrors may be incomplete",
                    report.targets.len()
                )
            }
        }
    }
}
