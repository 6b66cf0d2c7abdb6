//! Recursive tree-to-bucket mirroring, and the driver that runs it per configured target.
//!
//! For one directory, [`synchronise`]:
//!   1. reads its entries (a failure here aborts the call),
//!   2. uploads its files through the bounded pool in [`crate::batch`], skipping keys
//!      that already exist, and waits for every task to settle,
//!   3. pauses for the cooldown chosen by the [`CooldownPolicy`],
//!   4. descends into each subdirectory in turn with the key prefix extended by
//!      the directory name.
//!
//! A subdirectory only starts once its parent's batch has settled, and targets run
//! one after another, so `max_concurrency` also bounds the uploads in flight for
//! the whole process.
//!
//! # Error Handling
//! Per-file and per-subdirectory failures are collected, never retried, and
//! surface together as [`SyncError::Incomplete`] alongside the report of what did
//! succeed. [`synchronise_targets`] logs a failed target and moves on to the next.

use crate::batch::{self, TaskOutcome};
use crate::contract::{join_key, Bucket, CooldownPolicy, FixedCooldown, SyncTarget, UploadTask};
use crate::error::{DirectoryReadError, SyncError, TaskError};
use crate::walker;
use futures::future::BoxFuture;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_MAX_CONCURRENCY: usize = 2;
pub const DEFAULT_INTER_BATCH_DELAY: Duration = Duration::from_millis(5000);
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Tunables shared by every directory of a run.
#[derive(Clone)]
pub struct SyncOptions {
    /// In-flight uploads per directory batch.
    pub max_concurrency: usize,
    pub cooldown: Arc<dyn CooldownPolicy>,
    /// Applied separately to each existence check and each upload. `None` waits indefinitely.
    pub task_timeout: Option<Duration>,
    /// Deepest subdirectory level descended into; the root is level 0.
    pub max_depth: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            cooldown: Arc::new(FixedCooldown(DEFAULT_INTER_BATCH_DELAY)),
            task_timeout: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl std::fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOptions")
            .field("max_concurrency", &self.max_concurrency)
            .field("task_timeout", &self.task_timeout)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

/// What a mirror of one root did, across all of its directories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub uploaded: Vec<String>,
    pub skipped: Vec<String>,
    pub directories: usize,
}

impl SyncReport {
    fn merge(&mut self, other: SyncReport) {
        self.uploaded.extend(other.uploaded);
        self.skipped.extend(other.skipped);
        self.directories += other.directories;
    }
}

struct DirectoryOutcome {
    report: SyncReport,
    failures: Vec<TaskError>,
}

/// Mirror `local_path` and everything below it into `bucket_name` under `destination_prefix`.
pub async fn synchronise<B>(
    bucket: &B,
    bucket_name: &str,
    local_path: &Path,
    destination_prefix: &str,
    options: &SyncOptions,
) -> Result<SyncReport, SyncError>
where
    B: Bucket + ?Sized,
{
    info!(
        bucket = bucket_name,
        path = %local_path.display(),
        prefix = destination_prefix,
        max_concurrency = options.max_concurrency,
        "Synchronising directory tree"
    );

    let outcome = mirror_directory(
        bucket,
        bucket_name,
        local_path.to_path_buf(),
        destination_prefix.to_string(),
        options,
        0,
    )
    .await?;

    if outcome.failures.is_empty() {
        info!(
            path = %local_path.display(),
            uploaded = outcome.report.uploaded.len(),
            skipped = outcome.report.skipped.len(),
            directories = outcome.report.directories,
            "Directory tree synchronised"
        );
        Ok(outcome.report)
    } else {
        Err(SyncError::Incomplete {
            root: local_path.to_path_buf(),
            report: outcome.report,
            failures: outcome.failures,
        })
    }
}

fn mirror_directory<'a, B>(
    bucket: &'a B,
    bucket_name: &'a str,
    dir: PathBuf,
    prefix: String,
    options: &'a SyncOptions,
    depth: usize,
) -> BoxFuture<'a, Result<DirectoryOutcome, DirectoryReadError>>
where
    B: Bucket + ?Sized,
{
    Box::pin(async move {
        let entries = walker::read_entries(&dir).await?;

        let mut tasks = Vec::new();
        let mut subdirectories = Vec::new();
        let mut rejected = Vec::new();
        for entry in entries {
            if !entry.is_file && !entry.is_directory {
                debug!(path = %entry.path.display(), "Neither file nor directory, ignoring");
                continue;
            }
            // A lossy conversion could map two names onto one key.
            let Some(name) = entry.name.to_str() else {
                warn!(path = %entry.path.display(), "Name is not valid UTF-8, skipping");
                rejected.push(TaskError::InvalidName { path: entry.path });
                continue;
            };
            let key = join_key(&prefix, name);
            if entry.is_file {
                tasks.push(UploadTask {
                    destination_path: key,
                    source_path: entry.path,
                });
            } else {
                subdirectories.push((entry.path, key));
            }
        }

        debug!(
            path = %dir.display(),
            files = tasks.len(),
            subdirectories = subdirectories.len(),
            "Dispatching batch"
        );

        let results = batch::settle_batch(
            bucket,
            bucket_name,
            tasks,
            options.max_concurrency,
            options.task_timeout,
        )
        .await;
        let tally = batch::tally(&results);

        let mut outcome = DirectoryOutcome {
            report: SyncReport {
                directories: 1,
                ..Default::default()
            },
            failures: rejected,
        };
        for result in results {
            match result {
                Ok(TaskOutcome::Uploaded(key)) => outcome.report.uploaded.push(key),
                Ok(TaskOutcome::Skipped(key)) => outcome.report.skipped.push(key),
                Err(e) => outcome.failures.push(e),
            }
        }

        if tally.failed > 0 {
            warn!(path = %dir.display(), failed = tally.failed, total = tally.total(), "Batch settled with failures");
        } else {
            debug!(path = %dir.display(), uploaded = tally.uploaded, skipped = tally.skipped, "Batch settled");
        }

        let pause = options.cooldown.cooldown(&dir, &tally);
        if !pause.is_zero() {
            debug!(path = %dir.display(), pause = ?pause, "Waiting before next batch");
            tokio::time::sleep(pause).await;
        }

        for (path, key) in subdirectories {
            if depth + 1 > options.max_depth {
                warn!(path = %path.display(), max_depth = options.max_depth, "Maximum depth reached, not descending");
                outcome.failures.push(TaskError::DepthExceeded {
                    path,
                    max_depth: options.max_depth,
                });
                continue;
            }

            let child = mirror_directory(
                bucket,
                bucket_name,
                path,
                key,
                options,
                depth + 1,
            )
            .await;

            match child {
                Ok(child) => {
                    outcome.report.merge(child.report);
                    outcome.failures.extend(child.failures);
                }
                Err(e) => outcome.failures.push(TaskError::DirectoryRead(e)),
            }
        }

        Ok(outcome)
    })
}

/// The result of one configured target.
#[derive(Debug)]
pub struct TargetOutcome {
    pub target: SyncTarget,
    pub result: Result<SyncReport, SyncError>,
}

/// Results of every target, in configuration order.
#[derive(Debug, Default)]
pub struct TargetsReport {
    pub targets: Vec<TargetOutcome>,
}

impl TargetsReport {
    pub fn failed(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.targets.iter().filter(|t| t.result.is_err())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Mirror each target in turn. A failed target is logged and does not stop the rest.
pub async fn synchronise_targets<B>(
    bucket: &B,
    bucket_name: &str,
    targets: &[SyncTarget],
    options: &SyncOptions,
) -> TargetsReport
where
    B: Bucket + ?Sized,
{
    let mut report = TargetsReport::default();

    for target in targets {
        info!(
            path = %target.local_path.display(),
            prefix = %target.destination_prefix,
            "Uploading files from target"
        );

        let result = synchronise(
            bucket,
            bucket_name,
            &target.local_path,
            &target.destination_prefix,
            options,
        )
        .await;

        match &result {
            Ok(r) => info!(
                path = %target.local_path.display(),
                uploaded = r.uploaded.len(),
                skipped = r.skipped.len(),
                "All files uploaded successfully"
            ),
            Err(e) => {
                error!(path = %target.local_path.display(), error = %e, "Target mirror may be incomplete");
                for failure in e.failures() {
                    error!(path = %failure.path().display(), error = %failure, "Task failed");
                }
            }
        }

        report.targets.push(TargetOutcome {
            target: target.clone(),
            result,
        });
    }

    report
}
