//! Bounded worker pool for one directory's file uploads.
//!
//! Every [`UploadTask`] of a batch is dispatched exactly once. At most
//! `max_concurrency` tasks are in flight; they are polled on the calling task and
//! interleave at their I/O awaits. Failures are returned per task and never stop
//! siblings.

use crate::contract::{BatchOutcome, Bucket, StorageError, UploadTask};
use crate::error::TaskError;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info};

/// What a task that did not fail ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Uploaded(String),
    /// The key was already present; nothing was written.
    Skipped(String),
}

/// Run all `tasks` through a pool of `max_concurrency` slots and wait for every one to settle.
///
/// Results come back in completion order. A `max_concurrency` of zero is treated as one.
pub async fn settle_batch<B>(
    bucket: &B,
    bucket_name: &str,
    tasks: Vec<UploadTask>,
    max_concurrency: usize,
    task_timeout: Option<Duration>,
) -> Vec<Result<TaskOutcome, TaskError>>
where
    B: Bucket + ?Sized,
{
    stream::iter(tasks)
        .map(|task| run_task(bucket, bucket_name, task, task_timeout))
        .buffer_unordered(max_concurrency.max(1))
        .collect()
        .await
}

/// Check, then write if absent. The existence check always precedes the write.
pub async fn run_task<B>(
    bucket: &B,
    bucket_name: &str,
    task: UploadTask,
    task_timeout: Option<Duration>,
) -> Result<TaskOutcome, TaskError>
where
    B: Bucket + ?Sized,
{
    let UploadTask {
        source_path,
        destination_path: key,
    } = task;

    let exists = match within(task_timeout, bucket.exists(bucket_name, &key)).await {
        Ok(exists) => exists,
        Err(source) => {
            error!(key = %key, path = %source_path.display(), error = ?source, "Error checking if object exists");
            return Err(TaskError::ExistenceCheck {
                key,
                path: source_path,
                source,
            });
        }
    };

    if exists {
        debug!(key = %key, "Object already exists in bucket, skipping");
        return Ok(TaskOutcome::Skipped(key));
    }

    if let Err(source) = within(task_timeout, bucket.upload(bucket_name, &source_path, &key)).await {
        error!(key = %key, path = %source_path.display(), error = ?source, "Error uploading file");
        return Err(TaskError::Upload {
            key,
            path: source_path,
            source,
        });
    }

    info!(key = %key, path = %source_path.display(), "Uploaded file");
    Ok(TaskOutcome::Uploaded(key))
}

/// Tally settled results for the cooldown policy.
pub fn tally(results: &[Result<TaskOutcome, TaskError>]) -> BatchOutcome {
    results
        .iter()
        .fold(BatchOutcome::default(), |mut acc, result| {
            match result {
                Ok(TaskOutcome::Uploaded(_)) => acc.uploaded += 1,
                Ok(TaskOutcome::Skipped(_)) => acc.skipped += 1,
                Err(_) => acc.failed += 1,
            }
            acc
        })
}

async fn within<T, F>(limit: Option<Duration>, call: F) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    match limit {
        None => call.await,
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(format!("timed out after {limit:?}").into()),
        },
    }
}
