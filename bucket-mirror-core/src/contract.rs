//! # contract: the seams between the synchroniser and the outside world
//!
//! This module defines the traits and plain data types the mirroring pipeline is
//! written against:
//!
//! - [`Bucket`]: the remote storage collaborator. Two calls only: an existence
//!   check and a non-resumable upload of one local file to one key.
//! - [`CooldownPolicy`]: decides how long to pause after a directory's batch has
//!   settled. [`FixedCooldown`] is the flat delay used by default.
//! - [`SyncTarget`], [`DirectoryEntry`], [`UploadTask`]: the data flowing between
//!   config, the walker and the worker pool.
//!
//! ## Mocking & Testing
//! Both traits are annotated for `mockall` (exported behind the
//! `test-export-mocks` feature) so the CLI crate and integration tests can script
//! bucket responses and assert on call counts.
//!
//! ## Adding New Storage Backends
//! - Implement [`Bucket`] for the backend client.
//! - Convert every transport or auth failure into a [`StorageError`]; the
//!   synchroniser attaches the key and local path itself.
//! - `exists` must not report `true` for a key that has no object; the
//!   synchroniser never overwrites, so a false positive silently drops a file.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Error type returned by storage collaborators (simple boxed error, as transport
/// errors vary per backend).
pub type StorageError = Box<dyn std::error::Error + Send + Sync>;

/// A configured root to mirror: everything under `local_path` lands in the bucket
/// under `destination_prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTarget {
    pub local_path: PathBuf,
    #[serde(default)]
    pub destination_prefix: String,
}

/// One immediate child of a directory, classified by following symlinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Raw file name. Not necessarily UTF-8; keys are only built from names that are.
    pub name: OsString,
    pub is_file: bool,
    pub is_directory: bool,
    /// The walked directory joined with `name`.
    pub path: PathBuf,
}

/// One file's pending transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub source_path: PathBuf,
    pub destination_path: String,
}

/// Per-batch tally handed to the cooldown policy once a directory's file tasks settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.uploaded + self.skipped + self.failed
    }
}

/// Remote object storage, addressed by bucket name and object key.
///
/// The implementor owns transport, authentication and any request timeouts of
/// its own. The handle is shared read-only by all in-flight tasks of a batch.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Whether an object exists at `key`.
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    /// Upload the file at `local_path` to `key` in a single, non-resumable request.
    async fn upload(&self, bucket: &str, local_path: &Path, key: &str) -> Result<(), StorageError>;
}

/// Decides the pause after a directory's batch has settled.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait CooldownPolicy: Send + Sync {
    fn cooldown(&self, directory: &Path, outcome: &BatchOutcome) -> Duration;
}

/// The same delay after every batch, whether it succeeded fully, partially or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedCooldown(pub Duration);

impl FixedCooldown {
    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }
}

impl CooldownPolicy for FixedCooldown {
    fn cooldown(&self, _directory: &Path, _outcome: &BatchOutcome) -> Duration {
        self.0
    }
}

/// Join a destination prefix and a relative name into an object key.
///
/// Keys always use `/`. Surrounding slashes on either side are dropped so that
/// `""`, `"images"` and `"images/"` behave alike.
pub fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let name = name.trim_start_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}
