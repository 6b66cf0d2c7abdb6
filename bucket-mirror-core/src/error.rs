//! Error types for bucket-mirror-core
//!
//! - [`DirectoryReadError`]: a directory could not be enumerated. Terminal for the
//!   subtree rooted there.
//! - [`TaskError`]: one unit of work inside a directory pass failed. Collected,
//!   never short-circuits siblings.
//! - [`SyncError`]: what a `synchronise` call returns when the mirror of one root
//!   may be incomplete.

use crate::contract::StorageError;
use crate::synchronise::SyncReport;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("failed to read directory {}: {source}", .path.display())]
pub struct DirectoryReadError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Error, Debug)]
pub enum TaskError {
    /// The bucket could not tell whether `key` exists; nothing was written.
    #[error("existence check failed for '{key}' ({}): {source}", .path.display())]
    ExistenceCheck {
        key: String,
        path: PathBuf,
        #[source]
        source: StorageError,
    },

    #[error("upload failed for '{key}' ({}): {source}", .path.display())]
    Upload {
        key: String,
        path: PathBuf,
        #[source]
        source: StorageError,
    },

    /// A subdirectory could not be read; its subtree was not mirrored.
    #[error(transparent)]
    DirectoryRead(#[from] DirectoryReadError),

    #[error("not descending into {}: maximum depth {max_depth} reached", .path.display())]
    DepthExceeded { path: PathBuf, max_depth: usize },

    /// The entry's name is not valid UTF-8, so no object key can be built for it.
    #[error("name of {} is not valid UTF-8, skipping it", .path.display())]
    InvalidName { path: PathBuf },
}

impl TaskError {
    /// The local path the failure is about.
    pub fn path(&self) -> &std::path::Path {
        match self {
            TaskError::ExistenceCheck { path, .. }
            | TaskError::Upload { path, .. }
            | TaskError::DepthExceeded { path, .. }
            | TaskError::InvalidName { path } => path.as_path(),
            TaskError::DirectoryRead(e) => e.path.as_path(),
        }
    }

    /// The destination key, for failures tied to a single file.
    pub fn key(&self) -> Option<&str> {
        match self {
            TaskError::ExistenceCheck { key, .. } | TaskError::Upload { key, .. } => Some(key.as_str()),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    /// The root directory itself could not be read; nothing was attempted.
    #[error(transparent)]
    DirectoryRead(#[from] DirectoryReadError),

    /// At least one task under the root failed. `report` holds what did succeed.
    #[error("{} task(s) failed while mirroring {}", .failures.len(), .root.display())]
    Incomplete {
        root: PathBuf,
        report: SyncReport,
        failures: Vec<TaskError>,
    },
}

impl SyncError {
    pub fn failures(&self) -> &[TaskError] {
        match self {
            SyncError::DirectoryRead(_) => &[],
            SyncError::Incomplete { failures, .. } => failures,
        }
    }
}
