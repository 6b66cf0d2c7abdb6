//! Enumerates the immediate children of one directory.

use crate::contract::DirectoryEntry;
use crate::error::DirectoryReadError;
use std::path::Path;
use tokio::fs;
use tracing::{debug, error};

/// List the entries of `dir`, classifying each as file or directory.
///
/// Classification follows symlinks. Entries that are neither (sockets, fifos,
/// dangling links) come back with both flags unset. Order is whatever the
/// filesystem yields.
pub async fn read_entries(dir: &Path) -> Result<Vec<DirectoryEntry>, DirectoryReadError> {
    let read_error = |source: std::io::Error| {
        error!(path = %dir.display(), error = ?source, "Unable to read directory");
        DirectoryReadError {
            path: dir.to_path_buf(),
            source,
        }
    };

    let mut reader = fs::read_dir(dir).await.map_err(read_error)?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await.map_err(read_error)? {
        let path = entry.path();
        let name = entry.file_name();

        let (is_file, is_directory) = match fs::metadata(&path).await {
            Ok(meta) => (meta.is_file(), meta.is_dir()),
            Err(e) => {
                debug!(path = %path.display(), error = ?e, "Could not stat entry, ignoring it");
                (false, false)
            }
        };

        entries.push(DirectoryEntry {
            name,
            is_file,
            is_directory,
            path,
        });
    }

    debug!(path = %dir.display(), count = entries.len(), "Read directory");
    Ok(entries)
}
