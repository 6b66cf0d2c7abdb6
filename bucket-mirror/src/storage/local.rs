//! Directory-backed bucket, used for local runs and end-to-end tests.
//!
//! Uploads are staged under `<root>/.staging` and renamed into place, so a partial
//! copy never shows up under an object key and staging never touches bucket contents.

use async_trait::async_trait;
use bucket_mirror_core::contract::{Bucket, StorageError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Sits beside the bucket directories; bucket names may not start with `.`, so it
/// can never be one of them.
const STAGING_DIR: &str = ".staging";

/// A bucket backed by a local directory: object `k` of bucket `b` is the file `<root>/b/k`.
pub struct LocalBucket {
    root: PathBuf,
}

impl LocalBucket {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        if bucket.starts_with('.') {
            return Err(format!("invalid bucket name '{bucket}'").into());
        }
        let mut path = self.root.join(checked_segment(bucket)?);
        for segment in key.split('/').filter(|s| !s.is_empty()) {
            path.push(checked_segment(segment)?);
        }
        Ok(path)
    }
}

fn checked_segment(segment: &str) -> Result<&str, StorageError> {
    if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
        return Err(format!("invalid path segment '{segment}'").into());
    }
    Ok(segment)
}

#[async_trait]
impl Bucket for LocalBucket {
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        let path = self.object_path(bucket, key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn upload(&self, bucket: &str, local_path: &Path, key: &str) -> Result<(), StorageError> {
        let dest = self.object_path(bucket, key)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        let staging_dir = self.root.join(STAGING_DIR);
        fs::create_dir_all(&staging_dir).await?;

        let source = local_path.to_path_buf();
        let target = dest.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            // Dropping the temp file on any error removes it.
            let mut staged = tempfile::NamedTempFile::new_in(&staging_dir)?;
            let mut input = std::fs::File::open(&source)?;
            std::io::copy(&mut input, staged.as_file_mut())?;
            staged.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await??;
        tracing::debug!(key, dest = %dest.display(), "Wrote object to local bucket");
        Ok(())
    }
}
