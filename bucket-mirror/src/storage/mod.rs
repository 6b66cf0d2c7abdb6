//! Concrete [`Bucket`] backends and backend selection from config.

pub mod gcs;
pub mod local;

use crate::load_config::Backend;
use anyhow::{Context, Result};
use bucket_mirror_core::contract::Bucket;

pub use gcs::GcsClient;
pub use local::LocalBucket;

/// Build the storage client described by the resolved config.
pub fn open_bucket(backend: &Backend) -> Result<Box<dyn Bucket>> {
    match backend {
        Backend::Gcs {
            endpoint,
            bearer_token,
        } => {
            tracing::info!(endpoint = %endpoint, "Initialising gcs storage client");
            let client = GcsClient::new(endpoint.clone(), bearer_token.clone())
                .map_err(|e| anyhow::anyhow!("{e}"))
                .context("Failed to construct gcs client")?;
            Ok(Box::new(client))
        }
        Backend::Local { root } => {
            tracing::info!(root = %root.display(), "Initialising local storage");
            Ok(Box::new(LocalBucket::new(root.clone())))
        }
    }
}
