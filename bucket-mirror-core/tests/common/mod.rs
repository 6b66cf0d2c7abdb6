#![allow(dead_code)]

use async_trait::async_trait;
use bucket_mirror_core::contract::{Bucket, StorageError};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory bucket that records calls and the peak number of concurrent uploads.
#[derive(Default)]
pub struct MemoryBucket {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    failing_keys: HashSet<String>,
    upload_delay: Duration,
    exists_delay: Duration,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    pub exists_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = delay;
        self
    }

    pub fn with_exists_delay(mut self, delay: Duration) -> Self {
        self.exists_delay = delay;
        self
    }

    /// Uploads to `key` fail with a simulated transport error.
    pub fn failing_on(mut self, key: &str) -> Self {
        self.failing_keys.insert(key.to_string());
        self
    }

    pub fn insert(&self, key: &str, content: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), content.to_vec());
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn uploads(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn store(&self, local_path: &Path, key: &str) -> Result<(), StorageError> {
        if !self.upload_delay.is_zero() {
            tokio::time::sleep(self.upload_delay).await;
        }
        if self.failing_keys.contains(key) {
            return Err(format!("simulated transport error for {key}").into());
        }
        let content = tokio::fs::read(local_path).await?;
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), content);
        Ok(())
    }
}

#[async_trait]
impl Bucket for MemoryBucket {
    async fn exists(&self, _bucket: &str, key: &str) -> Result<bool, StorageError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if !self.exists_delay.is_zero() {
            tokio::time::sleep(self.exists_delay).await;
        }
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn upload(&self, _bucket: &str, local_path: &Path, key: &str) -> Result<(), StorageError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = self.store(local_path, key).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Write `files` (relative path, content) under `root`, creating parent directories.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (relative, content) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
}
