#![doc = "bucket-mirror-core: core logic library for bucket-mirror."]

//! This crate contains the mirroring pipeline: walking a local tree, uploading its
//! files into an object-storage bucket through a bounded worker pool, skipping
//! keys that already exist, and throttling between directory batches.
//! Concrete storage clients and configuration loading live in the `bucket-mirror` crate.
//!
//! # Usage
//! Implement [`contract::Bucket`] for a storage backend, then call
//! [`synchronise::synchronise`] for one tree or [`synchronise::synchronise_targets`]
//! for a configured list.

pub mod batch;
pub mod contract;
pub mod error;
pub mod synchronise;
pub mod walker;

pub use contract::{Bucket, CooldownPolicy, FixedCooldown, StorageError, SyncTarget};
pub use error::{DirectoryReadError, SyncError, TaskError};
pub use synchronise::{synchronise, synchronise_targets, SyncOptions, SyncReport, TargetsReport};
