/// `load_config` module: Loads a static YAML config, merges environment overrides and
/// secrets, and produces the resolved [`CliConfig`] the CLI runs from.
///
/// This module is the only place where user-supplied YAML is parsed and mapped to
/// strongly-typed structs.
///
/// # Responsibilities
/// - Parse the YAML file into intermediate (YAML-side) types
/// - Resolve the bucket name (file first, then `STORAGE_BUCKET`)
/// - Apply `FIREBASE_STORAGE_EMULATOR_HOST` to the gcs endpoint and pick up
///   `STORAGE_BEARER_TOKEN`; secrets never live in the file
/// - Validate tunables so the core never sees a zero-slot pool
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use bucket_mirror_core::contract::{FixedCooldown, SyncTarget};
use bucket_mirror_core::synchronise::{
    SyncOptions, DEFAULT_INTER_BATCH_DELAY, DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_DEPTH,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const EMULATOR_HOST_ENV: &str = "FIREBASE_STORAGE_EMULATOR_HOST";
pub const BEARER_TOKEN_ENV: &str = "STORAGE_BEARER_TOKEN";
pub const BUCKET_ENV: &str = "STORAGE_BUCKET";
pub const DEFAULT_GCS_ENDPOINT: &str = "https://storage.googleapis.com";

/// Fully resolved configuration for one `sync` run.
#[derive(Debug)]
pub struct CliConfig {
    pub bucket_name: String,
    pub backend: Backend,
    pub sync: SyncSection,
    pub targets: Vec<SyncTarget>,
}

/// Where objects are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// GCS JSON API, or the Firebase storage emulator speaking it.
    Gcs {
        endpoint: String,
        bearer_token: Option<String>,
    },
    /// A directory on disk; bucket `b` lives at `<root>/b`.
    Local { root: PathBuf },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncSection {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,
    #[serde(default)]
    pub task_timeout_ms: Option<u64>,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_inter_batch_delay_ms() -> u64 {
    DEFAULT_INTER_BATCH_DELAY.as_millis() as u64
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
            task_timeout_ms: None,
            max_depth: default_max_depth(),
        }
    }
}

impl SyncSection {
    pub fn to_options(&self) -> SyncOptions {
        SyncOptions {
            max_concurrency: self.max_concurrency,
            cooldown: Arc::new(FixedCooldown::from_millis(self.inter_batch_delay_ms)),
            task_timeout: self.task_timeout_ms.map(Duration::from_millis),
            max_depth: self.max_depth,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    bucket: BucketSection,
    #[serde(default)]
    sync: SyncSection,
    #[serde(default)]
    targets: Vec<SyncTarget>,
}

#[derive(Debug, Deserialize)]
struct BucketSection {
    #[serde(default)]
    name: Option<String>,
    backend: BackendYaml,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum BackendYaml {
    #[serde(rename = "gcs")]
    Gcs {
        #[serde(default)]
        endpoint: Option<String>,
    },
    #[serde(rename = "local")]
    Local { root: PathBuf },
}

/// Loads a static YAML config file (no secrets) and injects env overrides and secrets.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let bucket_name = match raw.bucket.name.filter(|n| !n.trim().is_empty()) {
        Some(name) => name,
        None => match std::env::var(BUCKET_ENV) {
            Ok(name) if !name.trim().is_empty() => {
                info!(bucket = %name, "Bucket name taken from {BUCKET_ENV}");
                name
            }
            _ => {
                error!("No bucket name in config and {BUCKET_ENV} not set");
                anyhow::bail!("bucket.name is missing and {BUCKET_ENV} is not set");
            }
        },
    };

    let backend = match raw.bucket.backend {
        BackendYaml::Gcs { endpoint } => {
            let endpoint = match std::env::var(EMULATOR_HOST_ENV) {
                Ok(host) if !host.trim().is_empty() => {
                    let emulator = emulator_endpoint(&host);
                    info!(endpoint = %emulator, "Using storage emulator from {EMULATOR_HOST_ENV}");
                    emulator
                }
                _ => endpoint.unwrap_or_else(|| DEFAULT_GCS_ENDPOINT.to_string()),
            };
            let bearer_token = std::env::var(BEARER_TOKEN_ENV)
                .ok()
                .filter(|t| !t.is_empty());
            if bearer_token.is_none() {
                warn!("{BEARER_TOKEN_ENV} not set, sending unauthenticated requests");
            }
            Backend::Gcs {
                endpoint,
                bearer_token,
            }
        }
        BackendYaml::Local { root } => Backend::Local { root },
    };

    if raw.sync.max_concurrency == 0 {
        error!("sync.max_concurrency must be at least 1");
        anyhow::bail!("sync.max_concurrency must be at least 1");
    }

    if raw.targets.is_empty() {
        warn!(config_path = ?path_ref, "No targets configured, nothing to mirror");
    }

    info!(
        bucket = %bucket_name,
        targets = raw.targets.len(),
        max_concurrency = raw.sync.max_concurrency,
        inter_batch_delay_ms = raw.sync.inter_batch_delay_ms,
        "Config loaded and merged successfully"
    );

    Ok(CliConfig {
        bucket_name,
        backend,
        sync: raw.sync,
        targets: raw.targets,
    })
}

/// `host:port` as the emulator variable carries it, or a full URL.
fn emulator_endpoint(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
