//! Declarative runtime configuration (spec §6 "Configuration").
//!
//! Parsed from TOML, then layered with `.dev.vars` and `.env` on top in that
//! order — config file first, then `.dev.vars`, then `.env` (last writer
//! wins for `vars`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Entry point of the user handler module (resolved by the generation manager).
    pub main: PathBuf,

    #[serde(default)]
    pub vars: HashMap<String, String>,

    #[serde(default)]
    pub kv_namespaces: Vec<KvNamespaceConfig>,
    #[serde(default)]
    pub r2_buckets: Vec<R2BucketConfig>,
    #[serde(default)]
    pub d1_databases: Vec<D1DatabaseConfig>,
    #[serde(default)]
    pub durable_objects: Vec<DurableObjectNamespaceConfig>,
    #[serde(default)]
    pub workflows: Vec<WorkflowBindingConfig>,
    #[serde(default)]
    pub queues: QueuesConfig,
    #[serde(default)]
    pub services: Vec<ServiceBindingConfig>,
    #[serde(default)]
    pub assets: Option<AssetsConfig>,
    #[serde(default)]
    pub triggers: TriggersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvNamespaceConfig {
    pub binding: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct R2BucketConfig {
    pub binding: String,
    pub bucket_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct D1DatabaseConfig {
    pub binding: String,
    pub database_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurableObjectNamespaceConfig {
    pub binding: String,
    pub class_name: String,
    #[serde(default)]
    pub script_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowBindingConfig {
    pub binding: String,
    pub name: String,
    pub class_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QueuesConfig {
    #[serde(default)]
    pub producers: Vec<QueueProducerConfig>,
    #[serde(default)]
    pub consumers: Vec<QueueConsumerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueProducerConfig {
    pub binding: String,
    pub queue: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConsumerConfig {
    pub queue: String,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: u32,
    #[serde(default = "default_max_batch_timeout_ms")]
    pub max_batch_timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub dead_letter_queue: Option<String>,
    #[serde(default = "default_retention_secs")]
    pub retention_seconds: u64,
}

fn default_max_batch_size() -> u32 {
    10
}
fn default_max_batch_timeout_ms() -> u64 {
    5000
}
fn default_max_retries() -> u32 {
    3
}
fn default_retention_secs() -> u64 {
    345_600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceBindingConfig {
    pub binding: String,
    pub service: String,
    #[serde(default)]
    pub entrypoint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HtmlHandling {
    None,
    AutoTrailingSlash,
    ForceTrailingSlash,
    DropTrailingSlash,
}

impl Default for HtmlHandling {
    fn default() -> Self {
        HtmlHandling::AutoTrailingSlash
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotFoundHandling {
    None,
    NotFoundPage,
    SinglePageApplication,
}

impl Default for NotFoundHandling {
    fn default() -> Self {
        NotFoundHandling::None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    pub directory: PathBuf,
    #[serde(default)]
    pub html_handling: HtmlHandling,
    #[serde(default)]
    pub not_found_handling: NotFoundHandling,
    /// `run_worker_first` — bool or glob list; normalized to a glob list here
    /// (empty = false, `["*"]` = true).
    #[serde(default)]
    pub run_worker_first: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TriggersConfig {
    #[serde(default)]
    pub crons: Vec<String>,
}

/// Load config from `path`, then overlay `.dev.vars` and `.env` found beside
/// it (spec §6 precedence: config, then `.dev.vars`, then `.env`).
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    let mut config: Config = toml::from_str(&raw).map_err(ConfigError::Parse)?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    overlay_vars_file(&mut config, &dir.join(".dev.vars"));
    overlay_vars_file(&mut config, &dir.join(".env"));
    Ok(config)
}

fn overlay_vars_file(config: &mut Config, path: &Path) {
    let Ok(contents) = std::fs::read_to_string(path) else { return };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            config.vars.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[source] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[source] toml::de::Error),
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
