use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration module
/// This module handles the service configuration including loading,
/// validating and saving configuration settings.
/// Represents the service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Engine name (see `providers::SUPPORTED_ENGINES`)
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Language allowlist advertised when the engine cannot list its own
    #[serde(default)]
    pub langs: Vec<String>,

    /// Source language used when a submission leaves it empty
    #[serde(default = "default_source_lang")]
    pub default_source_lang: String,

    /// Worker pool settings
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Batch translation settings
    #[serde(default)]
    pub batching: BatchingConfig,

    /// Inter-language pacing settings
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Job store settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Ollama engine settings
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Worker pool configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WorkerConfig {
    // @field: Max simultaneously running jobs
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    // @field: Bounded wait of one queue pop
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    // @field: Time given to running jobs after a stop request
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    // @field: Seconds between expired record purges
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            poll_timeout_ms: default_poll_timeout_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            purge_interval_secs: default_purge_interval_secs(),
        }
    }
}

impl WorkerConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }
}

/// Batch translation configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchingConfig {
    // @field: Max characters per engine call, 0 disables chunking
    #[serde(default = "default_max_total_chars")]
    pub max_total_chars: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_total_chars: default_max_total_chars(),
        }
    }
}

/// A pacing threshold: at or above `threshold`, wait at least `delay_ms`
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PacingTier {
    pub threshold: usize,
    pub delay_ms: u64,
}

impl PacingTier {
    pub const fn new(threshold: usize, delay_ms: u64) -> Self {
        Self {
            threshold,
            delay_ms,
        }
    }
}

/// Pacing between the languages of one job
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PacingConfig {
    // @field: Delay when no tier applies
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    // @field: Tiers keyed on the number of target languages
    #[serde(default = "default_lang_tiers")]
    pub lang_tiers: Vec<PacingTier>,

    // @field: Tiers keyed on document length times language count
    #[serde(default = "default_weight_tiers")]
    pub weight_tiers: Vec<PacingTier>,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            lang_tiers: default_lang_tiers(),
            weight_tiers: default_weight_tiers(),
        }
    }
}

/// Job store configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    // @field: SQLite file, platform data dir when unset
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    // @field: Lifetime of a stored result
    #[serde(default = "default_ttl_secs")]
    pub result_ttl_secs: u64,

    // @field: Lifetime of a partial snapshot
    #[serde(default = "default_ttl_secs")]
    pub partial_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            result_ttl_secs: default_ttl_secs(),
            partial_ttl_secs: default_ttl_secs(),
        }
    }
}

impl StorageConfig {
    /// Configured database file or the platform default
    pub fn resolve_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => crate::database::DatabaseConnection::default_path(),
        }
    }
}

/// Ollama engine configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OllamaConfig {
    // @field: Service URL
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,

    // @field: Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Retries on transient errors
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    // @field: Base backoff, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    // @field: Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ollama_endpoint(),
            model: default_ollama_model(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

fn default_engine() -> String {
    "dummy".to_string()
}

fn default_source_lang() -> String {
    "auto".to_string()
}

fn default_max_parallel() -> usize {
    2
}

fn default_poll_timeout_ms() -> u64 {
    1000
}

fn default_shutdown_grace_ms() -> u64 {
    2000
}

fn default_purge_interval_secs() -> u64 {
    60
}

fn default_max_total_chars() -> usize {
    4500
}

fn default_base_delay_ms() -> u64 {
    250
}

fn default_lang_tiers() -> Vec<PacingTier> {
    vec![PacingTier::new(10, 1000), PacingTier::new(20, 1800)]
}

fn default_weight_tiers() -> Vec<PacingTier> {
    vec![PacingTier::new(200_000, 1500), PacingTier::new(500_000, 2500)]
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_retry_count() -> u32 {
    3 // Default to 3 retries
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_temperature() -> f32 {
    0.3
}

impl Config {
    /// Load the configuration file, writing a default one when it is missing
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save(path)?;
            return Ok(config);
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let config: Config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create config file: {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if !crate::providers::is_supported_engine(&self.engine) {
            return Err(anyhow!(
                "Unknown engine '{}'. Supported engines: {}",
                self.engine,
                crate::providers::SUPPORTED_ENGINES.join(", ")
            ));
        }

        if self.worker.max_parallel == 0 {
            return Err(anyhow!("worker.max_parallel must be at least 1"));
        }

        if self.storage.result_ttl_secs == 0 || self.storage.partial_ttl_secs == 0 {
            return Err(anyhow!("storage TTLs must be positive"));
        }

        if self.engine.trim().eq_ignore_ascii_case("ollama") {
            url::Url::parse(&self.ollama.endpoint)
                .with_context(|| format!("Invalid Ollama endpoint: {}", self.ollama.endpoint))?;
            if self.ollama.model.trim().is_empty() {
                return Err(anyhow!("Ollama model name is required"));
            }
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            engine: default_engine(),
            langs: Vec::new(),
            default_source_lang: default_source_lang(),
            worker: WorkerConfig::default(),
            batching: BatchingConfig::default(),
            pacing: PacingConfig::default(),
            storage: StorageConfig::default(),
            ollama: OllamaConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
