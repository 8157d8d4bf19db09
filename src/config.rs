use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub tracing: TracingConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL; the durable queue lives in a single database file.
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_size: default_pool_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersConfig {
    /// Seconds a worker sleeps between claim attempts when the queue is empty.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Base for exponential retry backoff; the store-backed `backoff` key and
    /// the `--backoff` flag take precedence.
    #[serde(default = "default_backoff_base")]
    pub backoff_base: u64,
    /// Heartbeats older than this do not count as active workers.
    #[serde(default = "default_liveness_threshold")]
    pub liveness_threshold_secs: i64,
    /// Retry cap applied when neither the payload, the store-backed
    /// `max_retries` key, nor the `--retries` flag provides one.
    #[serde(default = "default_max_retries")]
    pub default_max_retries: i32,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            backoff_base: default_backoff_base(),
            liveness_threshold_secs: default_liveness_threshold(),
            default_max_retries: default_max_retries(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_database_url() -> String {
    "sqlite://queuectl.db?mode=rwc".to_string()
}

const fn default_pool_size() -> u32 {
    5
}

const fn default_poll_interval() -> u64 {
    1
}

const fn default_backoff_base() -> u64 {
    2
}

const fn default_liveness_threshold() -> i64 {
    10
}

const fn default_max_retries() -> i32 {
    3
}
