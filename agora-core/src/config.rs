use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "agora.toml";
pub const CONFIG_PATH_ENV: &str = "AGORA_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub feed: FeedConfig,
    pub ranking: RankingConfig,
    pub search: SearchConfig,
    pub workers: WorkerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://agora.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// `memory` or `redis`
    pub backend: String,
    pub redis_url: String,
    pub post_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            redis_url: "redis://127.0.0.1:6379/".to_string(),
            post_ttl_secs: 3600,
        }
    }
}

impl CacheConfig {
    pub fn post_ttl(&self) -> Duration {
        Duration::from_secs(self.post_ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Authors with more followers than this are served by the pull path only.
    pub fanout_threshold: i64,
    pub max_feed_size: usize,
    pub feed_ttl_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            fanout_threshold: 1000,
            max_feed_size: 500,
            feed_ttl_secs: 7 * 24 * 3600,
        }
    }
}

impl FeedConfig {
    pub fn feed_ttl(&self) -> Duration {
        Duration::from_secs(self.feed_ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub algorithm: String,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            algorithm: "decay-by-sign".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub enabled: bool,
    pub url: String,
    pub index: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://127.0.0.1:7700/".to_string(),
            index: "posts".to_string(),
            api_key: None,
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub max_concurrency: usize,
    pub task_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            task_timeout_secs: 300,
            shutdown_timeout_secs: 30,
        }
    }
}

impl WorkerConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "agora=info,feed_engine=info,background_service=info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`. A missing file is an error only when `explicit` is set.
    pub fn load(path: &Path, explicit: bool) -> Result<Self, ConfigError> {
        if !path.exists() {
            if explicit {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            info!(
                "No configuration file at {}, using defaults",
                path.display()
            );
            let config = AppConfig::default();
            config.validate()?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidFormat {
            details: format!("{}: {}", path.display(), e),
        })?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.fanout_threshold < 0 {
            return Err(invalid("feed.fanout_threshold", self.feed.fanout_threshold));
        }
        if self.feed.max_feed_size == 0 {
            return Err(invalid("feed.max_feed_size", self.feed.max_feed_size));
        }
        if self.workers.max_concurrency == 0 {
            return Err(invalid(
                "workers.max_concurrency",
                self.workers.max_concurrency,
            ));
        }
        if self.workers.task_timeout_secs == 0 {
            return Err(invalid(
                "workers.task_timeout_secs",
                self.workers.task_timeout_secs,
            ));
        }
        if self.database.max_connections == 0 {
            return Err(invalid(
                "database.max_connections",
                self.database.max_connections,
            ));
        }
        match self.cache.backend.as_str() {
            "memory" | "redis" => {}
            other => {
                return Err(ConfigError::UnknownCacheBackend {
                    name: other.to_string(),
                })
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}
