use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use projsync_core::EngineConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub request_cache_ttl: Duration,
    pub request_cache_capacity: usize,
    pub download_page_limit: Option<usize>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "PROJSYNC_BIND_ADDR", "127.0.0.1:8080");
        let database_path =
            PathBuf::from(value_or_default(&lookup, "PROJSYNC_DATABASE_PATH", "projsync.db"));

        let request_cache_ttl_secs =
            value_or_default(&lookup, "PROJSYNC_REQUEST_CACHE_TTL_SECS", "600")
                .parse::<u64>()
                .map_err(|_| {
                    ConfigError::Invalid(
                        "PROJSYNC_REQUEST_CACHE_TTL_SECS must be an integer in [0, 86400]"
                            .to_string(),
                    )
                })?;
        if request_cache_ttl_secs > 86_400 {
            return Err(ConfigError::Invalid(
                "PROJSYNC_REQUEST_CACHE_TTL_SECS must be in [0, 86400]".to_string(),
            ));
        }

        let request_cache_capacity =
            value_or_default(&lookup, "PROJSYNC_REQUEST_CACHE_CAPACITY", "1024")
                .parse::<usize>()
                .map_err(|_| {
                    ConfigError::Invalid(
                        "PROJSYNC_REQUEST_CACHE_CAPACITY must be an integer in [1, 100000]"
                            .to_string(),
                    )
                })?;
        if !(1..=100_000).contains(&request_cache_capacity) {
            return Err(ConfigError::Invalid(
                "PROJSYNC_REQUEST_CACHE_CAPACITY must be in [1, 100000]".to_string(),
            ));
        }

        let download_page_limit = optional_trimmed(&lookup, "PROJSYNC_DOWNLOAD_PAGE_LIMIT")
            .map(|value| {
                value.parse::<usize>().map_err(|_| {
                    ConfigError::Invalid(
                        "PROJSYNC_DOWNLOAD_PAGE_LIMIT must be an integer in [1, 100000]"
                            .to_string(),
                    )
                })
            })
            .transpose()?;
        if let Some(limit) = download_page_limit {
            if !(1..=100_000).contains(&limit) {
                return Err(ConfigError::Invalid(
                    "PROJSYNC_DOWNLOAD_PAGE_LIMIT must be in [1, 100000]".to_string(),
                ));
            }
        }

        Ok(Self {
            bind_addr,
            database_path,
            request_cache_ttl: Duration::from_secs(request_cache_ttl_secs),
            request_cache_capacity,
            download_page_limit,
        })
    }

    /// Engine tunables derived from this config
    pub fn engine_config(&self) -> EngineConfig {
        let config = EngineConfig::new()
            .with_request_cache_ttl(self.request_cache_ttl)
            .with_request_cache_capacity(self.request_cache_capacity);
        match self.download_page_limit {
            Some(limit) => config.with_default_page_limit(limit),
            None => config.without_default_page_limit(),
        }
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
