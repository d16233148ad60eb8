use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use crate::sources::SearchCriteria;
use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub shared_cache: SharedCacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    pub max_connections: Option<u32>,
}

/// Provider cache configuration
///
/// The top-level values apply to every provider; `providers` holds
/// per-provider overrides keyed by provider id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Minimum time between two feed refreshes of the same provider
    #[serde(default = "default_min_refresh_interval", with = "duration_serde::duration")]
    pub min_refresh_interval: Duration,
    /// Search strings handed to the provider on refresh, keyed by search mode
    #[serde(default = "default_search_criteria")]
    pub search_criteria: SearchCriteria,
    #[serde(default)]
    pub providers: HashMap<String, ProviderCacheOverride>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderCacheOverride {
    #[serde(default, with = "duration_serde::option_duration")]
    pub min_refresh_interval: Option<Duration>,
    pub search_criteria: Option<SearchCriteria>,
}

/// Resolved options for a single provider's cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TvCacheOptions {
    pub min_refresh_interval: Duration,
    pub search_criteria: SearchCriteria,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// How often the coordinating loop re-checks pause/stop state and
    /// picks up new submissions
    #[serde(default = "default_poll_interval", with = "duration_serde::duration")]
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedCacheConfig {
    /// Mirror entries to (and read entries from) the external shared cache
    #[serde(default = "default_shared_cache_enabled")]
    pub enabled: bool,
    /// Pending mirror writes beyond this are dropped
    #[serde(default = "default_mirror_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_mirror_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_mirror_retry_backoff", with = "duration_serde::duration")]
    pub retry_backoff: Duration,
}

// Database defaults
fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

// Cache defaults
fn default_min_refresh_interval() -> Duration {
    Duration::from_secs(DEFAULT_MIN_REFRESH_INTERVAL_SECS)
}

fn default_search_criteria() -> SearchCriteria {
    SearchCriteria::from([(DEFAULT_SEARCH_MODE.to_string(), vec![String::new()])])
}

// Queue defaults
fn default_poll_interval() -> Duration {
    Duration::from_millis(DEFAULT_QUEUE_POLL_INTERVAL_MS)
}

// Shared cache defaults
fn default_shared_cache_enabled() -> bool {
    DEFAULT_SHARED_CACHE_ENABLED
}

fn default_mirror_channel_capacity() -> usize {
    DEFAULT_MIRROR_CHANNEL_CAPACITY
}

fn default_mirror_max_attempts() -> u32 {
    DEFAULT_MIRROR_MAX_ATTEMPTS
}

fn default_mirror_retry_backoff() -> Duration {
    Duration::from_millis(DEFAULT_MIRROR_RETRY_BACKOFF_MS)
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: Some(DEFAULT_MAX_CONNECTIONS),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            min_refresh_interval: default_min_refresh_interval(),
            search_criteria: default_search_criteria(),
            providers: HashMap::new(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
        }
    }
}

impl Default for SharedCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_shared_cache_enabled(),
            channel_capacity: default_mirror_channel_capacity(),
            max_attempts: default_mirror_max_attempts(),
            retry_backoff: default_mirror_retry_backoff(),
        }
    }
}

impl CacheConfig {
    /// Resolve the effective options for one provider, applying any override
    pub fn options_for(&self, provider_id: &str) -> TvCacheOptions {
        let overrides = self.providers.get(provider_id);

        TvCacheOptions {
            min_refresh_interval: overrides
                .and_then(|o| o.min_refresh_interval)
                .unwrap_or(self.min_refresh_interval),
            search_criteria: overrides
                .and_then(|o| o.search_criteria.clone())
                .unwrap_or_else(|| self.search_criteria.clone()),
        }
    }
}

impl Default for TvCacheOptions {
    fn default() -> Self {
        CacheConfig::default().options_for("")
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file = std::env::var(format!("{ENV_PREFIX}CONFIG_FILE"))
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from_file(&config_file)
    }

    /// Load configuration from a TOML file, with `TV_CACHE_` environment
    /// variables layered on top. A missing file is created with defaults.
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if !Path::new(config_file).exists() {
            let contents = toml::to_string_pretty(&Self::default())?;
            std::fs::write(config_file, contents)
                .with_context(|| format!("Failed to write default config to {config_file}"))?;
            info!("Created default config file: {}", config_file);
        }

        let figment = Self::base_figment()
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    /// Extract configuration from an arbitrary figment
    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment
            .extract()
            .context("Failed to extract tv-cache configuration")
    }

    /// Figment seeded with the built-in defaults
    pub fn base_figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
    }
}
