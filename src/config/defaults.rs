/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Database defaults
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./tv-cache.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

// Cache defaults
pub const DEFAULT_MIN_REFRESH_INTERVAL_SECS: u64 = 10 * 60;
pub const DEFAULT_SEARCH_MODE: &str = "RSS";

// Queue defaults
pub const DEFAULT_QUEUE_POLL_INTERVAL_MS: u64 = 1000;

// Shared cache mirror defaults
pub const DEFAULT_SHARED_CACHE_ENABLED: bool = false;
pub const DEFAULT_MIRROR_CHANNEL_CAPACITY: usize = 256;
pub const DEFAULT_MIRROR_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_MIRROR_RETRY_BACKOFF_MS: u64 = 500;

// Environment
pub const ENV_PREFIX: &str = "TV_CACHE_";
pub const DEFAULT_CONFIG_FILE: &str = "tv-cache.toml";
