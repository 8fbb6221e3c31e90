use std::path::PathBuf;

use chrono::Duration;
use common_rust::env;

/// Tunables of the two-tier week cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Age after which a cached week is served but revalidated in the background
    pub soft_ttl: Duration,
    /// Age after which a cached week is treated as absent
    pub hard_ttl: Duration,
    /// Maximum number of weeks kept in memory
    pub memory_capacity: usize,
    /// Directory of the durable tier
    pub cache_dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let soft_ttl_minutes = env::get_parsed_or("SCHEDULE_SOFT_TTL_MINUTES", 5);
        let hard_ttl_hours = env::get_parsed_or("SCHEDULE_HARD_TTL_HOURS", 10);
        let memory_capacity = env::get_parsed_or("SCHEDULE_MEMORY_CAPACITY", 256);
        let cache_dir = env::get_or("SCHEDULE_CACHE_DIR", "./cache");

        Self {
            soft_ttl: Duration::minutes(soft_ttl_minutes),
            hard_ttl: Duration::hours(hard_ttl_hours),
            memory_capacity,
            cache_dir: cache_dir.into(),
        }
    }
}

impl CacheConfig {
    pub fn with_cache_dir(mut self, cache_dir: PathBuf) -> Self {
        self.cache_dir = cache_dir;
        self
    }
}

/// Upstream timetable API settings.
#[derive(Debug, Clone)]
pub struct RuzApiConfig {
    pub base_url: String,
    /// Value of the `lng` query parameter
    pub lng: u8,
    /// `chrono` format of the `start`/`finish` query parameters
    pub date_format: String,
    pub connect_timeout_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RuzApiConfig {
    fn default() -> Self {
        Self {
            base_url: env::get_or("RUZ_BASE_URL", "https://ruz.fa.ru/api"),
            lng: env::get_parsed_or("RUZ_LNG", 1),
            date_format: env::get_or("RUZ_DATE_FORMAT", "%d.%m.%Y"),
            connect_timeout_ms: env::get_parsed_or("GATEWAY_CONNECT_TIMEOUT", 1500),
            timeout_seconds: env::get_parsed_or("GATEWAY_TIMEOUT_SECONDS", 15),
        }
    }
}
