//! Process configuration.
//!
//! Settings come from serde defaults overridden by `REGIDB_*` environment
//! variables; startup reads them once before wiring subsystems.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8000)
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl HttpConfig {
    /// Returns the socket address string.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Metadata cache bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Maximum cached slugs (default: 128)
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Entry lifetime in seconds (default: 60)
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_capacity() -> usize {
    128
}

fn default_cache_ttl_secs() -> u64 {
    60
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            capacity: settings.capacity,
            ttl: Duration::from_secs(settings.ttl_secs),
        }
    }
}

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// HTTP bind settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Metadata cache bounds
    #[serde(default)]
    pub cache: CacheSettings,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            cache: CacheSettings::default(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Settings {
    /// Loads defaults, then applies `REGIDB_*` environment overrides.
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Ok(host) = std::env::var("REGIDB_HOST") {
            settings.http.host = host;
        }
        if let Some(port) = env_parse("REGIDB_PORT") {
            settings.http.port = port;
        }
        if let Some(capacity) = env_parse("REGIDB_CACHE_CAPACITY") {
            settings.cache.capacity = capacity;
        }
        if let Some(ttl) = env_parse("REGIDB_CACHE_TTL_SECS") {
            settings.cache.ttl_secs = ttl;
        }
        if let Some(timeout) = env_parse("REGIDB_REQUEST_TIMEOUT_SECS") {
            settings.request_timeout_secs = timeout;
        }

        settings
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}
