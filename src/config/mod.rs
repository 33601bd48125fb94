//! Configuration management
//!
//! Configuration is loaded from `config.yml` and can be overridden with
//! `LOSTLIBRARY_*` environment variables. Missing values fall back to defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub feed: FeedConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (cookie auth needs an explicit origin)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, `sqlite:` URL or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "data/lostlibrary.db".to_string()
}

fn default_max_connections() -> u32 {
    20
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Maximum number of cached entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_ttl() -> u64 {
    3600
}

fn default_max_capacity() -> u64 {
    10_000
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in days
    #[serde(default = "default_session_days")]
    pub session_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_days: default_session_days(),
        }
    }
}

fn default_session_days() -> i64 {
    7
}

/// Feed pagination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Default page size for the "for you" feed
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Fixed page size for the following feed
    #[serde(default = "default_following_page_size")]
    pub following_page_size: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            following_page_size: default_following_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    10
}

fn default_following_page_size() -> u32 {
    6
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file.
    ///
    /// A missing or empty file yields the defaults. Invalid YAML is an error
    /// carrying the line and column.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file, then apply environment overrides:
    ///
    /// - LOSTLIBRARY_SERVER_HOST / _PORT / _CORS_ORIGIN
    /// - LOSTLIBRARY_DATABASE_URL / _MAX_CONNECTIONS
    /// - LOSTLIBRARY_CACHE_TTL_SECONDS
    /// - LOSTLIBRARY_AUTH_SESSION_DAYS
    /// - LOSTLIBRARY_FEED_PAGE_SIZE / _FOLLOWING_PAGE_SIZE
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("LOSTLIBRARY_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("LOSTLIBRARY_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(cors_origin) = std::env::var("LOSTLIBRARY_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(url) = std::env::var("LOSTLIBRARY_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(max) = env_parse::<u32>("LOSTLIBRARY_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = max;
        }

        if let Some(ttl) = env_parse::<u64>("LOSTLIBRARY_CACHE_TTL_SECONDS") {
            self.cache.ttl_seconds = ttl;
        }

        if let Some(days) = env_parse::<i64>("LOSTLIBRARY_AUTH_SESSION_DAYS") {
            self.auth.session_days = days;
        }

        if let Some(size) = env_parse::<u32>("LOSTLIBRARY_FEED_PAGE_SIZE") {
            self.feed.page_size = size;
        }
        if let Some(size) = env_parse::<u32>("LOSTLIBRARY_FEED_FOLLOWING_PAGE_SIZE") {
            self.feed.following_page_size = size;
        }
    }

    /// Reject values the server cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be non-zero".to_string(),
            ));
        }
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "database.url cannot be empty".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.auth.session_days <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.session_days must be positive".to_string(),
            ));
        }
        for (name, size) in [
            ("feed.page_size", self.feed.page_size),
            ("feed.following_page_size", self.feed.following_page_size),
        ] {
            if size == 0 || size > 100 {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be between 1 and 100",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Parse an environment variable, ignoring unset or malformed values
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

/// Format YAML parsing error with location
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Tests that touch the process environment hold this lock.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(30))]

        #[test]
        fn page_size_validation_bounds(size in 0u32..300) {
            let mut config = Config::default();
            config.feed.page_size = size;
            prop_assert_eq!(config.validate().is_ok(), (1..=100).contains(&size));
        }
    }
}
