//! Configuration schema definitions

use resolver::ResolverConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use types::{UpdateStrategy, DEFAULT_CHANNEL};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Update resolution settings
    #[serde(default)]
    pub update: UpdateConfig,
    /// Storage adapter used to sign download URLs
    #[serde(default)]
    pub storage: StorageConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Security configuration
    #[serde(default)]
    pub security: SecurityConfig,
}

/// Update resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Targeting strategy (appVersion or fingerprint)
    #[serde(default)]
    pub strategy: UpdateStrategy,
    /// Channel assumed when a device sends none
    #[serde(default = "default_channel")]
    pub default_channel: String,
    /// Lifetime of signed download URLs
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_seconds: u64,
}

/// Storage adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Sign URLs in-process with a keyed hash
    Local {
        /// Base URL the bundle files are served from
        public_base_url: String,
        /// Secret the signing key is derived from
        signing_secret: String,
    },
    /// Ask a remote signing service for URLs
    Remote {
        /// Signing endpoint
        endpoint: String,
        /// Bearer token sent to the endpoint
        #[serde(default)]
        api_key: Option<String>,
        /// Request timeout in seconds
        #[serde(default = "default_storage_timeout")]
        timeout_seconds: u64,
    },
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
    /// Enable WAL mode for SQLite
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Enable request logging
    #[serde(default = "default_true")]
    pub request_logging: bool,
}

/// Security configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Key required in `x-api-key` for admin routes
    pub admin_api_key: Option<String>,
}

/// Secret written into generated example configs
pub const EXAMPLE_SIGNING_SECRET: &str = "replace-with-a-long-random-secret";

fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

fn default_signed_url_ttl() -> u64 {
    60
}

fn default_storage_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_body_size() -> usize {
    1024 * 1024 // 1MB
}

fn default_database_url() -> String {
    "sqlite:data/hot_updater.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Config {
    /// Engine settings derived from the `update` section
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            strategy: self.update.strategy,
            signed_url_ttl: Duration::from_secs(self.update.signed_url_ttl_seconds),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            update: UpdateConfig::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            strategy: UpdateStrategy::default(),
            default_channel: default_channel(),
            signed_url_ttl_seconds: default_signed_url_ttl(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Local {
            public_base_url: "http://localhost:8080/files".to_string(),
            signing_secret: EXAMPLE_SIGNING_SECRET.to_string(),
        }
    }
}

impl StorageConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            StorageConfig::Local { .. } => "local",
            StorageConfig::Remote { .. } => "remote",
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
            max_body_size: default_max_body_size(),
            cors_enabled: default_true(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connection_timeout_seconds: default_connection_timeout(),
            wal_mode: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            request_logging: default_true(),
        }
    }
}
