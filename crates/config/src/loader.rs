//! Configuration loader implementation

use crate::schema::{Config, StorageConfig};
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use std::path::Path;
use types::{ConfigError, UpdateServerError};

/// Prefix of environment variables that override file settings
pub const ENV_PREFIX: &str = "HOT_UPDATER_";

/// Minimum length of the local signing secret
pub const MIN_SIGNING_SECRET_LEN: usize = 16;

/// Configuration loader that handles YAML files and environment variables
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Config> {
        let config_path = config_path.as_ref();

        if !config_path.exists() {
            return Err(UpdateServerError::from(ConfigError::FileNotFound {
                path: config_path.display().to_string(),
            })
            .into());
        }

        let config: Config = Figment::new()
            .merge(Yaml::file(config_path))
            // HOT_UPDATER_STORAGE__SIGNING_SECRET -> storage.signing_secret
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(
                Env::raw()
                    .only(&["DATABASE_URL"])
                    .map(|_| "database.url".into()),
            )
            .extract()
            .context("Failed to parse configuration")?;

        Self::validate(&config)?;

        Ok(config)
    }

    /// Load configuration from string (for testing)
    pub fn load_from_str(yaml_content: &str) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Yaml::string(yaml_content))
            .extract()
            .context("Failed to parse configuration from string")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Reject configurations the server cannot run with
    pub fn validate(config: &Config) -> Result<()> {
        if config.update.default_channel.trim().is_empty() {
            return Err(invalid("update.default_channel", "Default channel cannot be empty"));
        }

        if config.update.signed_url_ttl_seconds == 0 {
            return Err(invalid(
                "update.signed_url_ttl_seconds",
                "Signed URL TTL must be greater than 0",
            ));
        }

        match &config.storage {
            StorageConfig::Local {
                public_base_url,
                signing_secret,
            } => {
                if !is_http_url(public_base_url) {
                    return Err(invalid(
                        "storage.public_base_url",
                        &format!("Invalid base URL format: {}", public_base_url),
                    ));
                }
                if signing_secret.len() < MIN_SIGNING_SECRET_LEN {
                    return Err(invalid(
                        "storage.signing_secret",
                        &format!(
                            "Signing secret must be at least {} characters",
                            MIN_SIGNING_SECRET_LEN
                        ),
                    ));
                }
            }
            StorageConfig::Remote {
                endpoint,
                timeout_seconds,
                ..
            } => {
                if !is_http_url(endpoint) {
                    return Err(invalid(
                        "storage.endpoint",
                        &format!("Invalid signing endpoint format: {}", endpoint),
                    ));
                }
                if *timeout_seconds == 0 {
                    return Err(invalid(
                        "storage.timeout_seconds",
                        "Timeout must be greater than 0",
                    ));
                }
            }
        }

        if config.server.port == 0 {
            return Err(invalid("server.port", "Server port cannot be 0"));
        }

        if config.server.max_body_size == 0 {
            return Err(invalid("server.max_body_size", "Max body size cannot be 0"));
        }

        if config.database.url.is_empty() {
            return Err(invalid("database.url", "Database URL cannot be empty"));
        }

        if config.database.max_connections == 0 {
            return Err(invalid(
                "database.max_connections",
                "Max connections cannot be 0",
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(invalid(
                "logging.level",
                &format!(
                    "Invalid log level: {}. Valid levels: {:?}",
                    config.logging.level, valid_log_levels
                ),
            ));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(invalid(
                "logging.format",
                &format!(
                    "Invalid log format: {}. Valid formats: {:?}",
                    config.logging.format, valid_log_formats
                ),
            ));
        }

        Ok(())
    }

    /// Get default configuration
    pub fn default() -> Config {
        Config::default()
    }

    /// Create example configuration file
    pub fn create_example<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Self::default();
        let yaml_content = serde_yaml::to_string(&config)
            .context("Failed to serialize default configuration")?;

        std::fs::write(path.as_ref(), yaml_content)
            .context("Failed to write example configuration file")?;

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn invalid(field: &str, message: &str) -> anyhow::Error {
    UpdateServerError::from(ConfigError::ValidationError {
        field: field.to_string(),
        message: message.to_string(),
    })
    .into()
}
