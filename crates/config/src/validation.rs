//! Configuration validation utilities

use crate::loader::MIN_SIGNING_SECRET_LEN;
use crate::schema::{Config, StorageConfig, EXAMPLE_SIGNING_SECRET};
use types::Result;

/// Signed URLs living longer than this are flagged
const LONG_SIGNED_URL_TTL_SECONDS: u64 = 3600;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate complete configuration
    pub fn validate(config: &Config) -> Result<ValidationReport> {
        let mut report = ValidationReport::new();

        Self::validate_update(config, &mut report);
        Self::validate_storage(config, &mut report);
        Self::validate_server(config, &mut report);
        Self::validate_database(config, &mut report);
        Self::validate_logging(config, &mut report);
        Self::validate_security(config, &mut report);

        Ok(report)
    }

    fn validate_update(config: &Config, report: &mut ValidationReport) {
        let ttl = config.update.signed_url_ttl_seconds;
        if ttl == 0 {
            report.add_error("update.signed_url_ttl_seconds", "Signed URL TTL cannot be 0");
        } else if ttl > LONG_SIGNED_URL_TTL_SECONDS {
            report.add_warning(
                "update.signed_url_ttl_seconds",
                &format!("Signed URLs stay valid for a long time ({}s)", ttl),
            );
        }

        if config.update.default_channel.trim().is_empty() {
            report.add_error("update.default_channel", "Default channel cannot be empty");
        }
    }

    fn validate_storage(config: &Config, report: &mut ValidationReport) {
        match &config.storage {
            StorageConfig::Local {
                public_base_url,
                signing_secret,
            } => {
                if public_base_url.starts_with("http://") {
                    report.add_warning(
                        "storage.public_base_url",
                        "Bundle downloads are served over plain HTTP",
                    );
                }
                if signing_secret.len() < MIN_SIGNING_SECRET_LEN {
                    report.add_error("storage.signing_secret", "Signing secret is too short");
                } else if signing_secret == EXAMPLE_SIGNING_SECRET {
                    report.add_warning(
                        "storage.signing_secret",
                        "Signing secret is still the example value",
                    );
                }
            }
            StorageConfig::Remote {
                endpoint,
                api_key,
                timeout_seconds,
            } => {
                if endpoint.starts_with("http://") {
                    report.add_warning("storage.endpoint", "Signing endpoint should use HTTPS");
                }
                if api_key.is_none() {
                    report.add_warning(
                        "storage.api_key",
                        "No API key configured for the signing endpoint",
                    );
                }
                if *timeout_seconds == 0 {
                    report.add_error("storage.timeout_seconds", "Timeout cannot be 0");
                } else if *timeout_seconds >= config.server.request_timeout_seconds {
                    report.add_warning(
                        "storage.timeout_seconds",
                        "Signing timeout is not shorter than the request timeout",
                    );
                }
            }
        }
    }

    fn validate_server(config: &Config, report: &mut ValidationReport) {
        if config.server.port == 0 {
            report.add_error("server.port", "Server port cannot be 0");
        } else if config.server.port < 1024 {
            report.add_warning("server.port", "Server port is below 1024, may require elevated privileges");
        }

        if config.server.request_timeout_seconds == 0 {
            report.add_error("server.request_timeout_seconds", "Request timeout cannot be 0");
        } else if config.server.request_timeout_seconds > 300 {
            report.add_warning("server.request_timeout_seconds", "Request timeout is very high");
        }

        if config.server.max_body_size == 0 {
            report.add_error("server.max_body_size", "Max body size cannot be 0");
        } else if config.server.max_body_size > 10 * 1024 * 1024 {
            report.add_warning("server.max_body_size", "Max body size is greater than 10MB");
        }

        if config.server.host.is_empty() {
            report.add_error("server.host", "Server host cannot be empty");
        }
    }

    fn validate_database(config: &Config, report: &mut ValidationReport) {
        if config.database.url.is_empty() {
            report.add_error("database.url", "Database URL cannot be empty");
        } else if !config.database.url.starts_with("sqlite:") {
            report.add_warning("database.url", "Only SQLite is currently supported");
        }

        if config.database.max_connections == 0 {
            report.add_error("database.max_connections", "Max connections cannot be 0");
        } else if config.database.max_connections > 100 {
            report.add_warning("database.max_connections", "Max connections is very high");
        }

        if config.database.connection_timeout_seconds == 0 {
            report.add_error("database.connection_timeout_seconds", "Connection timeout cannot be 0");
        }
    }

    fn validate_logging(config: &Config, report: &mut ValidationReport) {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.logging.level.as_str()) {
            report.add_error("logging.level", &format!("Invalid log level: {}. Valid levels: {:?}", config.logging.level, valid_levels));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&config.logging.format.as_str()) {
            report.add_error("logging.format", &format!("Invalid log format: {}. Valid formats: {:?}", config.logging.format, valid_formats));
        }

        if config.logging.level == "trace" || config.logging.level == "debug" {
            report.add_warning("logging.level", "Debug/trace logging logs every update decision");
        }
    }

    fn validate_security(config: &Config, report: &mut ValidationReport) {
        match config.security.admin_api_key.as_deref() {
            None => report.add_warning(
                "security.admin_api_key",
                "No admin API key configured, admin endpoints will reject every request",
            ),
            Some(key) if key.len() < 16 => report.add_warning(
                "security.admin_api_key",
                "Admin API key is short, consider using a longer key",
            ),
            Some(_) => {}
        }
    }
}

/// Validation report containing errors and warnings
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// A validation issue (error or warning)
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn summary(&self) -> String {
        format!("Validation: {} errors, {} warnings", self.errors.len(), self.warnings.len())
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}
