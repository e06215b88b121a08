//! Error types for the hot update server

use thiserror::Error;

/// Main error type for the update server
#[derive(Error, Debug)]
pub enum UpdateServerError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or contradictory device/admin requests
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Bundle store (database adapter) errors
    #[error("Bundle store error: {0}")]
    Store(String),

    /// Storage adapter errors (URL signing)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Not found errors
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// Authentication/authorization errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for update server operations
pub type Result<T> = std::result::Result<T, UpdateServerError>;

/// Request validation errors, raised before any resolution runs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Missing required header: {name}")]
    MissingHeader { name: String },

    #[error("Header {name} is not valid UTF-8")]
    InvalidHeader { name: String },

    #[error("Headers {first} and {second} are mutually exclusive")]
    ConflictingHeaders { first: String, second: String },

    #[error("Server uses the {expected} strategy but the request targets {received}")]
    StrategyMismatch { expected: String, received: String },

    #[error("Invalid platform: {value}")]
    InvalidPlatform { value: String },

    #[error("Invalid bundle id for {field}: {value}")]
    InvalidBundleId { field: String, value: String },

    #[error("Invalid fingerprint hash: {value}")]
    InvalidFingerprint { value: String },

    #[error("Invalid bundle: {0}")]
    InvalidBundle(String),
}

/// Bundle store specific errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection failed
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// Constraint violation
    #[error("Database constraint violation: {0}")]
    ConstraintViolation(String),

    /// Record not found
    #[error("Bundle not found: {id}")]
    RecordNotFound { id: String },

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),
}

/// Storage adapter specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Storage URI is not `scheme://bucket/key`
    #[error("Invalid storage URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Signing service timed out
    #[error("Signing request timed out: {endpoint}")]
    Timeout { endpoint: String },

    /// Signing service answered with an error status
    #[error("HTTP error from signing service {endpoint}: {status}")]
    HttpError { endpoint: String, status: u16 },

    /// Signing service answered with an unusable body
    #[error("Invalid response from signing service {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    /// Local signing failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

/// Configuration specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Parse error
    #[error("Configuration parse error: {0}")]
    ParseError(String),

    /// Validation error
    #[error("Configuration validation error: {field}: {message}")]
    ValidationError { field: String, message: String },

    /// Missing required field
    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    /// Invalid value
    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

// Conversion implementations for common error types

impl From<RequestError> for UpdateServerError {
    fn from(err: RequestError) -> Self {
        UpdateServerError::InvalidRequest(err.to_string())
    }
}

impl From<StoreError> for UpdateServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RecordNotFound { id } => UpdateServerError::NotFound {
                resource: format!("bundle {}", id),
            },
            other => UpdateServerError::Store(other.to_string()),
        }
    }
}

impl From<StorageError> for UpdateServerError {
    fn from(err: StorageError) -> Self {
        UpdateServerError::Storage(err.to_string())
    }
}

impl From<ConfigError> for UpdateServerError {
    fn from(err: ConfigError) -> Self {
        UpdateServerError::Config(err.to_string())
    }
}
