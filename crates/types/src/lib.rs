//! Shared types for the hot update server
//!
//! This crate contains the domain types shared by the resolution engine, the
//! storage adapters and the HTTP server: bundles, update requests and the
//! update decision returned to devices.

pub mod bundle;
pub mod error;
pub mod update;
pub mod utils;

// Re-export commonly used types
pub use bundle::*;
pub use error::{ConfigError, RequestError, Result, StorageError, StoreError, UpdateServerError};
pub use update::*;
