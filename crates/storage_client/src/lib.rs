//! Storage adapters for issuing bundle download URLs
//!
//! Bundles are stored under opaque `scheme://bucket/key` URIs. This crate turns
//! such URIs into short-lived download URLs, either by signing them locally
//! with a keyed hash or by asking a remote signing service.

pub mod remote;
pub mod signer;
pub mod uri;

pub use remote::*;
pub use signer::*;
pub use uri::*;
