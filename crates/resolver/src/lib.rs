//! Update resolution engine
//!
//! Decides, for a single device check-in, whether to serve a newer bundle,
//! roll the device back, or do nothing. Persistence and URL signing are
//! reached only through the [`BundleStore`] and [`SignedUrlIssuer`] traits.

pub mod fingerprint;
pub mod memory;
pub mod rollback;
pub mod rollout;
pub mod selector;
pub mod traits;
pub mod version;

pub use fingerprint::*;
pub use memory::InMemoryBundleStore;
pub use rollback::*;
pub use rollout::*;
pub use selector::*;
pub use traits::*;
pub use version::*;
