//! Collaborator interfaces consumed by the resolution engine

use async_trait::async_trait;
use std::time::Duration;
use types::{Bundle, BundleId, Platform, Result, UpdateStrategy};

/// Scope of the distinct-target lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetQuery {
    pub platform: Platform,
    pub channel: String,
    /// Rows with `id < min_bundle_id` are excluded
    pub min_bundle_id: BundleId,
    /// Selects the column: `target_app_version` or `fingerprint_hash`
    pub strategy: UpdateStrategy,
}

/// Scope of the candidate lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery {
    pub platform: Platform,
    pub channel: String,
    pub min_bundle_id: BundleId,
    pub strategy: UpdateStrategy,
    /// Exact-match list of target values already judged compatible
    pub compatible_targets: Vec<String>,
}

impl CandidateQuery {
    pub fn from_targets(query: &TargetQuery, compatible_targets: Vec<String>) -> Self {
        Self {
            platform: query.platform,
            channel: query.channel.clone(),
            min_bundle_id: query.min_bundle_id,
            strategy: query.strategy,
            compatible_targets,
        }
    }
}

/// Read side of a bundle database adapter
///
/// Backends without a semver operator only need exact-match filtering: the
/// engine fetches the distinct target values, judges compatibility itself and
/// hands the compatible subset back through [`CandidateQuery`].
#[async_trait]
pub trait BundleStore: Send + Sync {
    /// Distinct non-null target values for the strategy's column, enabled or not
    async fn list_distinct_targets(&self, query: &TargetQuery) -> Result<Vec<String>>;

    /// Every matching row, enabled or not, ordered by id descending
    async fn find_candidate_bundles(&self, query: &CandidateQuery) -> Result<Vec<Bundle>>;

    /// Newest enabled matching bundle
    async fn find_winning_bundle(&self, query: &CandidateQuery) -> Result<Option<Bundle>> {
        let candidates = self.find_candidate_bundles(query).await?;
        Ok(candidates.into_iter().find(|b| b.enabled))
    }

    /// Get the name of the backend
    fn name(&self) -> &str;
}

/// Turns an opaque storage URI into a short-lived downloadable URL
#[async_trait]
pub trait SignedUrlIssuer: Send + Sync {
    async fn sign(&self, storage_uri: &str, ttl: Duration) -> Result<String>;

    /// Get the name of the issuer
    fn name(&self) -> &str;
}
