//! In-memory bundle store

use crate::traits::{BundleStore, CandidateQuery, TargetQuery};
use async_trait::async_trait;
use std::collections::BTreeSet;
use tokio::sync::RwLock;
use types::{Bundle, BundleId, Platform, Result, UpdateStrategy};

/// Vector-backed [`BundleStore`] for tests and ephemeral deployments
#[derive(Debug, Default)]
pub struct InMemoryBundleStore {
    bundles: RwLock<Vec<Bundle>>,
}

impl InMemoryBundleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bundles(bundles: Vec<Bundle>) -> Self {
        Self {
            bundles: RwLock::new(bundles),
        }
    }

    /// Flip the enabled flag; returns false when the bundle does not exist
    pub async fn set_enabled(&self, id: BundleId, enabled: bool) -> bool {
        let mut bundles = self.bundles.write().await;
        match bundles.iter_mut().find(|b| b.id == id) {
            Some(bundle) => {
                bundle.enabled = enabled;
                true
            }
            None => false,
        }
    }
}

fn in_scope(
    bundle: &Bundle,
    platform: Platform,
    channel: &str,
    min_bundle_id: BundleId,
) -> bool {
    bundle.platform == platform && bundle.channel == channel && bundle.id >= min_bundle_id
}

fn target_of(bundle: &Bundle, strategy: UpdateStrategy) -> Option<&str> {
    bundle.target_value(strategy).filter(|v| !v.is_empty())
}

#[async_trait]
impl BundleStore for InMemoryBundleStore {
    async fn list_distinct_targets(&self, query: &TargetQuery) -> Result<Vec<String>> {
        let bundles = self.bundles.read().await;
        let targets: BTreeSet<&str> = bundles
            .iter()
            .filter(|b| in_scope(b, query.platform, &query.channel, query.min_bundle_id))
            .filter_map(|b| target_of(b, query.strategy))
            .collect();
        Ok(targets.into_iter().map(str::to_string).collect())
    }

    async fn find_candidate_bundles(&self, query: &CandidateQuery) -> Result<Vec<Bundle>> {
        let bundles = self.bundles.read().await;
        let mut candidates: Vec<Bundle> = bundles
            .iter()
            .filter(|b| in_scope(b, query.platform, &query.channel, query.min_bundle_id))
            .filter(|b| {
                target_of(b, query.strategy)
                    .is_some_and(|t| query.compatible_targets.iter().any(|c| c == t))
            })
            .cloned()
            .collect();
        candidates.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(candidates)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
