//! Bundle selection
//!
//! [`BundleSelector`] ties the compatibility filters, the rollout gate and the
//! rollback detector together. Selection itself is the pure [`decide`]
//! function; the selector only performs the store reads and URL signing
//! around it.

use crate::fingerprint::{extract_ota_fingerprint, filter_compatible_fingerprints};
use crate::rollback::{needs_rollback, rollback_target};
use crate::rollout::is_bundle_eligible;
use crate::traits::{BundleStore, CandidateQuery, SignedUrlIssuer, TargetQuery};
use crate::version::filter_compatible_app_versions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use types::utils::sanitize_for_logging;
use types::{
    Bundle, DeviceTarget, RequestError, Result, UpdateInfo, UpdateRequest, UpdateStatus,
    UpdateStrategy,
};

/// Default lifetime of a signed download URL
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(60);

/// Engine settings fixed at process start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Targeting strategy every request must use
    pub strategy: UpdateStrategy,
    /// Lifetime of issued download URLs
    pub signed_url_ttl: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strategy: UpdateStrategy::AppVersion,
            signed_url_ttl: DEFAULT_SIGNED_URL_TTL,
        }
    }
}

/// Outcome of selection, before URL signing
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Nothing eligible for a device still on its embedded bundle
    NoOp,
    /// Device already runs the right bundle
    UpToDate,
    Update(Bundle),
    Rollback(Bundle),
    /// Discard all OTA state and run the embedded bundle
    NativeRollback,
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::NoOp => "no_op",
            Decision::UpToDate => "up_to_date",
            Decision::Update(_) => "update",
            Decision::Rollback(_) => "rollback",
            Decision::NativeRollback => "native_rollback",
        }
    }
}

/// Classify a request against its candidate rows
///
/// `candidates` holds every row matching platform, channel, cursor and
/// target compatibility, disabled ones included. Order does not matter.
pub fn decide(candidates: &[Bundle], request: &UpdateRequest) -> Decision {
    let current = request.current_bundle_id;

    let mut ranked: Vec<&Bundle> = candidates.iter().filter(|b| b.enabled).collect();
    ranked.sort_by(|a, b| b.id.cmp(&a.id));

    let winner = ranked
        .into_iter()
        .find(|b| is_bundle_eligible(b, request.device_id.as_deref()));

    match winner {
        None if current.is_nil() => return Decision::NoOp,
        Some(w) if w.id > current => return Decision::Update(w.clone()),
        Some(w) if w.id == current => return Decision::UpToDate,
        _ => {}
    }

    // Anything at or below the cursor is what shipped inside the binary
    if current <= request.min_bundle_id {
        return Decision::NoOp;
    }

    if !needs_rollback(candidates, current) {
        return Decision::UpToDate;
    }

    match rollback_target(candidates, current) {
        Some(target) => Decision::Rollback(target.clone()),
        None => Decision::NativeRollback,
    }
}

/// Resolves device check-ins into update decisions
pub struct BundleSelector {
    store: Arc<dyn BundleStore>,
    issuer: Arc<dyn SignedUrlIssuer>,
    config: ResolverConfig,
}

impl BundleSelector {
    pub fn new(
        store: Arc<dyn BundleStore>,
        issuer: Arc<dyn SignedUrlIssuer>,
        config: ResolverConfig,
    ) -> Self {
        info!(
            store = store.name(),
            issuer = issuer.name(),
            strategy = config.strategy.as_str(),
            "Bundle selector initialized"
        );
        Self {
            store,
            issuer,
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn strategy(&self) -> UpdateStrategy {
        self.config.strategy
    }

    /// Resolve a check-in; `None` means the device should do nothing
    pub async fn resolve(&self, request: &UpdateRequest) -> Result<Option<UpdateInfo>> {
        if request.strategy() != self.config.strategy {
            return Err(RequestError::StrategyMismatch {
                expected: self.config.strategy.as_str().to_string(),
                received: request.strategy().as_str().to_string(),
            }
            .into());
        }
        if let DeviceTarget::Fingerprint(fp) = &request.target {
            if extract_ota_fingerprint(fp).is_none() {
                return Err(RequestError::InvalidFingerprint { value: fp.clone() }.into());
            }
        }

        let target_query = TargetQuery {
            platform: request.platform,
            channel: request.channel.clone(),
            min_bundle_id: request.min_bundle_id,
            strategy: self.config.strategy,
        };

        let universe = self.store.list_distinct_targets(&target_query).await?;
        let compatible = match &request.target {
            DeviceTarget::AppVersion(version) => filter_compatible_app_versions(&universe, version),
            DeviceTarget::Fingerprint(fp) => filter_compatible_fingerprints(&universe, fp),
        };

        let candidates = if compatible.is_empty() {
            Vec::new()
        } else {
            let query = CandidateQuery::from_targets(&target_query, compatible);
            self.store.find_candidate_bundles(&query).await?
        };

        let decision = decide(&candidates, request);
        debug!(
            platform = %request.platform,
            channel = %request.channel,
            current_bundle_id = %request.current_bundle_id,
            device_id = request.device_id.as_deref().map(sanitize_for_logging),
            targets = universe.len(),
            candidates = candidates.len(),
            decision = decision.label(),
            "Resolved update check"
        );

        match decision {
            Decision::NoOp | Decision::UpToDate => Ok(None),
            Decision::Update(bundle) => self.signed(&bundle, UpdateStatus::Update).await.map(Some),
            Decision::Rollback(bundle) => {
                self.signed(&bundle, UpdateStatus::Rollback).await.map(Some)
            }
            Decision::NativeRollback => Ok(Some(UpdateInfo::native_rollback())),
        }
    }

    async fn signed(&self, bundle: &Bundle, status: UpdateStatus) -> Result<UpdateInfo> {
        let url = self
            .issuer
            .sign(&bundle.storage_uri, self.config.signed_url_ttl)
            .await?;
        let mut info = UpdateInfo::from_bundle(bundle, status);
        info.storage_uri = Some(url);
        Ok(info)
    }
}
