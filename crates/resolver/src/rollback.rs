//! Rollback detection

use types::{Bundle, BundleId};

/// Whether a device running `current_bundle_id` must be rolled back
///
/// `candidates` must include disabled rows; a disabled current bundle is the
/// operator's rollback signal. Only enabled rows count towards the eligible
/// set, so a device whose bundle vanished rolls back even when unrelated
/// disabled rows still match.
pub fn needs_rollback(candidates: &[Bundle], current_bundle_id: BundleId) -> bool {
    if current_bundle_id.is_nil() {
        return false;
    }
    if !candidates.iter().any(|b| b.enabled) {
        return true;
    }

    match candidates.iter().find(|b| b.id == current_bundle_id) {
        Some(current) => !current.enabled,
        None => rollback_target(candidates, current_bundle_id).is_some(),
    }
}

/// Newest enabled bundle older than the current one
///
/// Rollout constraints are deliberately not consulted here.
pub fn rollback_target(candidates: &[Bundle], current_bundle_id: BundleId) -> Option<&Bundle> {
    candidates
        .iter()
        .filter(|b| b.enabled && b.id < current_bundle_id)
        .max_by_key(|b| b.id)
}
