//! Staged rollout gate
//!
//! Eligibility is a pure function of the device id and the bundle's rollout
//! fields, so no per-device assignment is ever stored.

use types::Bundle;

/// 32-bit wrapping polynomial hash over UTF-16 code units
pub fn hash_device_id(device_id: &str) -> i32 {
    device_id
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Stable bucket in `0..100` for a device
pub fn device_bucket(device_id: &str) -> i32 {
    (hash_device_id(device_id) % 100).abs()
}

/// Whether a device may receive a bundle with the given rollout constraints
///
/// A non-empty `target_device_ids` list is authoritative and the percentage
/// is ignored.
pub fn is_device_eligible_for_update(
    device_id: &str,
    rollout_percentage: Option<i32>,
    target_device_ids: Option<&[String]>,
) -> bool {
    if let Some(ids) = target_device_ids.filter(|ids| !ids.is_empty()) {
        return ids.iter().any(|id| id == device_id);
    }

    match rollout_percentage {
        None => true,
        Some(p) if p >= 100 => true,
        Some(p) if p <= 0 => false,
        Some(p) => device_bucket(device_id) < p,
    }
}

/// Rollout gate applied to a bundle; without a device id every bundle passes
pub fn is_bundle_eligible(bundle: &Bundle, device_id: Option<&str>) -> bool {
    if !bundle.has_rollout_constraint() {
        return true;
    }
    match device_id {
        Some(device_id) => is_device_eligible_for_update(
            device_id,
            bundle.rollout_percentage,
            bundle.target_device_ids.as_deref(),
        ),
        None => true,
    }
}
