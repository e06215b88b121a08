//! Fingerprint matching for the fingerprint strategy

use std::collections::BTreeSet;
use types::utils::is_hex;

/// Hex length of a full native fingerprint (160 bits)
pub const NATIVE_FINGERPRINT_LEN: usize = 40;

/// Hex length of the OTA-relevant prefix
pub const OTA_FINGERPRINT_LEN: usize = 20;

/// Full 40-hex native fingerprint
pub fn is_valid_native_fingerprint(fingerprint: &str) -> bool {
    fingerprint.len() == NATIVE_FINGERPRINT_LEN && is_hex(fingerprint)
}

/// The first 20 hex characters, which cover only what OTA bundles depend on
pub fn extract_ota_fingerprint(fingerprint: &str) -> Option<&str> {
    let prefix = fingerprint.get(..OTA_FINGERPRINT_LEN)?;
    is_hex(prefix).then_some(prefix)
}

/// Two fingerprints can share bundles when their OTA prefixes agree
pub fn is_ota_compatible(a: Option<&str>, b: Option<&str>) -> bool {
    match (
        a.and_then(extract_ota_fingerprint),
        b.and_then(extract_ota_fingerprint),
    ) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

/// Subset of stored fingerprints compatible with the device's fingerprint
pub fn filter_compatible_fingerprints(fingerprints: &[String], device: &str) -> Vec<String> {
    let matching: BTreeSet<&str> = fingerprints
        .iter()
        .map(String::as_str)
        .filter(|fp| is_ota_compatible(Some(fp), Some(device)))
        .collect();
    matching.into_iter().map(str::to_string).collect()
}
