//! Update request and decision types

use crate::bundle::{Bundle, BundleId, Platform, NIL_ID};
use serde::{Deserialize, Serialize};

/// How bundles are matched to native builds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum UpdateStrategy {
    /// Match on a semver range of the native app version
    #[default]
    AppVersion,
    /// Match on the OTA part of the native build fingerprint
    Fingerprint,
}

impl UpdateStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStrategy::AppVersion => "appVersion",
            UpdateStrategy::Fingerprint => "fingerprint",
        }
    }

    /// Bundle field that carries the targeting value
    pub fn target_field(&self) -> &'static str {
        match self {
            UpdateStrategy::AppVersion => "targetAppVersion",
            UpdateStrategy::Fingerprint => "fingerprintHash",
        }
    }
}

/// What the device reports about its native build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTarget {
    AppVersion(String),
    Fingerprint(String),
}

impl DeviceTarget {
    pub fn strategy(&self) -> UpdateStrategy {
        match self {
            DeviceTarget::AppVersion(_) => UpdateStrategy::AppVersion,
            DeviceTarget::Fingerprint(_) => UpdateStrategy::Fingerprint,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            DeviceTarget::AppVersion(v) | DeviceTarget::Fingerprint(v) => v,
        }
    }
}

/// A single device check-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub platform: Platform,
    pub channel: String,
    /// Bundle the device is running now (`NIL_ID` for the embedded bundle)
    pub current_bundle_id: BundleId,
    /// Cursor baked into the native binary; older bundles are never served
    pub min_bundle_id: BundleId,
    /// Rollout subject; when absent the rollout gate is bypassed
    pub device_id: Option<String>,
    pub target: DeviceTarget,
}

impl UpdateRequest {
    pub fn new(platform: Platform, channel: impl Into<String>, target: DeviceTarget) -> Self {
        Self {
            platform,
            channel: channel.into(),
            current_bundle_id: NIL_ID,
            min_bundle_id: NIL_ID,
            device_id: None,
            target,
        }
    }

    pub fn with_current_bundle(mut self, id: BundleId) -> Self {
        self.current_bundle_id = id;
        self
    }

    pub fn with_min_bundle(mut self, id: BundleId) -> Self {
        self.min_bundle_id = id;
        self
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn strategy(&self) -> UpdateStrategy {
        self.target.strategy()
    }
}

/// Action the device must take
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateStatus {
    Update,
    Rollback,
}

impl UpdateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStatus::Update => "UPDATE",
            UpdateStatus::Rollback => "ROLLBACK",
        }
    }
}

/// Update decision returned to the device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    pub id: BundleId,
    pub should_force_update: bool,
    pub status: UpdateStatus,
    pub message: Option<String>,
    /// Downloadable URL once signed; null for a native rollback
    pub storage_uri: Option<String>,
    pub file_hash: Option<String>,
    /// Detached bundle signature for clients that verify downloads
    pub signature: Option<String>,
}

impl UpdateInfo {
    /// Decision pointing at a stored bundle. Rollbacks are always forced.
    pub fn from_bundle(bundle: &Bundle, status: UpdateStatus) -> Self {
        Self {
            id: bundle.id,
            should_force_update: status == UpdateStatus::Rollback || bundle.should_force_update,
            status,
            message: bundle.message.clone(),
            storage_uri: Some(bundle.storage_uri.clone()),
            file_hash: Some(bundle.file_hash.clone()),
            signature: bundle.signature.clone(),
        }
    }

    /// Discard all OTA state and run the bundle embedded in the native binary
    pub fn native_rollback() -> Self {
        Self {
            id: NIL_ID,
            should_force_update: true,
            status: UpdateStatus::Rollback,
            message: None,
            storage_uri: None,
            file_hash: None,
            signature: None,
        }
    }

    pub fn is_native_rollback(&self) -> bool {
        self.id.is_nil() && self.status == UpdateStatus::Rollback
    }
}
