//! Bundle-related types and structures

use crate::error::RequestError;
use crate::update::UpdateStrategy;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique, time-ordered identifier for a bundle (UUIDv7)
pub type BundleId = Uuid;

/// Sentinel id meaning "no OTA bundle applied yet"
pub const NIL_ID: BundleId = Uuid::nil();

/// Channel used when a device does not name one
pub const DEFAULT_CHANNEL: &str = "production";

/// Generate a new time-ordered bundle id
pub fn new_bundle_id() -> BundleId {
    Uuid::now_v7()
}

/// Decode the creation time embedded in a UUIDv7 bundle id
pub fn bundle_created_at(id: &BundleId) -> Option<DateTime<Utc>> {
    if id.get_version_num() != 7 {
        return None;
    }
    let bytes = id.as_bytes();
    let millis = bytes[..6]
        .iter()
        .fold(0i64, |acc, b| (acc << 8) | i64::from(*b));
    Utc.timestamp_millis_opt(millis).single()
}

/// Parse a bundle id from its textual form
pub fn parse_bundle_id(field: &str, value: &str) -> Result<BundleId, RequestError> {
    Uuid::parse_str(value.trim()).map_err(|_| RequestError::InvalidBundleId {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Native platform a bundle is built for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
        }
    }
}

impl FromStr for Platform {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            other => Err(RequestError::InvalidPlatform {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployable JavaScript bundle
///
/// Bundles are immutable once deployed, except for `enabled`, which operators
/// flip to roll a release back (or restore it) without creating a new row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Time-ordered bundle identifier
    pub id: BundleId,
    /// Target platform
    pub platform: Platform,
    /// Visibility partition (production, staging, ...)
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Semver range of native app versions, appVersion strategy only
    #[serde(default)]
    pub target_app_version: Option<String>,
    /// 160-bit native fingerprint in hex, fingerprint strategy only
    #[serde(default)]
    pub fingerprint_hash: Option<String>,
    /// Device must apply this bundle before continuing
    #[serde(default)]
    pub should_force_update: bool,
    /// Disabled bundles are never served and trigger rollbacks
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Opaque storage locator (`scheme://bucket/key`)
    pub storage_uri: String,
    /// Hash of the bundle archive
    #[serde(default)]
    pub file_hash: String,
    #[serde(default)]
    pub git_commit_hash: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    /// Percentage of devices that receive this bundle (null = everyone)
    #[serde(default)]
    pub rollout_percentage: Option<i32>,
    /// Explicit allow-list; when non-empty it overrides the percentage
    #[serde(default)]
    pub target_device_ids: Option<Vec<String>>,
    /// Detached bundle signature, passed through untouched
    #[serde(default)]
    pub signature: Option<String>,
}

fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

fn default_enabled() -> bool {
    true
}

impl Bundle {
    /// Create an enabled bundle with no targeting and no rollout constraint
    pub fn new(
        id: BundleId,
        platform: Platform,
        channel: impl Into<String>,
        storage_uri: impl Into<String>,
    ) -> Self {
        Self {
            id,
            platform,
            channel: channel.into(),
            target_app_version: None,
            fingerprint_hash: None,
            should_force_update: false,
            enabled: true,
            storage_uri: storage_uri.into(),
            file_hash: String::new(),
            git_commit_hash: None,
            message: None,
            metadata: None,
            rollout_percentage: None,
            target_device_ids: None,
            signature: None,
        }
    }

    /// Target this bundle at a semver range of native app versions
    pub fn with_target_app_version(mut self, range: impl Into<String>) -> Self {
        self.target_app_version = Some(range.into());
        self.fingerprint_hash = None;
        self
    }

    /// Target this bundle at a native build fingerprint
    pub fn with_fingerprint_hash(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint_hash = Some(fingerprint.into());
        self.target_app_version = None;
        self
    }

    /// Attach staged-rollout constraints
    pub fn with_rollout(mut self, percentage: Option<i32>, device_ids: Option<Vec<String>>) -> Self {
        self.rollout_percentage = percentage;
        self.target_device_ids = device_ids;
        self
    }

    /// The targeting value this bundle carries for the given strategy
    pub fn target_value(&self, strategy: UpdateStrategy) -> Option<&str> {
        match strategy {
            UpdateStrategy::AppVersion => self.target_app_version.as_deref(),
            UpdateStrategy::Fingerprint => self.fingerprint_hash.as_deref(),
        }
    }

    /// Whether serving this bundle depends on the requesting device
    pub fn has_rollout_constraint(&self) -> bool {
        let has_targets = self
            .target_device_ids
            .as_ref()
            .is_some_and(|ids| !ids.is_empty());
        let partial = self.rollout_percentage.is_some_and(|p| p < 100);
        has_targets || partial
    }

    /// Creation time decoded from the id
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        bundle_created_at(&self.id)
    }

    /// Check that exactly the target column of `strategy` is populated
    pub fn validate_target(&self, strategy: UpdateStrategy) -> Result<(), RequestError> {
        if self.id.is_nil() {
            return Err(RequestError::InvalidBundle(
                "bundle id must not be the nil id".to_string(),
            ));
        }
        if self.storage_uri.trim().is_empty() {
            return Err(RequestError::InvalidBundle(format!(
                "bundle {} has an empty storageUri",
                self.id
            )));
        }
        let populated = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        match (
            populated(&self.target_app_version),
            populated(&self.fingerprint_hash),
            strategy,
        ) {
            (true, false, UpdateStrategy::AppVersion) | (false, true, UpdateStrategy::Fingerprint) => {
                Ok(())
            }
            (true, true, _) => Err(RequestError::InvalidBundle(format!(
                "bundle {} sets both targetAppVersion and fingerprintHash",
                self.id
            ))),
            _ => Err(RequestError::InvalidBundle(format!(
                "bundle {} must set {} for the {} strategy",
                self.id,
                strategy.target_field(),
                strategy.as_str()
            ))),
        }
    }
}
