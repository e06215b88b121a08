//! Turning device transports into update requests

use axum::http::HeaderMap;
use types::{
    parse_bundle_id, DeviceTarget, Platform, RequestError, UpdateRequest, UpdateStrategy, NIL_ID,
};

pub const BUNDLE_ID_HEADER: &str = "x-bundle-id";
pub const PLATFORM_HEADER: &str = "x-app-platform";
pub const APP_VERSION_HEADER: &str = "x-app-version";
pub const FINGERPRINT_HEADER: &str = "x-fingerprint-hash";
pub const CHANNEL_HEADER: &str = "x-channel";
pub const MIN_BUNDLE_ID_HEADER: &str = "x-min-bundle-id";
pub const DEVICE_ID_HEADER: &str = "x-device-id";

/// Non-empty, trimmed header value
fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, RequestError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => {
            let value = value.to_str().map_err(|_| RequestError::InvalidHeader {
                name: name.to_string(),
            })?;
            let value = value.trim();
            Ok((!value.is_empty()).then_some(value))
        }
    }
}

fn required<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, RequestError> {
    header(headers, name)?.ok_or_else(|| RequestError::MissingHeader {
        name: name.to_string(),
    })
}

/// Parse the header transport of `GET /api/check-update`
///
/// Exactly one of `x-app-version` / `x-fingerprint-hash` may be sent, and it
/// must be the one the server's strategy uses.
pub fn from_headers(
    headers: &HeaderMap,
    strategy: UpdateStrategy,
    default_channel: &str,
) -> Result<UpdateRequest, RequestError> {
    let current_bundle_id = parse_bundle_id(BUNDLE_ID_HEADER, required(headers, BUNDLE_ID_HEADER)?)?;
    let platform: Platform = required(headers, PLATFORM_HEADER)?.parse()?;

    let app_version = header(headers, APP_VERSION_HEADER)?;
    let fingerprint = header(headers, FINGERPRINT_HEADER)?;
    let target = match (app_version, fingerprint, strategy) {
        (Some(_), Some(_), _) => {
            return Err(RequestError::ConflictingHeaders {
                first: APP_VERSION_HEADER.to_string(),
                second: FINGERPRINT_HEADER.to_string(),
            })
        }
        (Some(v), None, UpdateStrategy::AppVersion) => DeviceTarget::AppVersion(v.to_string()),
        (None, Some(f), UpdateStrategy::Fingerprint) => DeviceTarget::Fingerprint(f.to_string()),
        (Some(_), None, UpdateStrategy::Fingerprint) | (None, Some(_), UpdateStrategy::AppVersion) => {
            return Err(RequestError::StrategyMismatch {
                expected: strategy.as_str().to_string(),
                received: if app_version.is_some() {
                    UpdateStrategy::AppVersion.as_str().to_string()
                } else {
                    UpdateStrategy::Fingerprint.as_str().to_string()
                },
            })
        }
        (None, None, UpdateStrategy::AppVersion) => {
            return Err(RequestError::MissingHeader {
                name: APP_VERSION_HEADER.to_string(),
            })
        }
        (None, None, UpdateStrategy::Fingerprint) => {
            return Err(RequestError::MissingHeader {
                name: FINGERPRINT_HEADER.to_string(),
            })
        }
    };

    let channel = header(headers, CHANNEL_HEADER)?.unwrap_or(default_channel);
    let min_bundle_id = match header(headers, MIN_BUNDLE_ID_HEADER)? {
        Some(raw) => parse_bundle_id(MIN_BUNDLE_ID_HEADER, raw)?,
        None => NIL_ID,
    };

    let mut request = UpdateRequest::new(platform, channel, target)
        .with_current_bundle(current_bundle_id)
        .with_min_bundle(min_bundle_id);
    if let Some(device_id) = header(headers, DEVICE_ID_HEADER)? {
        request = request.with_device_id(device_id);
    }
    Ok(request)
}

/// Segments shared by the path-style routes
#[derive(Debug, Clone)]
pub struct PathSegments {
    pub platform: String,
    pub target: String,
    pub channel: String,
    pub min_bundle_id: String,
    pub bundle_id: String,
    pub device_id: Option<String>,
}

impl PathSegments {
    pub fn into_request(
        self,
        strategy: UpdateStrategy,
        default_channel: &str,
    ) -> Result<UpdateRequest, RequestError> {
        let platform: Platform = self.platform.parse()?;
        let target = match strategy {
            UpdateStrategy::AppVersion => DeviceTarget::AppVersion(self.target),
            UpdateStrategy::Fingerprint => DeviceTarget::Fingerprint(self.target),
        };
        let channel = if self.channel.trim().is_empty() {
            default_channel
        } else {
            self.channel.trim()
        };

        let mut request = UpdateRequest::new(platform, channel, target)
            .with_current_bundle(parse_bundle_id("bundleId", &self.bundle_id)?)
            .with_min_bundle(parse_bundle_id("minBundleId", &self.min_bundle_id)?);
        if let Some(device_id) = self.device_id.filter(|d| !d.trim().is_empty()) {
            request = request.with_device_id(device_id);
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const BUNDLE: &str = "0190a1b2-c3d4-7e5f-8a9b-0c1d2e3f4a5b";

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_app_version_headers() {
        let map = headers(&[
            (BUNDLE_ID_HEADER, BUNDLE),
            (PLATFORM_HEADER, "ios"),
            (APP_VERSION_HEADER, "1.2.0"),
            (DEVICE_ID_HEADER, "device-a"),
        ]);

        let request = from_headers(&map, UpdateStrategy::AppVersion, "production").unwrap();
        assert_eq!(request.platform, Platform::Ios);
        assert_eq!(request.channel, "production");
        assert_eq!(request.current_bundle_id.to_string(), BUNDLE);
        assert_eq!(request.min_bundle_id, NIL_ID);
        assert_eq!(request.device_id.as_deref(), Some("device-a"));
        assert_eq!(request.target, DeviceTarget::AppVersion("1.2.0".to_string()));
    }

    #[test]
    fn test_missing_required_headers() {
        let map = headers(&[(PLATFORM_HEADER, "ios"), (APP_VERSION_HEADER, "1.0.0")]);
        assert_eq!(
            from_headers(&map, UpdateStrategy::AppVersion, "production").unwrap_err(),
            RequestError::MissingHeader { name: BUNDLE_ID_HEADER.to_string() }
        );

        let map = headers(&[(BUNDLE_ID_HEADER, BUNDLE), (PLATFORM_HEADER, "ios")]);
        assert_eq!(
            from_headers(&map, UpdateStrategy::Fingerprint, "production").unwrap_err(),
            RequestError::MissingHeader { name: FINGERPRINT_HEADER.to_string() }
        );
    }

    #[test]
    fn test_conflicting_and_mismatched_targets() {
        let both = headers(&[
            (BUNDLE_ID_HEADER, BUNDLE),
            (PLATFORM_HEADER, "android"),
            (APP_VERSION_HEADER, "1.0.0"),
            (FINGERPRINT_HEADER, "0123456789abcdef0123"),
        ]);
        assert!(matches!(
            from_headers(&both, UpdateStrategy::AppVersion, "production"),
            Err(RequestError::ConflictingHeaders { .. })
        ));

        let fingerprint_only = headers(&[
            (BUNDLE_ID_HEADER, BUNDLE),
            (PLATFORM_HEADER, "android"),
            (FINGERPRINT_HEADER, "0123456789abcdef0123"),
        ]);
        assert!(matches!(
            from_headers(&fingerprint_only, UpdateStrategy::AppVersion, "production"),
            Err(RequestError::StrategyMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_values() {
        let bad_platform = headers(&[
            (BUNDLE_ID_HEADER, BUNDLE),
            (PLATFORM_HEADER, "web"),
            (APP_VERSION_HEADER, "1.0.0"),
        ]);
        assert!(matches!(
            from_headers(&bad_platform, UpdateStrategy::AppVersion, "production"),
            Err(RequestError::InvalidPlatform { .. })
        ));

        let bad_id = headers(&[
            (BUNDLE_ID_HEADER, "not-a-uuid"),
            (PLATFORM_HEADER, "ios"),
            (APP_VERSION_HEADER, "1.0.0"),
        ]);
        assert!(matches!(
            from_headers(&bad_id, UpdateStrategy::AppVersion, "production"),
            Err(RequestError::InvalidBundleId { .. })
        ));
    }

    #[test]
    fn test_path_segments() {
        let segments = PathSegments {
            platform: "android".to_string(),
            target: "2.1.0".to_string(),
            channel: "staging".to_string(),
            min_bundle_id: NIL_ID.to_string(),
            bundle_id: BUNDLE.to_string(),
            device_id: Some(String::new()),
        };

        let request = segments
            .into_request(UpdateStrategy::AppVersion, "production")
            .unwrap();
        assert_eq!(request.platform, Platform::Android);
        assert_eq!(request.channel, "staging");
        assert!(request.device_id.is_none());
    }
}
