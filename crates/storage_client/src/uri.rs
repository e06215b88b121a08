//! Storage URI parsing

use std::fmt;
use types::StorageError;

/// A parsed `scheme://bucket/key` storage locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageUri {
    pub scheme: String,
    pub bucket: String,
    /// Object key, may contain `/`
    pub key: String,
}

impl StorageUri {
    pub fn parse(uri: &str) -> Result<Self, StorageError> {
        let invalid = |reason: &str| StorageError::InvalidUri {
            uri: uri.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = uri.split_once("://").ok_or_else(|| invalid("missing scheme"))?;
        if scheme.is_empty() {
            return Err(invalid("missing scheme"));
        }

        let (bucket, key) = rest.split_once('/').ok_or_else(|| invalid("missing key"))?;
        if bucket.is_empty() {
            return Err(invalid("missing bucket"));
        }
        let key = key.trim_start_matches('/');
        if key.is_empty() {
            return Err(invalid("missing key"));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    /// `bucket/key`, the part covered by a download signature
    pub fn object_path(&self) -> String {
        format!("{}/{}", self.bucket, self.key)
    }

    /// `bucket/key` with every path segment percent-encoded
    pub fn url_path(&self) -> String {
        self.object_path()
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for StorageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.key)
    }
}
