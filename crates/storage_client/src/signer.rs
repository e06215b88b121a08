//! Local keyed-hash URL signer

use crate::uri::StorageUri;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use resolver::SignedUrlIssuer;
use std::fmt;
use std::time::Duration;
use types::{Result, StorageError};

/// Context string for deriving the signing key from the configured secret
const KEY_CONTEXT: &str = "hot-updater-server 2024-06 signed bundle download urls";

/// Signs download URLs in-process
///
/// URLs take the form `{base}/{bucket}/{key}?expires=<unix secs>&token=<hex>`,
/// where the token is a BLAKE3 keyed hash over `bucket/key:expires`. The file
/// server in front of the bucket checks them with [`LocalUrlSigner::verify`].
#[derive(Clone)]
pub struct LocalUrlSigner {
    public_base_url: String,
    key: [u8; 32],
}

impl LocalUrlSigner {
    pub fn new(public_base_url: &str, signing_secret: &str) -> Self {
        Self {
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            key: blake3::derive_key(KEY_CONTEXT, signing_secret.as_bytes()),
        }
    }

    /// Sign `storage_uri` so that it expires `ttl` after `now`
    pub fn sign_at(
        &self,
        storage_uri: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> std::result::Result<String, StorageError> {
        let uri = StorageUri::parse(storage_uri)?;
        let ttl = i64::try_from(ttl.as_secs())
            .map_err(|_| StorageError::SigningFailed(format!("ttl out of range: {:?}", ttl)))?;
        let expires = now.timestamp().saturating_add(ttl);
        let object_path = uri.object_path();

        Ok(format!(
            "{}/{}?expires={}&token={}",
            self.public_base_url,
            uri.url_path(),
            expires,
            hex::encode(self.token(&object_path, expires).as_bytes())
        ))
    }

    /// Check a presented token for `bucket/key` at time `now` (unix seconds)
    ///
    /// Called by the file server in front of the bucket, not by this process.
    /// `object_path` is the percent-decoded request path.
    pub fn verify(&self, object_path: &str, expires: i64, token: &str, now: i64) -> bool {
        if now > expires {
            return false;
        }
        let mut presented = [0u8; blake3::OUT_LEN];
        if hex::decode_to_slice(token, &mut presented).is_err() {
            return false;
        }
        // blake3::Hash equality is constant time
        blake3::Hash::from(presented) == self.token(object_path, expires)
    }

    fn token(&self, object_path: &str, expires: i64) -> blake3::Hash {
        let message = format!("{}:{}", object_path, expires);
        blake3::keyed_hash(&self.key, message.as_bytes())
    }
}

impl fmt::Debug for LocalUrlSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalUrlSigner")
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SignedUrlIssuer for LocalUrlSigner {
    async fn sign(&self, storage_uri: &str, ttl: Duration) -> Result<String> {
        Ok(self.sign_at(storage_uri, ttl, Utc::now())?)
    }

    fn name(&self) -> &str {
        "local"
    }
}
