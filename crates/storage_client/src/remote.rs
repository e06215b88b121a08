//! Client for a remote URL signing service

use async_trait::async_trait;
use reqwest::Client;
use resolver::SignedUrlIssuer;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use types::{Result, StorageError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest<'a> {
    storage_uri: &'a str,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    url: String,
}

/// HTTP client for a signing service
///
/// Sends `POST {endpoint}` with `{"storageUri", "expiresIn"}` and expects
/// `{"url": "..."}` back. Failures are reported, never retried.
#[derive(Debug, Clone)]
pub struct RemoteUrlSigner {
    endpoint: String,
    api_key: Option<String>,
    request_timeout: Duration,
    http_client: Client,
}

impl RemoteUrlSigner {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> std::result::Result<Self, StorageError> {
        let http_client = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("hot-updater-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StorageError::SigningFailed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key,
            request_timeout,
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request_url(
        &self,
        storage_uri: &str,
        ttl: Duration,
    ) -> std::result::Result<String, StorageError> {
        let body = SignRequest {
            storage_uri,
            expires_in: ttl.as_secs(),
        };

        let mut request = self.http_client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = timeout(self.request_timeout, request.send())
            .await
            .map_err(|_| StorageError::Timeout {
                endpoint: self.endpoint.clone(),
            })?
            .map_err(|e| {
                if e.is_timeout() {
                    StorageError::Timeout {
                        endpoint: self.endpoint.clone(),
                    }
                } else {
                    StorageError::HttpError {
                        endpoint: self.endpoint.clone(),
                        status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                    }
                }
            })?;

        if !response.status().is_success() {
            return Err(StorageError::HttpError {
                endpoint: self.endpoint.clone(),
                status: response.status().as_u16(),
            });
        }

        let raw_text = response
            .text()
            .await
            .map_err(|e| StorageError::InvalidResponse {
                endpoint: self.endpoint.clone(),
                message: format!("error reading response body: {}", e),
            })?;

        parse_sign_response(&self.endpoint, &raw_text)
    }
}

fn parse_sign_response(endpoint: &str, raw_text: &str) -> std::result::Result<String, StorageError> {
    let parsed: SignResponse =
        serde_json::from_str(raw_text).map_err(|e| StorageError::InvalidResponse {
            endpoint: endpoint.to_string(),
            message: format!("invalid JSON response: {}", e),
        })?;

    if parsed.url.trim().is_empty() {
        return Err(StorageError::InvalidResponse {
            endpoint: endpoint.to_string(),
            message: "empty url".to_string(),
        });
    }
    Ok(parsed.url)
}

#[async_trait]
impl SignedUrlIssuer for RemoteUrlSigner {
    async fn sign(&self, storage_uri: &str, ttl: Duration) -> Result<String> {
        match self.request_url(storage_uri, ttl).await {
            Ok(url) => Ok(url),
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "Remote URL signing failed");
                Err(e.into())
            }
        }
    }

    fn name(&self) -> &str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn signer(server: &MockServer, api_key: Option<&str>) -> RemoteUrlSigner {
        RemoteUrlSigner::new(
            format!("{}/sign", server.uri()),
            api_key.map(str::to_string),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_successful_signing() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sign"))
            .and(header("authorization", "Bearer sign-key"))
            .and(body_json(serde_json::json!({
                "storageUri": "s3://bundles/a.zip",
                "expiresIn": 60
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "url": "https://signed.example.com/a.zip?sig=1"
            })))
            .mount(&mock_server)
            .await;

        let url = signer(&mock_server, Some("sign-key"))
            .sign("s3://bundles/a.zip", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(url, "https://signed.example.com/a.zip?sig=1");
    }

    #[tokio::test]
    async fn test_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sign"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let err = signer(&mock_server, None)
            .request_url("s3://bundles/a.zip", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::HttpError { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sign"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "signed": "nope"
            })))
            .mount(&mock_server)
            .await;

        let err = signer(&mock_server, None)
            .request_url("s3://bundles/a.zip", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sign"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "url": "https://late.example.com" }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let client = RemoteUrlSigner::new(
            format!("{}/sign", mock_server.uri()),
            None,
            Duration::from_millis(50),
        )
        .unwrap();

        let err = client
            .sign("s3://bundles/a.zip", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, types::UpdateServerError::Storage(_)));
    }

    #[test]
    fn test_parse_sign_response() {
        assert_eq!(
            parse_sign_response("e", r#"{"url":"https://x"}"#).unwrap(),
            "https://x"
        );
        assert!(parse_sign_response("e", r#"{"url":""}"#).is_err());
        assert!(parse_sign_response("e", "not json").is_err());
    }
}
