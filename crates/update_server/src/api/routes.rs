//! API route definitions

use crate::api::{handlers, middleware::require_admin_key};
use crate::app::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create the main API router
pub fn create_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let admin = Router::new()
        .route(
            "/api/bundles",
            get(handlers::list_bundles).post(handlers::create_bundles),
        )
        .route("/api/bundles/channels", get(handlers::list_channels))
        .route("/api/bundles/prune", post(handlers::prune_bundles))
        .route(
            "/api/bundles/:bundle_id",
            get(handlers::get_bundle)
                .patch(handlers::update_bundle)
                .delete(handlers::delete_bundle),
        )
        .route_layer(middleware::from_fn_with_state(state, require_admin_key));

    Router::new()
        // Device endpoints
        .route("/api/check-update", get(handlers::check_update))
        .route(
            "/api/app-version/:platform/:app_version/:channel/:min_bundle_id/:bundle_id",
            get(handlers::app_version_update),
        )
        .route(
            "/api/app-version/:platform/:app_version/:channel/:min_bundle_id/:bundle_id/:device_id",
            get(handlers::app_version_update_for_device),
        )
        .route(
            "/api/fingerprint/:platform/:fingerprint_hash/:channel/:min_bundle_id/:bundle_id",
            get(handlers::fingerprint_update),
        )
        .route(
            "/api/fingerprint/:platform/:fingerprint_hash/:channel/:min_bundle_id/:bundle_id/:device_id",
            get(handlers::fingerprint_update_for_device),
        )
        // Health and status endpoints
        .route("/ping", get(handlers::ping))
        .route("/version", get(handlers::version))
        .route("/healthz", get(handlers::health_check))
        .merge(admin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::store::SqliteBundleStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use config::{Config, StorageConfig};
    use resolver::BundleSelector;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;
    use types::{new_bundle_id, NIL_ID};

    const ADMIN_KEY: &str = "test-admin-key-0123456789";

    async fn create_test_state(config: Config) -> Arc<AppState> {
        let database = Database::new_in_memory().await.unwrap();
        Arc::new(AppState::new(config, database).unwrap())
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.security.admin_api_key = Some(ADMIN_KEY.to_string());
        config.storage = StorageConfig::Local {
            public_base_url: "https://cdn.example.com/files".to_string(),
            signing_secret: "route-test-signing-secret".to_string(),
        };
        config
    }

    fn app(state: Arc<AppState>) -> Router {
        create_routes(state.clone()).with_state(state)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn check_update(bundle_id: &str, version: &str) -> Request<Body> {
        Request::builder()
            .uri("/api/check-update")
            .header("x-bundle-id", bundle_id)
            .header("x-app-platform", "ios")
            .header("x-app-version", version)
            .body(Body::empty())
            .unwrap()
    }

    fn admin(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-api-key", ADMIN_KEY)
            .header("content-type", "application/json");
        match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let state = create_test_state(test_config()).await;

        let request = Request::builder()
            .uri("/healthz")
            .body(Body::empty())
            .unwrap();

        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ping_and_version() {
        let state = create_test_state(test_config()).await;

        let response = app(state.clone())
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"pong");

        let response = app(state)
            .oneshot(Request::builder().uri("/version").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_end_to_end_over_http() {
        let state = create_test_state(test_config()).await;
        let ids = [new_bundle_id(), new_bundle_id(), new_bundle_id()];
        let payload: Vec<Value> = ids
            .iter()
            .map(|id| {
                json!({
                    "id": id,
                    "platform": "ios",
                    "channel": "production",
                    "targetAppVersion": "1.0.x",
                    "storageUri": format!("s3://bundles/{}.zip", id),
                    "fileHash": "hash",
                })
            })
            .collect();

        let response = app(state.clone())
            .oneshot(admin("POST", "/api/bundles", Some(Value::Array(payload))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["inserted"], 3);

        let b1 = ids[0].to_string();
        let response = app(state.clone())
            .oneshot(check_update(&b1, "1.0.0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "UPDATE");
        assert_eq!(body["id"], ids[2].to_string());
        let url = body["storageUri"].as_str().unwrap();
        assert!(url.starts_with(&format!("https://cdn.example.com/files/bundles/{}.zip?expires=", ids[2])));

        let response = app(state.clone())
            .oneshot(admin(
                "PATCH",
                &format!("/api/bundles/{}", ids[2]),
                Some(json!({ "enabled": false })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["enabled"], false);

        let response = app(state.clone()).oneshot(check_update(&b1, "1.0.0")).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["status"], "UPDATE");
        assert_eq!(body["id"], ids[1].to_string());

        for id in &ids[..2] {
            let response = app(state.clone())
                .oneshot(admin(
                    "PATCH",
                    &format!("/api/bundles/{}", id),
                    Some(json!({ "enabled": false })),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app(state.clone()).oneshot(check_update(&b1, "1.0.0")).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["status"], "ROLLBACK");
        assert_eq!(body["id"], NIL_ID.to_string());
        assert_eq!(body["shouldForceUpdate"], true);
        assert!(body["storageUri"].is_null());
        assert!(body["signature"].is_null());

        let response = app(state.clone())
            .oneshot(admin("POST", "/api/bundles/prune", None))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["deleted"], 3);
    }

    struct UnavailableSigner;

    #[async_trait::async_trait]
    impl resolver::SignedUrlIssuer for UnavailableSigner {
        async fn sign(&self, _storage_uri: &str, _ttl: std::time::Duration) -> types::Result<String> {
            Err(types::UpdateServerError::Storage(
                "signing service unavailable".to_string(),
            ))
        }

        fn name(&self) -> &str {
            "unavailable"
        }
    }

    #[tokio::test]
    async fn test_signing_failure_is_internal_error() {
        let config = test_config();
        let database = Database::new_in_memory().await.unwrap();
        let store = Arc::new(SqliteBundleStore::new(database.pool().clone()));
        let selector = BundleSelector::new(
            store.clone(),
            Arc::new(UnavailableSigner),
            config.resolver_config(),
        );
        let state = Arc::new(AppState {
            config,
            database,
            store,
            selector,
        });

        let response = app(state.clone())
            .oneshot(admin(
                "POST",
                "/api/bundles",
                Some(json!({
                    "id": new_bundle_id(),
                    "platform": "ios",
                    "targetAppVersion": "*",
                    "storageUri": "s3://bundles/a.zip",
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app(state)
            .oneshot(check_update(&NIL_ID.to_string(), "1.0.0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Internal server error" })
        );
    }

    #[tokio::test]
    async fn test_fingerprint_bundles_need_full_native_fingerprint() {
        let mut config = test_config();
        config.update.strategy = types::UpdateStrategy::Fingerprint;
        let state = create_test_state(config).await;
        let bundle = |fingerprint: &str| {
            json!({
                "id": new_bundle_id(),
                "platform": "android",
                "fingerprintHash": fingerprint,
                "storageUri": "s3://bundles/fp.zip",
            })
        };

        let response = app(state.clone())
            .oneshot(admin("POST", "/api/bundles", Some(bundle("0123456789abcdef0123"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app(state)
            .oneshot(admin(
                "POST",
                "/api/bundles",
                Some(bundle("0123456789abcdef0123aaaaaaaaaaaaaaaaaaaa")),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_no_update_returns_null() {
        let state = create_test_state(test_config()).await;

        let response = app(state)
            .oneshot(check_update(&NIL_ID.to_string(), "1.0.0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_json(response).await.is_null());
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let state = create_test_state(test_config()).await;

        let missing = Request::builder()
            .uri("/api/check-update")
            .header("x-app-platform", "ios")
            .header("x-app-version", "1.0.0")
            .body(Body::empty())
            .unwrap();
        let response = app(state.clone()).oneshot(missing).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"]
            .as_str()
            .unwrap()
            .contains("x-bundle-id"));

        let conflicting = Request::builder()
            .uri("/api/check-update")
            .header("x-bundle-id", NIL_ID.to_string())
            .header("x-app-platform", "ios")
            .header("x-app-version", "1.0.0")
            .header("x-fingerprint-hash", "0123456789abcdef0123")
            .body(Body::empty())
            .unwrap();
        let response = app(state.clone()).oneshot(conflicting).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Fingerprint route on an appVersion server
        let uri = format!(
            "/api/fingerprint/ios/0123456789abcdef0123aaaaaaaaaaaaaaaaaaaa/production/{}/{}",
            NIL_ID, NIL_ID
        );
        let response = app(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_path_route_with_device_id() {
        let state = create_test_state(test_config()).await;
        let id = new_bundle_id();
        let response = app(state.clone())
            .oneshot(admin(
                "POST",
                "/api/bundles",
                Some(json!({
                    "id": id,
                    "platform": "android",
                    "channel": "beta",
                    "targetAppVersion": "*",
                    "storageUri": "s3://bundles/beta.zip",
                    "rolloutPercentage": 0,
                    "targetDeviceIds": ["device-a"],
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let uri = |device: &str| {
            format!("/api/app-version/android/2.3.1/beta/{}/{}/{}", NIL_ID, NIL_ID, device)
        };

        let response = app(state.clone())
            .oneshot(Request::builder().uri(uri("device-a")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["id"], id.to_string());

        let response = app(state)
            .oneshot(Request::builder().uri(uri("device-b")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(body_json(response).await.is_null());
    }

    #[tokio::test]
    async fn test_admin_requires_key() {
        let state = create_test_state(test_config()).await;

        let response = app(state.clone())
            .oneshot(Request::builder().uri("/api/bundles").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let wrong = Request::builder()
            .uri("/api/bundles")
            .header("x-api-key", "nope")
            .body(Body::empty())
            .unwrap();
        let response = app(state.clone()).oneshot(wrong).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let mut config = test_config();
        config.security.admin_api_key = None;
        let keyless = create_test_state(config).await;
        let response = app(keyless)
            .oneshot(admin("GET", "/api/bundles", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app(state)
            .oneshot(admin("GET", "/api/bundles", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_bundle_management() {
        let state = create_test_state(test_config()).await;
        let id = new_bundle_id();

        // Fingerprint target on an appVersion server
        let response = app(state.clone())
            .oneshot(admin(
                "POST",
                "/api/bundles",
                Some(json!({
                    "id": id,
                    "platform": "ios",
                    "fingerprintHash": "0123456789abcdef0123aaaaaaaaaaaaaaaaaaaa",
                    "storageUri": "s3://bundles/a.zip",
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bundle = json!({
            "id": id,
            "platform": "ios",
            "channel": "staging",
            "targetAppVersion": "1.x",
            "storageUri": "s3://bundles/a.zip",
        });
        let response = app(state.clone())
            .oneshot(admin("POST", "/api/bundles", Some(bundle.clone())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app(state.clone())
            .oneshot(admin("POST", "/api/bundles", Some(bundle)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app(state.clone())
            .oneshot(admin("GET", &format!("/api/bundles/{}", id), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["channel"], "staging");
        assert!(body["createdAt"].is_string());

        let response = app(state.clone())
            .oneshot(admin("GET", "/api/bundles/channels", None))
            .await
            .unwrap();
        assert_eq!(body_json(response).await, json!(["staging"]));

        let response = app(state.clone())
            .oneshot(admin("GET", "/api/bundles?channel=staging&platform=ios", None))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["pagination"]["count"], 1);

        let response = app(state.clone())
            .oneshot(admin("DELETE", &format!("/api/bundles/{}", id), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app(state)
            .oneshot(admin("GET", &format!("/api/bundles/{}", id), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
