//! HTTP middleware implementations

use crate::api::error::ApiError;
use crate::app::AppState;
use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use std::sync::Arc;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject admin requests without the configured `x-api-key`
///
/// With no key configured every admin request is rejected.
pub async fn require_admin_key(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.security.admin_api_key.as_deref() else {
        return Err(ApiError::Unauthorized(
            "Admin API is disabled: no admin key configured".to_string(),
        ));
    };

    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(key) if key == expected => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "Rejected admin request with invalid API key");
            Err(ApiError::Unauthorized("Invalid API key".to_string()))
        }
        None => Err(ApiError::Unauthorized(format!("Missing {} header", API_KEY_HEADER))),
    }
}
