//! HTTP API request handlers

use crate::api::error::ApiError;
use crate::api::request::{self, PathSegments};
use crate::app::AppState;
use crate::store::BundleFilter;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use resolver::is_valid_native_fingerprint;
use types::{
    parse_bundle_id, Bundle, Platform, RequestError, UpdateInfo, UpdateRequest, UpdateStrategy,
};

async fn resolve(state: &AppState, request: UpdateRequest) -> Result<Json<Option<UpdateInfo>>, ApiError> {
    let info = state.selector.resolve(&request).await?;
    if let Some(info) = &info {
        tracing::info!(
            platform = %request.platform,
            channel = %request.channel,
            current_bundle_id = %request.current_bundle_id,
            bundle_id = %info.id,
            status = info.status.as_str(),
            "Serving update decision"
        );
    }
    Ok(Json(info))
}

fn path_request(
    state: &AppState,
    route_strategy: UpdateStrategy,
    segments: PathSegments,
) -> Result<UpdateRequest, ApiError> {
    let strategy = state.selector.strategy();
    if route_strategy != strategy {
        return Err(RequestError::StrategyMismatch {
            expected: strategy.as_str().to_string(),
            received: route_strategy.as_str().to_string(),
        }
        .into());
    }
    Ok(segments.into_request(strategy, &state.config.update.default_channel)?)
}

/// Header-based update check
pub async fn check_update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Option<UpdateInfo>>, ApiError> {
    let request = request::from_headers(
        &headers,
        state.selector.strategy(),
        &state.config.update.default_channel,
    )?;
    resolve(&state, request).await
}

fn segments(
    (platform, target, channel, min_bundle_id, bundle_id): (String, String, String, String, String),
    device_id: Option<String>,
) -> PathSegments {
    PathSegments {
        platform,
        target,
        channel,
        min_bundle_id,
        bundle_id,
        device_id,
    }
}

pub async fn app_version_update(
    State(state): State<Arc<AppState>>,
    Path(params): Path<(String, String, String, String, String)>,
) -> Result<Json<Option<UpdateInfo>>, ApiError> {
    let request = path_request(&state, UpdateStrategy::AppVersion, segments(params, None))?;
    resolve(&state, request).await
}

pub async fn app_version_update_for_device(
    State(state): State<Arc<AppState>>,
    Path((platform, version, channel, min_bundle_id, bundle_id, device_id)): Path<(String, String, String, String, String, String)>,
) -> Result<Json<Option<UpdateInfo>>, ApiError> {
    let params = (platform, version, channel, min_bundle_id, bundle_id);
    let request = path_request(&state, UpdateStrategy::AppVersion, segments(params, Some(device_id)))?;
    resolve(&state, request).await
}

pub async fn fingerprint_update(
    State(state): State<Arc<AppState>>,
    Path(params): Path<(String, String, String, String, String)>,
) -> Result<Json<Option<UpdateInfo>>, ApiError> {
    let request = path_request(&state, UpdateStrategy::Fingerprint, segments(params, None))?;
    resolve(&state, request).await
}

pub async fn fingerprint_update_for_device(
    State(state): State<Arc<AppState>>,
    Path((platform, fingerprint, channel, min_bundle_id, bundle_id, device_id)): Path<(String, String, String, String, String, String)>,
) -> Result<Json<Option<UpdateInfo>>, ApiError> {
    let params = (platform, fingerprint, channel, min_bundle_id, bundle_id);
    let request = path_request(&state, UpdateStrategy::Fingerprint, segments(params, Some(device_id)))?;
    resolve(&state, request).await
}

pub async fn ping() -> &'static str {
    "pong"
}

pub async fn version() -> Json<Value> {
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}

/// Health check endpoint
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<Value>) {
    let db_healthy = state.database.health_check().await.is_ok();

    let status = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if db_healthy { "healthy" } else { "unhealthy" },
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "components": {
                "database": if db_healthy { "healthy" } else { "unhealthy" },
                "strategy": state.selector.strategy().as_str(),
                "storage": state.config.storage.kind(),
            }
        })),
    )
}

/// Admin view of a bundle, with the creation time decoded from its id
fn bundle_view(bundle: &Bundle) -> Result<Value, ApiError> {
    let mut value =
        serde_json::to_value(bundle).map_err(|e| ApiError::Internal(e.to_string()))?;
    if let Value::Object(fields) = &mut value {
        fields.insert(
            "createdAt".to_string(),
            json!(bundle.created_at().map(|t| t.to_rfc3339())),
        );
    }
    Ok(value)
}

#[derive(Debug, Deserialize)]
pub struct ListBundlesQuery {
    pub channel: Option<String>,
    pub platform: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_bundles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListBundlesQuery>,
) -> Result<Json<Value>, ApiError> {
    let platform = query
        .platform
        .as_deref()
        .map(str::parse::<Platform>)
        .transpose()?;
    let filter = BundleFilter {
        channel: query.channel,
        platform,
        limit: query.limit,
        offset: query.offset,
    };

    let bundles = state.store.list_bundles(&filter).await?;
    let data = bundles
        .iter()
        .map(bundle_view)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(json!({
        "data": data,
        "pagination": {
            "limit": filter.limit.unwrap_or(crate::store::DEFAULT_LIST_LIMIT),
            "offset": filter.offset.unwrap_or(0),
            "count": bundles.len(),
        }
    })))
}

pub async fn list_channels(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.store.list_channels().await?))
}

pub async fn get_bundle(
    State(state): State<Arc<AppState>>,
    Path(bundle_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_bundle_id("id", &bundle_id)?;
    match state.store.get_bundle(id).await? {
        Some(bundle) => Ok(Json(bundle_view(&bundle)?)),
        None => Err(ApiError::NotFound(format!("Bundle not found: {}", id))),
    }
}

/// A single bundle or a batch
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BundlePayload {
    Many(Vec<Bundle>),
    One(Box<Bundle>),
}

impl BundlePayload {
    fn into_vec(self) -> Vec<Bundle> {
        match self {
            BundlePayload::Many(bundles) => bundles,
            BundlePayload::One(bundle) => vec![*bundle],
        }
    }
}

pub async fn create_bundles(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BundlePayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let bundles = payload.into_vec();
    if bundles.is_empty() {
        return Err(ApiError::BadRequest("No bundles provided".to_string()));
    }

    let strategy = state.selector.strategy();
    for bundle in &bundles {
        bundle.validate_target(strategy)?;
        if let Some(fingerprint) = &bundle.fingerprint_hash {
            if !is_valid_native_fingerprint(fingerprint) {
                return Err(RequestError::InvalidFingerprint {
                    value: fingerprint.clone(),
                }
                .into());
            }
        }
    }

    state.store.insert_bundles(&bundles).await?;

    let ids: Vec<String> = bundles.iter().map(|b| b.id.to_string()).collect();
    tracing::info!(count = ids.len(), "Bundles created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "inserted": ids.len(), "ids": ids })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBundleBody {
    pub enabled: bool,
}

/// Enable or disable a bundle; disabling rolls devices back on their next check
pub async fn update_bundle(
    State(state): State<Arc<AppState>>,
    Path(bundle_id): Path<String>,
    Json(body): Json<UpdateBundleBody>,
) -> Result<Json<Bundle>, ApiError> {
    let id = parse_bundle_id("id", &bundle_id)?;
    let bundle = state.store.set_enabled(id, body.enabled).await?;

    tracing::info!(bundle_id = %id, enabled = body.enabled, "Bundle enabled flag updated");
    Ok(Json(bundle))
}

pub async fn delete_bundle(
    State(state): State<Arc<AppState>>,
    Path(bundle_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_bundle_id("id", &bundle_id)?;
    state.store.delete_bundle(id).await?;

    tracing::info!(bundle_id = %id, "Bundle deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn prune_bundles(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let deleted = state.store.prune_disabled().await?;

    tracing::info!(deleted = deleted, "Pruned disabled bundles");
    Ok(Json(json!({ "deleted": deleted })))
}
