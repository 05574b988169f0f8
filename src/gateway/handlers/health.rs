//! Health check handler

use std::sync::Arc;

use axum::extract::State;
use chrono::Utc;
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, ok};

/// Health check response data
#[derive(serde::Serialize, serde::Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "memory")]
    pub store: String,
    /// Build revision
    #[schema(example = "a1b2c3d")]
    pub version: String,
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_i64)]
    pub timestamp_ms: i64,
}

/// Health check endpoint
///
/// Pings the account store. Does not expose why a check failed.
///
/// - Healthy: 200 OK + {code: 0, data: {...}}
/// - Unhealthy: 503 STORE_UNAVAILABLE
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse, content_type = "application/json"),
        (status = 503, description = "Store unavailable")
    ),
    tag = "System"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    state
        .store
        .health_check()
        .await
        .map_err(ApiError::service_unavailable)?;

    ok(HealthResponse {
        store: state.store.name().to_string(),
        version: env!("GIT_HASH").to_string(),
        timestamp_ms: Utc::now().timestamp_millis(),
    })
}
