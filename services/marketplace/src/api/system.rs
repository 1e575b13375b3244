//! System/health API handlers.
//!
//! # Key invariants
//! - Health checks must be fast and side-effect free.
//! - System info is derived from in-memory state only.
use crate::api::error::{ApiError, api_internal};
use crate::api::types::{HealthStatus, SystemInfo};
use crate::app::AppState;
use axum::Json;
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/v1/system/info",
    tag = "system",
    responses(
        (status = 200, description = "Service identity and storage backends", body = SystemInfo)
    )
)]
pub(crate) async fn system_info(State(state): State<AppState>) -> Json<SystemInfo> {
    Json(SystemInfo {
        service: state.service_name.clone(),
        api_version: state.api_version.clone(),
        storage_backend: state.store.backend_name().to_string(),
        image_backend: state.images.backend_name().to_string(),
        durable_storage: state.store.is_durable(),
    })
}

#[utoipa::path(
    get,
    path = "/v1/system/health",
    tag = "system",
    responses(
        (status = 200, description = "Service health", body = HealthStatus),
        (status = 500, description = "Storage unavailable", body = crate::api::types::ErrorResponse)
    )
)]
/// Probe the backing store and answer `ok` when it responds.
pub(crate) async fn system_health(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, ApiError> {
    state
        .store
        .health_check()
        .await
        .map_err(|err| api_internal("storage unavailable", &err))?;
    Ok(Json(HealthStatus {
        status: "ok".to_string(),
    }))
}
