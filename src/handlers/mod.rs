//! # API Handlers
//!
//! HTTP endpoint handlers for the Sponsor Profile API.

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db;
use crate::error::{ApiError, ErrorType};
use crate::models::ServiceInfo;
use crate::server::AppState;

pub mod profile;

/// Liveness/readiness payload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    #[schema(example = "ok")]
    pub status: String,
}

impl HealthStatus {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Process is up", body = HealthStatus)
    ),
    tag = "operations"
)]
pub async fn healthz() -> Json<HealthStatus> {
    Json(HealthStatus::ok())
}

/// Readiness probe; checks the database
#[utoipa::path(
    get,
    path = "/readyz",
    responses(
        (status = 200, description = "Database reachable", body = HealthStatus),
        (status = 503, description = "Database unreachable", body = crate::error::ApiErrorBody)
    ),
    tag = "operations"
)]
pub async fn readyz(State(state): State<AppState>) -> Result<Json<HealthStatus>, ApiError> {
    if let Err(err) = db::health_check(&state.db).await {
        tracing::warn!(error = %err, "readiness check failed");
        return Err(ErrorType::ServiceUnavailable.into());
    }
    Ok(Json(HealthStatus::ok()))
}

/// Fallback for unmatched routes when no static directory is configured
pub async fn not_found() -> ApiError {
    ErrorType::NotFound.into()
}
