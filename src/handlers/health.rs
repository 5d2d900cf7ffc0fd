use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db;
use crate::errors::ServiceError;
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    /// Store reachability: "ok" when the ping succeeded.
    pub database: &'static str,
    /// Identity-provider configuration: "configured" when a token
    /// verification secret is present.
    pub auth_provider: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Health routes are mounted outside the auth middleware so probes never
/// need credentials.
pub fn health_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
}

fn auth_provider_status(state: &AppState) -> &'static str {
    if state.config.jwt_secret.is_empty() {
        "unconfigured"
    } else {
        "configured"
    }
}

async fn composite_status(
    state: &AppState,
    status: &'static str,
) -> Result<HealthStatus, ServiceError> {
    db::check_connection(state.db.as_ref())
        .await
        .map_err(|e| ServiceError::ServiceUnavailable(format!("Store unreachable: {}", e)))?;
    Ok(HealthStatus {
        status,
        version: env!("CARGO_PKG_VERSION"),
        database: "ok",
        auth_provider: auth_provider_status(state),
        timestamp: Utc::now(),
    })
}

/// Composite health: pings the store and reports whether the identity
/// provider is configured. Store failure is a 503.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up and the store answers", body = HealthStatus),
        (status = 503, description = "Store unreachable", body = crate::errors::ErrorResponse)
    ),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(composite_status(&state, "ok").await?))
}

#[utoipa::path(
    get,
    path = "/health/live",
    responses((status = 200, description = "Process is alive")),
    tag = "health"
)]
pub async fn liveness() -> impl IntoResponse {
    "ok"
}

#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Store reachable", body = HealthStatus),
        (status = 503, description = "Store unreachable", body = crate::errors::ErrorResponse)
    ),
    tag = "health"
)]
pub async fn readiness(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(composite_status(&state, "ready").await?))
}
