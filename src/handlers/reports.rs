use axum::{
    extract::{Extension, Json, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::auth::{AccessRequirement, Principal, PERM_REPORTS_READ};
use crate::errors::ServiceError;
use crate::services::reports::SalesSummaryFilter;
use crate::AppState;

pub fn reports_router() -> Router<AppState> {
    Router::new()
        .route("/low-stock", get(low_stock))
        .route("/margins", get(margins))
        .route("/sales-summary", get(sales_summary))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/low-stock",
    responses(
        (status = 200, description = "Items at or below their minimum stock level"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn low_stock(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .guard
        .require(&principal, &AccessRequirement::permission(PERM_REPORTS_READ))
        .await?;
    let entries = state.services.reports.low_stock().await?;
    Ok(Json(entries))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/margins",
    responses(
        (status = 200, description = "Items ranked by margin"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn margins(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .guard
        .require(&principal, &AccessRequirement::permission(PERM_REPORTS_READ))
        .await?;
    let entries = state.services.reports.margins().await?;
    Ok(Json(entries))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/sales-summary",
    params(SalesSummaryFilter),
    responses(
        (status = 200, description = "Sales totals over the window", body = crate::services::reports::SalesSummary),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn sales_summary(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(filter): Query<SalesSummaryFilter>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .guard
        .require(&principal, &AccessRequirement::permission(PERM_REPORTS_READ))
        .await?;
    let summary = state.services.reports.sales_summary(filter).await?;
    Ok(Json(summary))
}
