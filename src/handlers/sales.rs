use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::auth::{
    AccessRequirement, Principal, PERM_SALES_CREATE, PERM_SALES_READ, PERM_SALES_REFUND,
};
use crate::errors::ServiceError;
use crate::handlers::categories::PageQuery;
use crate::services::sales::{CreateSaleInput, RefundSaleInput};
use crate::AppState;

pub fn sales_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route("/:id", get(get_sale).delete(cancel_sale))
        .route("/:id/refund", post(refund_sale))
}

#[utoipa::path(
    post,
    path = "/api/v1/sales",
    request_body = CreateSaleInput,
    responses(
        (status = 201, description = "Sale created, stock decremented"),
        (status = 400, description = "Invalid lines or insufficient stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn create_sale(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(input): Json<CreateSaleInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .guard
        .require(&principal, &AccessRequirement::permission(PERM_SALES_CREATE))
        .await?;
    let details = state.services.sales.create_sale(input, Some(user.id)).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales",
    params(PageQuery),
    responses(
        (status = 200, description = "Paginated sales list"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .guard
        .require(&principal, &AccessRequirement::permission(PERM_SALES_READ))
        .await?;
    let page = state
        .services
        .sales
        .list_sales(query.page, query.page_size)
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales/{id}",
    params(("id" = Uuid, Path, description = "Sale id")),
    responses(
        (status = 200, description = "Sale with its transactions"),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn get_sale(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .guard
        .require(&principal, &AccessRequirement::permission(PERM_SALES_READ))
        .await?;
    let details = state.services.sales.get_sale(id).await?;
    Ok(Json(details))
}

#[utoipa::path(
    post,
    path = "/api/v1/sales/{id}/refund",
    params(("id" = Uuid, Path, description = "Sale id")),
    request_body = RefundSaleInput,
    responses(
        (status = 200, description = "Refund applied, stock restored"),
        (status = 400, description = "Over-refund or cancelled sale", body = crate::errors::ErrorResponse),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn refund_sale(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(input): Json<RefundSaleInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .guard
        .require(&principal, &AccessRequirement::permission(PERM_SALES_REFUND))
        .await?;
    let sale = state
        .services
        .sales
        .refund_sale(id, input, Some(user.id))
        .await?;
    Ok(Json(sale))
}

#[utoipa::path(
    delete,
    path = "/api/v1/sales/{id}",
    params(("id" = Uuid, Path, description = "Sale id")),
    responses(
        (status = 200, description = "Sale cancelled, unrefunded stock restored"),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Sale already cancelled", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn cancel_sale(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .guard
        .require(&principal, &AccessRequirement::permission(PERM_SALES_REFUND))
        .await?;
    let sale = state.services.sales.cancel_sale(id, Some(user.id)).await?;
    Ok(Json(sale))
}
