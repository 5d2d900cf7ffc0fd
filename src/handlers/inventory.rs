use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{
    AccessRequirement, Principal, PERM_INVENTORY_ADJUST, PERM_INVENTORY_MANAGE,
    PERM_INVENTORY_READ, ROLE_ADMIN,
};
use crate::errors::ServiceError;
use crate::services::inventory::{
    CreateItemInput, ItemFilter, MovementFilter, UpdateItemInput,
};
use crate::{AppState, PaginatedResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct StockChangeRequest {
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLocationRequest {
    /// New location; an empty string clears it.
    pub location: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMinLevelRequest {
    pub min_stock_level: i32,
}

pub fn inventory_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/movements", get(list_movements))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
        .route("/:id/add-stock", post(add_stock))
        .route("/:id/remove-stock", post(remove_stock))
        .route("/:id/adjust-stock", post(adjust_stock))
        .route("/:id/location", patch(update_location))
        .route("/:id/min-level", patch(update_min_level))
        .route("/:id/price-history", get(price_history))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    request_body = CreateItemInput,
    responses(
        (status = 201, description = "Item created"),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already in use", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(input): Json<CreateItemInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .guard
        .require(&principal, &AccessRequirement::permission(PERM_INVENTORY_MANAGE))
        .await?;
    let item = state.services.inventory.create_item(input, Some(user.id)).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    params(ItemFilter),
    responses(
        (status = 200, description = "Paginated item list"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(filter): Query<ItemFilter>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .guard
        .require(&principal, &AccessRequirement::permission(PERM_INVENTORY_READ))
        .await?;
    let page = state.services.inventory.list_items(filter).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory item id")),
    responses(
        (status = 200, description = "Item found"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .guard
        .require(&principal, &AccessRequirement::permission(PERM_INVENTORY_READ))
        .await?;
    let item = state.services.inventory.get_item(id).await?;
    Ok(Json(item))
}

#[utoipa::path(
    put,
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory item id")),
    request_body = UpdateItemInput,
    responses(
        (status = 200, description = "Item updated; price changes append a price-history row"),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateItemInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .guard
        .require(&principal, &AccessRequirement::permission(PERM_INVENTORY_MANAGE))
        .await?;
    let item = state
        .services
        .inventory
        .update_item(id, input, Some(user.id))
        .await?;
    Ok(Json(item))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory item id")),
    responses(
        (status = 200, description = "Item deleted with its audit rows", body = crate::services::inventory::ItemDeletion),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .guard
        .require(&principal, &AccessRequirement::role(ROLE_ADMIN))
        .await?;
    let deletion = state.services.inventory.delete_item(id).await?;
    Ok(Json(deletion))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/{id}/add-stock",
    params(("id" = Uuid, Path, description = "Inventory item id")),
    request_body = StockChangeRequest,
    responses(
        (status = 200, description = "Stock added"),
        (status = 400, description = "Non-positive quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn add_stock(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<StockChangeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .guard
        .require(&principal, &AccessRequirement::permission(PERM_INVENTORY_ADJUST))
        .await?;
    let item = state
        .services
        .inventory
        .add_stock(id, req.quantity, req.notes, Some(user.id))
        .await?;
    Ok(Json(item))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/{id}/remove-stock",
    params(("id" = Uuid, Path, description = "Inventory item id")),
    request_body = StockChangeRequest,
    responses(
        (status = 200, description = "Stock removed"),
        (status = 400, description = "Non-positive quantity or insufficient stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn remove_stock(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<StockChangeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .guard
        .require(&principal, &AccessRequirement::permission(PERM_INVENTORY_ADJUST))
        .await?;
    let item = state
        .services
        .inventory
        .remove_stock(id, req.quantity, req.notes, Some(user.id))
        .await?;
    Ok(Json(item))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/{id}/adjust-stock",
    params(("id" = Uuid, Path, description = "Inventory item id")),
    request_body = StockChangeRequest,
    responses(
        (status = 200, description = "Quantity set to the requested value"),
        (status = 400, description = "Negative quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<StockChangeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .guard
        .require(&principal, &AccessRequirement::permission(PERM_INVENTORY_ADJUST))
        .await?;
    let item = state
        .services
        .inventory
        .adjust_stock(id, req.quantity, req.notes, Some(user.id))
        .await?;
    Ok(Json(item))
}

#[utoipa::path(
    patch,
    path = "/api/v1/inventory/{id}/location",
    params(("id" = Uuid, Path, description = "Inventory item id")),
    request_body = UpdateLocationRequest,
    responses(
        (status = 200, description = "Location updated"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn update_location(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLocationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .guard
        .require(&principal, &AccessRequirement::permission(PERM_INVENTORY_ADJUST))
        .await?;
    let item = state
        .services
        .inventory
        .update_location(id, req.location)
        .await?;
    Ok(Json(item))
}

#[utoipa::path(
    patch,
    path = "/api/v1/inventory/{id}/min-level",
    params(("id" = Uuid, Path, description = "Inventory item id")),
    request_body = UpdateMinLevelRequest,
    responses(
        (status = 200, description = "Minimum stock level updated"),
        (status = 400, description = "Negative level", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn update_min_level(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMinLevelRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .guard
        .require(&principal, &AccessRequirement::permission(PERM_INVENTORY_ADJUST))
        .await?;
    let item = state
        .services
        .inventory
        .update_min_stock_level(id, req.min_stock_level)
        .await?;
    Ok(Json(item))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}/price-history",
    params(("id" = Uuid, Path, description = "Inventory item id")),
    responses(
        (status = 200, description = "Price-history snapshots, newest first"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn price_history(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .guard
        .require(&principal, &AccessRequirement::permission(PERM_INVENTORY_READ))
        .await?;
    let history = state.services.inventory.price_history(id).await?;
    Ok(Json(history))
}

/// Movement listing is the one read that degrades instead of denying: a
/// caller without inventory:read gets an empty page rather than a 403.
#[utoipa::path(
    get,
    path = "/api/v1/inventory/movements",
    params(MovementFilter),
    responses(
        (status = 200, description = "Paginated movement audit trail; empty page when unauthorized")
    ),
    tag = "inventory"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(filter): Query<MovementFilter>,
) -> Result<impl IntoResponse, ServiceError> {
    let decision = state
        .guard
        .authorize(&principal, &AccessRequirement::permission(PERM_INVENTORY_READ))
        .await?;
    if !decision.authorized {
        let (page, page_size) =
            crate::services::inventory::page_params(filter.page, filter.page_size);
        return Ok(Json(PaginatedResponse::empty(page, page_size)));
    }
    let page = state.services.inventory.list_movements(filter).await?;
    Ok(Json(page))
}
