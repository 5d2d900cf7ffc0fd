use axum::{
    extract::{Extension, Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AccessRequirement, Principal, ROLE_ADMIN};
use crate::errors::ServiceError;
use crate::handlers::categories::PageQuery;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignRoleRequest {
    pub role: String,
}

pub fn users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/:id/role", put(assign_role))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(PageQuery),
    responses(
        (status = 200, description = "Paginated user list with resolved role names"),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .guard
        .require(&principal, &AccessRequirement::role(ROLE_ADMIN))
        .await?;
    let page = state
        .services
        .users
        .list_users(query.page, query.page_size)
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/role",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = AssignRoleRequest,
    responses(
        (status = 200, description = "Role assigned"),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown user or role", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn assign_role(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignRoleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .guard
        .require(&principal, &AccessRequirement::role(ROLE_ADMIN))
        .await?;
    let user = state.services.users.assign_role(id, &req.role).await?;
    Ok(Json(user))
}
