use axum::{
    extract::{Extension, Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use crate::auth::Principal;
use crate::errors::ServiceError;
use crate::events::Event;
use crate::AppState;

pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/sync-user", post(sync_user))
        .route("/me", get(me))
}

/// Explicit identity sync. Creating the local row also happens lazily on
/// any guarded route, so this endpoint exists for clients that want the
/// resolved profile right after login.
#[utoipa::path(
    post,
    path = "/api/v1/auth/sync-user",
    responses(
        (status = 200, description = "Local user resolved or created", body = crate::services::users::UserView),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn sync_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.bridge.sync_user(&principal).await?;
    state
        .event_sender
        .send_post_commit(Event::UserSynced(user.id))
        .await;
    Ok(Json(state.services.users.view(user)))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user profile", body = crate::services::users::UserView),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.bridge.sync_user(&principal).await?;
    Ok(Json(state.services.users.view(user)))
}
