/*!
 * Stockroom API: inventory ledger, sales with refund/cancellation flows and
 * role-based access control behind a third-party identity provider.
 */

use axum::{http::HeaderValue, middleware, Router};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use crate::auth::{AuthorizationGuard, IdentityBridge, RoleCatalog, TokenVerifier};
use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::services::AppServices;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Standard envelope for paginated list responses.
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn empty(page: u64, page_size: u64) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page,
            page_size,
            total_pages: 0,
        }
    }
}

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub services: AppServices,
    pub catalog: Arc<RoleCatalog>,
    pub bridge: IdentityBridge,
    pub guard: AuthorizationGuard,
    pub token_verifier: TokenVerifier,
    pub event_sender: EventSender,
}

impl AppState {
    /// Wires every component to the pool and event channel. The role
    /// catalog is read once here; roles change only via migration.
    pub async fn build(
        config: AppConfig,
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
    ) -> Result<Self, ServiceError> {
        let catalog = Arc::new(RoleCatalog::load(db.as_ref()).await?);
        let bridge = IdentityBridge::new(
            db.clone(),
            catalog.clone(),
            config.admin_email.clone().unwrap_or_default(),
            config.default_role.clone(),
        );
        let guard = AuthorizationGuard::new(bridge.clone(), catalog.clone());
        let token_verifier = TokenVerifier::new(
            &config.jwt_secret,
            config.auth_issuer.as_deref(),
            config.auth_audience.as_deref(),
        );
        let services = AppServices::new(db.clone(), event_sender.clone(), catalog.clone());

        Ok(Self {
            db,
            config: Arc::new(config),
            services,
            catalog,
            bridge,
            guard,
            token_verifier,
            event_sender,
        })
    }
}

/// Versioned API routes. Everything under /api/v1 sits behind the bearer
/// auth middleware; per-route authorization happens in the handlers.
pub fn api_v1_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/inventory", handlers::inventory::inventory_router())
        .nest("/categories", handlers::categories::categories_router())
        .nest("/sales", handlers::sales::sales_router())
        .nest("/users", handlers::users::users_router())
        .nest("/auth", handlers::auth::auth_router())
        .nest("/reports", handlers::reports::reports_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.should_allow_permissive_cors() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Assembles the complete application router.
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(handlers::health::health_router())
        .nest("/api/v1", api_v1_router(&state));

    if state.config.is_development() {
        router = router.merge(
            SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::api_doc()),
        );
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}
