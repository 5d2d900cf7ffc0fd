#![allow(dead_code)]

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;

use stockroom_api::auth::{Claims, Principal};
use stockroom_api::config::AppConfig;
use stockroom_api::events;
use stockroom_api::migrator::Migrator;
use stockroom_api::AppState;

pub const JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only";
pub const ADMIN_EMAIL: &str = "admin@example.com";

/// Fresh in-memory SQLite database with migrations applied. A single
/// connection keeps every handle on the same in-memory store.
pub async fn test_db() -> Arc<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect to sqlite");
    Migrator::up(&db, None).await.expect("run migrations");
    Arc::new(db)
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        JWT_SECRET.to_string(),
        "127.0.0.1".to_string(),
        0,
        "test".to_string(),
    );
    cfg.admin_email = Some(ADMIN_EMAIL.to_string());
    cfg
}

pub async fn test_state() -> AppState {
    let db = test_db().await;
    state_with_db(db).await
}

pub async fn state_with_db(db: Arc<DatabaseConnection>) -> AppState {
    let (event_sender, event_rx) = events::event_channel();
    tokio::spawn(events::process_events(event_rx));
    AppState::build(test_config(), db, event_sender)
        .await
        .expect("build app state")
}

pub fn principal(external_id: &str, email: &str) -> Principal {
    Principal {
        external_id: external_id.to_string(),
        email: email.to_string(),
        first_name: None,
        last_name: None,
    }
}

/// Mints a bearer token the test config's verifier accepts.
pub fn mint_token(external_id: &str, email: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: external_id.to_string(),
        email: email.to_string(),
        given_name: None,
        family_name: None,
        iss: "test-issuer".to_string(),
        aud: "test-audience".to_string(),
        iat: now,
        exp: now + 3600,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("mint token")
}
