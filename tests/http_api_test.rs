mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use stockroom_api::entities::role;

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn health_endpoints_require_no_token() {
    let state = common::test_state().await;
    let app = stockroom_api::app(state);

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
    assert_eq!(body["auth_provider"], "configured");
    assert!(body["version"].is_string());

    let (status, _) = send(&app, Method::GET, "/health/live", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn api_routes_reject_missing_or_garbage_tokens() {
    let state = common::test_state().await;
    let app = stockroom_api::app(state);

    let (status, body) = send(&app, Method::GET, "/api/v1/inventory", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthenticated");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/inventory",
        Some("not-a-jwt"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthenticated");
}

#[tokio::test]
async fn viewer_is_denied_writes_with_a_diagnostic_body() {
    let state = common::test_state().await;
    let app = stockroom_api::app(state);
    let token = common::mint_token("ext-viewer", "viewer@example.com");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/inventory",
        Some(&token),
        Some(json!({
            "name": "Widget",
            "sku": "WID-1",
            "price": "10.00",
            "cost": "4.00",
            "quantity": 5
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
    assert_eq!(body["details"]["role"], "viewer");
    assert_eq!(body["details"]["required_permission"], "inventory:manage");

    // Reads stay open to viewers.
    let (status, _) = send(&app, Method::GET, "/api/v1/inventory", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_walks_the_full_inventory_flow() {
    let state = common::test_state().await;
    let app = stockroom_api::app(state);
    let token = common::mint_token("ext-admin", common::ADMIN_EMAIL);

    let (status, category) = send(
        &app,
        Method::POST,
        "/api/v1/categories",
        Some(&token),
        Some(json!({"name": "Tools", "description": "Hand tools"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, item) = send(
        &app,
        Method::POST,
        "/api/v1/inventory",
        Some(&token),
        Some(json!({
            "name": "Hammer",
            "sku": "HAM-1",
            "price": "12.50",
            "cost": "5.00",
            "quantity": 10,
            "min_stock_level": 2,
            "category_id": category["id"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["quantity"], 10);
    let item_id = item["id"].as_str().unwrap().to_string();

    let (status, item) = send(
        &app,
        Method::POST,
        &format!("/api/v1/inventory/{}/add-stock", item_id),
        Some(&token),
        Some(json!({"quantity": 5, "notes": "restock"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["quantity"], 15);

    let (status, item) = send(
        &app,
        Method::GET,
        &format!("/api/v1/inventory/{}", item_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["sku"], "HAM-1");
    assert_eq!(item["version"], 2);

    let (status, deletion) = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/inventory/{}", item_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deletion["movements_deleted"], 2);
}

#[tokio::test]
async fn sales_flow_over_http_caps_refunds() {
    let state = common::test_state().await;
    let app = stockroom_api::app(state);
    let token = common::mint_token("ext-admin", common::ADMIN_EMAIL);

    let (_, item) = send(
        &app,
        Method::POST,
        "/api/v1/inventory",
        Some(&token),
        Some(json!({
            "name": "Widget",
            "sku": "WID-1",
            "price": "10.00",
            "cost": "4.00",
            "quantity": 20
        })),
    )
    .await;

    let (status, sale) = send(
        &app,
        Method::POST,
        "/api/v1/sales",
        Some(&token),
        Some(json!({
            "lines": [{"item_id": item["id"], "quantity": 10}],
            "tax_rate": "0.15"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sale["subtotal"], "100.00");
    assert_eq!(sale["total"], "115.00");
    let sale_id = sale["id"].as_str().unwrap().to_string();
    let transaction_id = sale["transactions"][0]["id"].clone();

    let (status, sale) = send(
        &app,
        Method::POST,
        &format!("/api/v1/sales/{}/refund", sale_id),
        Some(&token),
        Some(json!({
            "items": [{"transaction_id": transaction_id, "quantity": 4}],
            "reason": "damaged"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sale["subtotal"], "60.00");
    assert_eq!(sale["tax"], "9.00");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/sales/{}/refund", sale_id),
        Some(&token),
        Some(json!({
            "items": [{"transaction_id": transaction_id, "quantity": 7}],
            "reason": "too much"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/sales/{}", sale_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/sales/{}", sale_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn movement_listing_degrades_to_an_empty_page_without_read_access() {
    let db = common::test_db().await;
    // A role with no grants at all; every seeded role can read inventory.
    role::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("intern".to_string()),
        description: Set(None),
    }
    .insert(db.as_ref())
    .await
    .unwrap();

    let state = common::state_with_db(db).await;
    let intern = state
        .bridge
        .sync_user(&common::principal("ext-intern", "intern@example.com"))
        .await
        .unwrap();
    state
        .services
        .users
        .assign_role(intern.id, "intern")
        .await
        .unwrap();

    let app = stockroom_api::app(state);
    let token = common::mint_token("ext-intern", "intern@example.com");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/inventory/movements?page=2&page_size=5",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["total"], 0);
    assert_eq!(body["page"], 2);
    assert_eq!(body["page_size"], 5);

    // Every other read still denies outright.
    let (status, _) = send(&app, Method::GET, "/api/v1/inventory", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn error_statuses_map_to_stable_codes() {
    let state = common::test_state().await;
    let app = stockroom_api::app(state);
    let token = common::mint_token("ext-admin", common::ADMIN_EMAIL);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/inventory/{}", Uuid::new_v4()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let create = json!({
        "name": "Original",
        "sku": "DUP-1",
        "price": "1.00",
        "cost": "0.50"
    });
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/inventory",
        Some(&token),
        Some(create.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, Method::POST, "/api/v1/inventory", Some(&token), Some(create)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn identity_endpoints_return_the_local_user() {
    let state = common::test_state().await;
    let app = stockroom_api::app(state);
    let token = common::mint_token("ext-me", "me@example.com");

    let (status, body) = send(&app, Method::POST, "/api/v1/auth/sync-user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["external_id"], "ext-me");
    assert_eq!(body["role"], "viewer");

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "me@example.com");
}

#[tokio::test]
async fn user_administration_requires_the_admin_role() {
    let state = common::test_state().await;
    let app = stockroom_api::app(state);
    let admin = common::mint_token("ext-admin", common::ADMIN_EMAIL);
    let viewer = common::mint_token("ext-viewer", "viewer@example.com");

    // The viewer row is provisioned by its first request.
    let (status, _) = send(&app, Method::GET, "/api/v1/auth/me", Some(&viewer), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/api/v1/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let viewer_id = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "viewer@example.com")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/users/{}/role", viewer_id),
        Some(&admin),
        Some(json!({"role": "operator"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "operator");

    let (status, _) = send(&app, Method::GET, "/api/v1/users", Some(&viewer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
