//! API integration tests

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use circulation_desk::{
    api,
    circulation::{CirculationPolicy, ManualClock},
    config::AppConfig,
    repository::{MemoryStore, Repository},
    services::Services,
    AppState,
};

async fn app() -> Router {
    let config = AppConfig::default();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 10, 1, 9, 0, 0).unwrap(),
    ));
    let repository = Repository::load(Arc::new(MemoryStore::new()), CirculationPolicy::default())
        .await
        .unwrap();
    let services = Services::new(repository, clock, config.auth.clone());

    api::router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    })
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn register(app: &Router, id: &str, role: &str) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/readers",
        None,
        Some(json!({
            "id": id,
            "name": format!("Reader {}", id),
            "email": format!("{}@library.test", id),
            "registration": format!("REG-{}", id),
            "password": "secret",
            "role": role
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
}

async fn login(app: &Router, id: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "reader_id": id, "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["token_type"], "Bearer");
    body["token"].as_str().unwrap().to_string()
}

async fn create_title(app: &Router, token: &str, copies: u32) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/titles",
        Some(token),
        Some(json!({
            "title": "Kindred",
            "author": "Octavia E. Butler",
            "publisher": "Doubleday",
            "edition": "1st",
            "location": "F-12",
            "total_copies": copies
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/api/v1/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let app = app().await;
    register(&app, "ana", "student").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "reader_id": "ana", "password": "wrong" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthenticated");
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = app().await;
    register(&app, "ana", "student").await;

    let (status, _) = send(&app, Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/v1/auth/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app, "ana").await;
    let (status, body) = send(&app, Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "ana");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_token_of_deleted_reader_is_refused() {
    let app = app().await;
    register(&app, "desk", "staff").await;
    register(&app, "temp", "staff").await;
    let staff = login(&app, "desk").await;
    let temp = login(&app, "temp").await;

    let (status, _) = send(&app, Method::GET, "/api/v1/readers", Some(&temp), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::DELETE,
        "/api/v1/readers/temp",
        Some(&staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, "/api/v1/readers", Some(&temp), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthenticated");
}

#[tokio::test]
async fn test_registration_conflicts_and_validation() {
    let app = app().await;
    register(&app, "ana", "student").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/readers",
        None,
        Some(json!({
            "id": "ana",
            "name": "Another Ana",
            "email": "ana2@library.test",
            "registration": "REG-other",
            "password": "secret",
            "role": "faculty"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/readers",
        None,
        Some(json!({
            "id": "bea",
            "name": "Bea",
            "email": "not-an-email",
            "registration": "REG-bea",
            "password": "secret",
            "role": "student"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation");
}

#[tokio::test]
async fn test_catalog_is_staff_managed() {
    let app = app().await;
    register(&app, "desk", "staff").await;
    register(&app, "ana", "student").await;
    let staff = login(&app, "desk").await;
    let ana = login(&app, "ana").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/titles",
        Some(&ana),
        Some(json!({
            "title": "Kindred",
            "author": "Octavia E. Butler",
            "publisher": "Doubleday",
            "edition": "1st",
            "location": "F-12",
            "total_copies": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");

    let id = create_title(&app, &staff, 2).await;
    let uri = format!("/api/v1/titles/{}", id);
    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available_copies"], 2);

    let (status, body) = send(&app, Method::GET, "/api/v1/titles/99", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "TitleNotFound");

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/titles/{}", id),
        Some(&staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_borrow_reserve_return_flow() {
    let app = app().await;
    register(&app, "desk", "staff").await;
    register(&app, "ana", "student").await;
    register(&app, "bea", "faculty").await;
    let staff = login(&app, "desk").await;
    let ana = login(&app, "ana").await;
    let bea = login(&app, "bea").await;
    let title_id = create_title(&app, &staff, 1).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/circulation/borrow",
        Some(&ana),
        Some(json!({ "title_id": title_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["reader_id"], "ana");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/circulation/borrow",
        Some(&bea),
        Some(json!({ "title_id": title_id })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "NoCopiesAvailable");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/circulation/reserve",
        Some(&bea),
        Some(json!({ "title_id": title_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["position"], 1);

    // Only staff check copies back in
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/circulation/return",
        Some(&ana),
        Some(json!({ "reader_id": "ana", "title_id": title_id })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/circulation/return",
        Some(&staff),
        Some(json!({ "reader_id": "ana", "title_id": title_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "returned_on_time");
    assert_eq!(body["auto_assigned"]["reader_id"], "bea");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/titles/{}/reservations", title_id),
        Some(&staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/circulation/settle-fee",
        Some(&staff),
        Some(json!({ "reader_id": "ana", "title_id": title_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoPendingFeeFound");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/readers/bea/statement",
        Some(&bea),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["open_loans"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/v1/readers/bea/statement",
        Some(&ana),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::DELETE,
        "/api/v1/readers/bea",
        Some(&staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");
}

#[tokio::test]
async fn test_renewal_too_early() {
    let app = app().await;
    register(&app, "desk", "staff").await;
    register(&app, "ana", "student").await;
    let staff = login(&app, "desk").await;
    let ana = login(&app, "ana").await;
    let title_id = create_title(&app, &staff, 1).await;

    send(
        &app,
        Method::POST,
        "/api/v1/circulation/borrow",
        Some(&ana),
        Some(json!({ "title_id": title_id })),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/circulation/renew",
        Some(&ana),
        Some(json!({ "title_id": title_id })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "RenewalTooEarly");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/api-docs/openapi.json", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/circulation/borrow"].is_object());
}
