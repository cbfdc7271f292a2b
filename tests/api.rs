// tests/api.rs

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use catalog::app::build_router;
use serde_json::json;
use uuid::Uuid;

use common::{app, app_with, body_json, get, send, state_with};

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("host", "localhost")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn info_describes_the_api() {
    let response = send(app(), get("/api/info")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["name"], "catalog");
    assert_eq!(body["environment"], "test");
    assert_eq!(body["docs"], "/api/docs");
}

#[tokio::test]
async fn trailing_slash_reaches_the_same_route() {
    let response = send(app(), get("/api/info/")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_api_path_is_a_json_404() {
    let response = send(app(), get("/api/v1/nothing-here")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Not found.");
    assert_eq!(body["status_code"], 404);
}

#[tokio::test]
async fn errors_follow_accept_language() {
    let request = Request::builder()
        .uri("/api/v1/nothing-here")
        .header("host", "localhost")
        .header(header::ACCEPT_LANGUAGE, "pt-BR,pt;q=0.9")
        .body(Body::empty())
        .unwrap();

    let body = body_json(send(app(), request).await).await;
    assert_eq!(body["error"], "Não encontrado.");
}

#[tokio::test]
async fn host_outside_allowed_hosts_is_rejected() {
    let app = app_with(&[("ALLOWED_HOSTS", "catalog.example.com")]);
    let request = Request::builder()
        .uri("/api/info")
        .header("host", "evil.example.org")
        .body(Body::empty())
        .unwrap();

    let response = send(app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn subdomain_pattern_matches_allowed_host() {
    let app = app_with(&[("ALLOWED_HOSTS", ".example.com")]);
    let request = Request::builder()
        .uri("/api/info")
        .header("host", "api.example.com:8000")
        .body(Body::empty())
        .unwrap();

    assert_eq!(send(app, request).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn creating_a_product_requires_authentication() {
    let payload = json!({ "name": "Notebook", "price": 10.0, "stock": 1 });
    let response = send(app(), post_json("/api/v1/products", payload)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_bearer_token_is_401() {
    let request = Request::builder()
        .uri("/api/v1/auth/me")
        .header("host", "localhost")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();

    assert_eq!(send(app(), request).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_registration_reports_every_field() {
    let payload = json!({
        "username": "a b",
        "email": "not-an-email",
        "password": "123",
        "password_confirm": "456"
    });

    let response = send(app(), post_json("/api/v1/auth/register", payload)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let details = body_json(response).await["details"].clone();
    assert!(details.get("username").is_some());
    assert!(details.get("email").is_some());
    assert!(details.get("password").is_some());
}

#[tokio::test]
async fn malformed_json_is_400() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/token")
        .header("host", "localhost")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    assert_eq!(send(app(), request).await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let response = send(app(), get("/api/openapi.json")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["paths"].get("/api/v1/products/{id}/discount").is_some());
}

#[tokio::test]
async fn recent_rejects_windows_outside_one_to_365_days() {
    let response = send(app(), get("/api/v1/products/recent?days=400")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(app(), get("/api/v1/products/recent/?days=0")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn price_range_requires_both_bounds_in_order() {
    let response = send(app(), get("/api/v1/products/price-range?min=10")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(app(), get("/api/v1/products/price-range?max=10")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(app(), get("/api/v1/products/price-range?min=10&max=5")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verify_accepts_a_token_issued_by_this_server() {
    let state = state_with(&[]);
    let user_id = Uuid::new_v4();
    let token = state.auth_service.create_token(user_id).unwrap();

    let response = send(
        build_router(state),
        post_json("/api/v1/auth/token/verify", json!({ "token": token })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["user_id"], user_id.to_string());
    assert!(body["expires_at"].as_str().unwrap() > body["issued_at"].as_str().unwrap());
}

#[tokio::test]
async fn verify_rejects_forged_and_missing_tokens() {
    let response = send(app(), post_json("/api/v1/auth/token/verify", json!({ "token": "not-a-jwt" }))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let foreign = state_with(&[("SECRET_KEY", "a-completely-different-secret-key-0123456789abcdef")])
        .auth_service
        .create_token(Uuid::new_v4())
        .unwrap();
    let response = send(app(), post_json("/api/v1/auth/token/verify", json!({ "token": foreign }))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(app(), post_json("/api/v1/auth/token/verify", json!({ "token": "" }))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
