// tests/flows.rs
//
// Fluxos completos contra o Postgres de DATABASE_URL:
// `cargo test --test flows -- --ignored`

mod common;

use axum::http::StatusCode;
use catalog::{
    db::ProductRepository,
    tasks::handlers::{bulk_update_product_status, TaskOutcome},
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use common::{app_from_pool, body_json, body_text, get, json_request, send};

async fn register(pool: &PgPool, username: &str) -> String {
    let payload = json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "password": "Catalog#2024",
        "password_confirm": "Catalog#2024"
    });
    let response = send(
        app_from_pool(pool.clone()),
        json_request("POST", "/api/v1/auth/register", None, payload),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["token"].as_str().unwrap().to_string()
}

async fn create_product(pool: &PgPool, token: &str, name: &str) -> String {
    let payload = json!({ "name": name, "price": 19.90, "stock": 5 });
    let response = send(
        app_from_pool(pool.clone()),
        json_request("POST", "/api/v1/products", Some(token), payload),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

async fn soft_delete(pool: &PgPool, token: &str, id: &str) {
    let response = send(
        app_from_pool(pool.clone()),
        json_request("DELETE", &format!("/api/v1/products/{id}"), Some(token), json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[ignore = "requer Postgres"]
#[sqlx::test]
async fn registered_user_gets_a_profile_and_can_log_in(pool: PgPool) {
    register(&pool, "alice").await;

    let login = json!({ "login": "alice@example.com", "password": "Catalog#2024" });
    let response = send(
        app_from_pool(pool.clone()),
        json_request("POST", "/api/v1/auth/token", None, login),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["token"].as_str().unwrap().to_string();

    let response = send(
        app_from_pool(pool.clone()),
        json_request("GET", "/api/v1/profiles/me", Some(&token), json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[ignore = "requer Postgres"]
#[sqlx::test]
async fn duplicate_username_is_a_conflict(pool: PgPool) {
    register(&pool, "bob").await;

    let payload = json!({
        "username": "bob",
        "email": "other@example.com",
        "password": "Catalog#2024",
        "password_confirm": "Catalog#2024"
    });
    let response = send(
        app_from_pool(pool.clone()),
        json_request("POST", "/api/v1/auth/register", None, payload),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[ignore = "requer Postgres"]
#[sqlx::test]
async fn product_lifecycle_with_category(pool: PgPool) {
    let token = register(&pool, "carol").await;

    let response = send(
        app_from_pool(pool.clone()),
        json_request("POST", "/api/v1/categories", Some(&token), json!({ "name": "Eletrônicos" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let category_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let payload = json!({ "name": "Notebook Pro", "price": 4999.90, "stock": 3, "category_id": category_id });
    let response = send(
        app_from_pool(pool.clone()),
        json_request("POST", "/api/v1/products", Some(&token), payload),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let product_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let detail = body_json(send(app_from_pool(pool.clone()), get(&format!("/api/v1/products/{product_id}"))).await).await;
    assert_eq!(detail["category_name"], "Eletrônicos");
    assert_eq!(detail["is_active"], true);
    assert_eq!(detail["is_new"], true);

    let response = send(
        app_from_pool(pool.clone()),
        json_request("DELETE", &format!("/api/v1/products/{product_id}"), Some(&token), json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let detail = body_json(send(app_from_pool(pool), get(&format!("/api/v1/products/{product_id}"))).await).await;
    assert_eq!(detail["is_active"], false);
}

#[ignore = "requer Postgres"]
#[sqlx::test]
async fn recent_leaves_out_soft_deleted_products(pool: PgPool) {
    let token = register(&pool, "dave").await;
    let kept = create_product(&pool, &token, "Teclado Mecânico").await;
    let removed = create_product(&pool, &token, "Mouse Sem Fio").await;
    soft_delete(&pool, &token, &removed).await;

    let response = send(app_from_pool(pool), get("/api/v1/products/recent?days=30")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    let ids: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![kept.as_str()]);
}

#[ignore = "requer Postgres"]
#[sqlx::test]
async fn page_beyond_the_last_is_empty_not_an_error(pool: PgPool) {
    let token = register(&pool, "erin").await;
    create_product(&pool, &token, "Monitor 27").await;

    let response = send(app_from_pool(pool), get("/api/v1/products?page=9223372036854775807")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert!(body["results"].as_array().unwrap().is_empty());
    assert_eq!(body["next"], serde_json::Value::Null);
}

#[ignore = "requer Postgres"]
#[sqlx::test]
async fn sitemap_lists_only_active_products(pool: PgPool) {
    let token = register(&pool, "frank").await;
    let kept = create_product(&pool, &token, "Webcam HD").await;
    let removed = create_product(&pool, &token, "Headset USB").await;
    soft_delete(&pool, &token, &removed).await;

    let response = send(app_from_pool(pool), get("/sitemap.xml")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"].to_str().unwrap().starts_with("application/xml"));

    let xml = body_text(response).await;
    assert!(xml.contains("<loc>http://localhost/about</loc>"));
    assert!(xml.contains(&format!("/api/v1/products/{kept}</loc>")));
    assert!(!xml.contains(&removed));
}

#[ignore = "requer Postgres"]
#[sqlx::test]
async fn bulk_status_counts_only_products_that_change(pool: PgPool) {
    let token = register(&pool, "grace").await;
    let active = create_product(&pool, &token, "Cadeira Gamer").await;
    let already_removed = create_product(&pool, &token, "Mesa Digitalizadora").await;
    soft_delete(&pool, &token, &already_removed).await;

    let ids: Vec<Uuid> = [&active, &already_removed].iter().map(|id| id.parse().unwrap()).collect();
    let outcome = bulk_update_product_status(&ProductRepository::new(pool.clone()), &ids, true)
        .await
        .unwrap();

    match outcome {
        TaskOutcome::Success { updated_count, .. } => assert_eq!(updated_count, Some(1)),
        other => panic!("unexpected outcome: {other:?}"),
    }

    let detail = body_json(send(app_from_pool(pool), get(&format!("/api/v1/products/{active}"))).await).await;
    assert_eq!(detail["is_active"], false);
}
