// tests/pages.rs

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};

use common::{app, body_text, get, send};

#[tokio::test]
async fn login_page_renders_the_form() {
    let response = send(app(), get("/login?next=/products")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains(r#"name="login""#));
    assert!(html.contains(r#"name="password""#));
    assert!(html.contains(r#"value="/products""#));
}

#[tokio::test]
async fn about_page_is_public() {
    let response = send(app(), get("/about")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("<html"));
}

#[tokio::test]
async fn profile_redirects_anonymous_visitors_to_login() {
    let response = send(app(), get("/profile")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert_eq!(location, "/login?next=/profile");
}

#[tokio::test]
async fn empty_login_form_is_rendered_again_with_errors() {
    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .header("host", "localhost")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("login=&password="))
        .unwrap();

    let response = send(app(), request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("is-invalid"));
    assert!(html.contains("This field is required."));
}

#[tokio::test]
async fn unknown_page_is_an_html_404() {
    let response = send(app(), get("/definitely-missing")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
}
