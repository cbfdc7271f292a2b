// src/handlers/system.rs

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::any::Any;
use utoipa::ToSchema;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    pages,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    /// `None` quando não há Redis configurado
    pub cache: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub environment: &'static str,
    pub languages: Vec<&'static str>,
    pub docs: &'static str,
    pub endpoints: Vec<&'static str>,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "System",
    responses(
        (status = 200, description = "Banco acessível", body = HealthResponse),
        (status = 503, description = "Banco inacessível", body = HealthResponse)
    )
)]
pub async fn health(State(app_state): State<AppState>) -> impl IntoResponse {
    let database = sqlx::query("SELECT 1").execute(&app_state.db_pool).await.is_ok();

    let cache = match &app_state.cache {
        Some(cache) => Some(cache.health_check().await.unwrap_or(false)),
        None => None,
    };

    // cache fora do ar degrada, mas não derruba
    let (status, code) = if database {
        ("ok", StatusCode::OK)
    } else {
        tracing::error!("Health check: banco de dados inacessível");
        ("unavailable", StatusCode::SERVICE_UNAVAILABLE)
    };

    (code, Json(HealthResponse { status, database, cache }))
}

#[utoipa::path(
    get,
    path = "/api/info",
    tag = "System",
    responses((status = 200, description = "Metadados da API", body = ApiInfo))
)]
pub async fn info(State(app_state): State<AppState>) -> Json<ApiInfo> {
    Json(ApiInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        environment: app_state.settings.environment.as_str(),
        languages: vec!["en", "pt"],
        docs: "/api/docs",
        endpoints: vec![
            "/api/v1/auth",
            "/api/v1/products",
            "/api/v1/categories",
            "/api/v1/tags",
            "/api/v1/profiles",
        ],
    })
}

/// 404 para qualquer rota desconhecida: JSON sob /api, HTML no resto.
pub async fn fallback(State(app_state): State<AppState>, locale: Locale, uri: Uri) -> Response {
    if uri.path().starts_with("/api") {
        return AppError::NotFound("not_found")
            .to_api_error(&locale, &app_state.i18n_store)
            .into_response();
    }
    pages::not_found(&app_state, &locale)
}

/// Pânico dentro de um handler vira 500 no formato padrão.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("pânico sem mensagem");
    tracing::error!(panic = %detail, "Handler entrou em pânico");
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "An unexpected error occurred.").into_response()
}
