// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        extract::ApiJson,
    },
    config::AppState,
    handlers::Localized,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::{
        AuthResponse, LoginUserPayload, RegisterUserPayload, TokenVerifyPayload, TokenVerifyResponse,
        UserSummary,
    },
};

// Handler de registro
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Conta criada", body = AuthResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Username ou e-mail já usado")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiJson(payload): ApiJson<RegisterUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(AppError::ValidationError)
        .localized(&locale, &app_state)?;

    let response = app_state.auth_service.register(&payload).await.localized(&locale, &app_state)?;
    Ok((StatusCode::CREATED, Json(response)))
}

// Handler de login: username ou e-mail
#[utoipa::path(
    post,
    path = "/api/v1/auth/token",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Token JWT (7 dias)", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiJson(payload): ApiJson<LoginUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(AppError::ValidationError)
        .localized(&locale, &app_state)?;

    let response = app_state
        .auth_service
        .login(&payload.username, &payload.password)
        .await
        .localized(&locale, &app_state)?;
    Ok(Json(response))
}

// Confere assinatura e expiração. Não há refresh: o token de 7 dias é renovado
// com um novo login.
#[utoipa::path(
    post,
    path = "/api/v1/auth/token/verify",
    tag = "Auth",
    request_body = TokenVerifyPayload,
    responses(
        (status = 200, description = "Token válido", body = TokenVerifyResponse),
        (status = 401, description = "Token inválido ou expirado")
    )
)]
pub async fn verify_token(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiJson(payload): ApiJson<TokenVerifyPayload>,
) -> Result<Json<TokenVerifyResponse>, ApiError> {
    payload
        .validate()
        .map_err(AppError::ValidationError)
        .localized(&locale, &app_state)?;

    let claims = app_state
        .auth_service
        .verify_token(payload.token.trim())
        .localized(&locale, &app_state)?;
    Ok(Json(TokenVerifyResponse::from(&claims)))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Conta autenticada", body = UserSummary),
        (status = 401, description = "Não autenticado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<UserSummary> {
    Json(UserSummary::from(&user))
}
