// src/middleware/auth.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::User,
};

/// Cookie HttpOnly das páginas; carrega o mesmo JWT da API.
pub const SESSION_COOKIE: &str = "catalog_session";

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Identifica o usuário da requisição. `Authorization: Bearer` tem prioridade
/// e um token inválido ali é erro; um cookie de sessão vencido vale como anônimo.
pub async fn resolve_user(app_state: &AppState, headers: &HeaderMap) -> Result<Option<User>, AppError> {
    if let Some(token) = bearer_token(headers) {
        return app_state.auth_service.validate_token(token).await.map(Some);
    }

    let jar = CookieJar::from_headers(headers);
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    match app_state.auth_service.validate_token(cookie.value()).await {
        Ok(user) => Ok(Some(user)),
        Err(AppError::InvalidToken) => Ok(None),
        Err(e) => Err(e),
    }
}

async fn user_from_parts(parts: &mut Parts, app_state: &AppState) -> Result<Option<User>, AppError> {
    // o middleware de throttling pode já ter resolvido o usuário
    if let Some(user) = parts.extensions.get::<User>() {
        return Ok(Some(user.clone()));
    }
    let user = resolve_user(app_state, &parts.headers).await?;
    if let Some(user) = &user {
        parts.extensions.insert(user.clone());
    }
    Ok(user)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_headers(&parts.headers);
        match user_from_parts(parts, &app_state).await {
            Ok(Some(user)) => Ok(AuthenticatedUser(user)),
            Ok(None) => Err(AppError::Unauthorized.to_api_error(&locale, &app_state.i18n_store)),
            Err(e) => Err(e.to_api_error(&locale, &app_state.i18n_store)),
        }
    }
}

/// Usuário se houver; leituras públicas e páginas usam este.
pub struct OptionalUser(pub Option<User>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        user_from_parts(parts, &app_state)
            .await
            .map(OptionalUser)
            .map_err(|e| e.to_api_error(&Locale::from_headers(&parts.headers), &app_state.i18n_store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }
}
