// src/middleware/permissions.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::User,
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
    fn granted(user: &User) -> bool;
}

/// 2. O Extractor (Guardião). Carrega o usuário já autorizado.
pub struct RequirePermission<T>(pub User, pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // A. Autenticação (401 se faltar)
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;

        // B. Autorização (403)
        if !T::granted(&user) {
            tracing::warn!(user_id = %user.id, permission = T::slug(), "Acesso negado");
            let app_state = AppState::from_ref(state);
            return Err(AppError::Forbidden
                .to_api_error(&Locale::from_headers(&parts.headers), &app_state.i18n_store));
        }

        Ok(RequirePermission(user, PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct StaffOnly;
impl PermissionDef for StaffOnly {
    fn slug() -> &'static str {
        "staff"
    }
    fn granted(user: &User) -> bool {
        user.is_staff && user.is_active
    }
}

pub type RequireStaff = RequirePermission<StaffOnly>;
