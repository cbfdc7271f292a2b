// src/handlers/profiles.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        extract::{ApiJson, ApiPath, ApiQuery},
        pagination::Page,
    },
    config::AppState,
    handlers::Localized,
    middleware::{auth::AuthenticatedUser, i18n::Locale, permissions::RequireStaff},
    models::profile::{
        CreateProfilePayload, ProfileDetail, ProfileListItem, ProfileQuery, UpdateProfilePayload,
    },
};

#[utoipa::path(
    get,
    path = "/api/v1/profiles",
    tag = "Profiles",
    params(ProfileQuery),
    responses((status = 200, description = "Lista paginada de perfis", body = Page<ProfileListItem>))
)]
pub async fn list_profiles(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiQuery(query): ApiQuery<ProfileQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state.profile_service.list(&query).await.localized(&locale, &app_state)?;
    Ok(Json(page))
}

#[utoipa::path(
    post,
    path = "/api/v1/profiles",
    tag = "Profiles",
    request_body = CreateProfilePayload,
    responses(
        (status = 201, description = "Perfil criado", body = ProfileDetail),
        (status = 403, description = "Apenas equipe"),
        (status = 409, description = "Usuário já possui perfil")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_profile(
    State(app_state): State<AppState>,
    locale: Locale,
    _staff: RequireStaff,
    ApiJson(payload): ApiJson<CreateProfilePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(AppError::ValidationError)
        .localized(&locale, &app_state)?;

    let profile = app_state.profile_service.create(&payload).await.localized(&locale, &app_state)?;
    Ok((StatusCode::CREATED, Json(profile)))
}

#[utoipa::path(
    get,
    path = "/api/v1/profiles/{id}",
    tag = "Profiles",
    params(("id" = Uuid, Path, description = "ID do perfil")),
    responses(
        (status = 200, description = "Perfil", body = ProfileDetail),
        (status = 404, description = "Perfil não encontrado")
    )
)]
pub async fn get_profile(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = app_state.profile_service.detail(id).await.localized(&locale, &app_state)?;
    Ok(Json(profile))
}

/// PUT e PATCH: só o dono ou a equipe.
#[utoipa::path(
    patch,
    path = "/api/v1/profiles/{id}",
    tag = "Profiles",
    request_body = UpdateProfilePayload,
    params(("id" = Uuid, Path, description = "ID do perfil")),
    responses(
        (status = 200, description = "Perfil atualizado", body = ProfileDetail),
        (status = 403, description = "Perfil de outro usuário")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_profile(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateProfilePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(AppError::ValidationError)
        .localized(&locale, &app_state)?;

    let profile = app_state
        .profile_service
        .update(id, &payload, &user)
        .await
        .localized(&locale, &app_state)?;
    Ok(Json(profile))
}

#[utoipa::path(
    delete,
    path = "/api/v1/profiles/{id}",
    tag = "Profiles",
    params(("id" = Uuid, Path, description = "ID do perfil")),
    responses(
        (status = 204, description = "Perfil removido"),
        (status = 403, description = "Apenas equipe")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_profile(
    State(app_state): State<AppState>,
    locale: Locale,
    _staff: RequireStaff,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state.profile_service.delete(id).await.localized(&locale, &app_state)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/profiles/me",
    tag = "Profiles",
    responses(
        (status = 200, description = "Perfil do usuário autenticado", body = ProfileDetail),
        (status = 401, description = "Não autenticado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_my_profile(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let profile = app_state.profile_service.for_user(&user).await.localized(&locale, &app_state)?;
    Ok(Json(profile))
}

#[utoipa::path(
    patch,
    path = "/api/v1/profiles/me",
    tag = "Profiles",
    request_body = UpdateProfilePayload,
    responses(
        (status = 200, description = "Perfil atualizado", body = ProfileDetail),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_my_profile(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<UpdateProfilePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(AppError::ValidationError)
        .localized(&locale, &app_state)?;

    let profile = app_state
        .profile_service
        .update_own(&user, &payload)
        .await
        .localized(&locale, &app_state)?;
    Ok(Json(profile))
}
