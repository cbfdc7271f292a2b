// src/handlers/tags.rs

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
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::tag::{CreateTagPayload, PopularQuery, TagDetail, TagQuery, UpdateTagPayload},
};

#[utoipa::path(
    get,
    path = "/api/v1/tags",
    tag = "Tags",
    params(TagQuery),
    responses((status = 200, description = "Lista paginada de tags", body = Page<TagDetail>))
)]
pub async fn list_tags(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiQuery(query): ApiQuery<TagQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state.tag_service.list(&query).await.localized(&locale, &app_state)?;
    Ok(Json(page))
}

#[utoipa::path(
    post,
    path = "/api/v1/tags",
    tag = "Tags",
    request_body = CreateTagPayload,
    responses(
        (status = 201, description = "Tag criada", body = TagDetail),
        (status = 409, description = "Nome ou slug já usado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_tag(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<CreateTagPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(AppError::ValidationError)
        .localized(&locale, &app_state)?;

    let tag = app_state
        .tag_service
        .create(payload, Some(user.id))
        .await
        .localized(&locale, &app_state)?;
    Ok((StatusCode::CREATED, Json(tag)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tags/{id}",
    tag = "Tags",
    params(("id" = Uuid, Path, description = "ID da tag")),
    responses(
        (status = 200, description = "Tag", body = TagDetail),
        (status = 404, description = "Tag não encontrada")
    )
)]
pub async fn get_tag(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = app_state.tag_service.detail(id).await.localized(&locale, &app_state)?;
    Ok(Json(tag))
}

#[utoipa::path(
    put,
    path = "/api/v1/tags/{id}",
    tag = "Tags",
    request_body = CreateTagPayload,
    params(("id" = Uuid, Path, description = "ID da tag")),
    responses((status = 200, description = "Tag substituída", body = TagDetail)),
    security(("api_jwt" = []))
)]
pub async fn replace_tag(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CreateTagPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(AppError::ValidationError)
        .localized(&locale, &app_state)?;

    let tag = app_state
        .tag_service
        .update(id, UpdateTagPayload::from(payload))
        .await
        .localized(&locale, &app_state)?;
    Ok(Json(tag))
}

#[utoipa::path(
    patch,
    path = "/api/v1/tags/{id}",
    tag = "Tags",
    request_body = UpdateTagPayload,
    params(("id" = Uuid, Path, description = "ID da tag")),
    responses((status = 200, description = "Tag atualizada", body = TagDetail)),
    security(("api_jwt" = []))
)]
pub async fn update_tag(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateTagPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(AppError::ValidationError)
        .localized(&locale, &app_state)?;

    let tag = app_state.tag_service.update(id, payload).await.localized(&locale, &app_state)?;
    Ok(Json(tag))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tags/{id}",
    tag = "Tags",
    params(("id" = Uuid, Path, description = "ID da tag")),
    responses(
        (status = 204, description = "Tag removida"),
        (status = 404, description = "Tag não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_tag(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state.tag_service.delete(id).await.localized(&locale, &app_state)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/tags/popular",
    tag = "Tags",
    params(PopularQuery),
    responses((status = 200, description = "Tags mais usadas por produtos ativos", body = Vec<TagDetail>))
)]
pub async fn popular_tags(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiQuery(query): ApiQuery<PopularQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let tags = app_state
        .tag_service
        .popular(query.limit())
        .await
        .localized(&locale, &app_state)?;
    Ok(Json(tags))
}
