// src/handlers/categories.rs

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
    models::category::{
        CategoryDetail, CategoryListItem, CategoryNode, CategoryQuery, CreateCategoryPayload,
        UpdateCategoryPayload,
    },
};

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "Categories",
    params(CategoryQuery),
    responses((status = 200, description = "Lista paginada de categorias", body = Page<CategoryListItem>))
)]
pub async fn list_categories(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiQuery(query): ApiQuery<CategoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state.category_service.list(&query).await.localized(&locale, &app_state)?;
    Ok(Json(page))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    tag = "Categories",
    request_body = CreateCategoryPayload,
    responses(
        (status = 201, description = "Categoria criada", body = CategoryDetail),
        (status = 400, description = "Dados inválidos ou pai inválido"),
        (status = 409, description = "Nome ou slug já usado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_category(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<CreateCategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(AppError::ValidationError)
        .localized(&locale, &app_state)?;

    let category = app_state
        .category_service
        .create(payload, Some(user.id))
        .await
        .localized(&locale, &app_state)?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}",
    tag = "Categories",
    params(("id" = Uuid, Path, description = "ID da categoria")),
    responses(
        (status = 200, description = "Categoria", body = CategoryDetail),
        (status = 404, description = "Categoria não encontrada")
    )
)]
pub async fn get_category(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let category = app_state.category_service.detail(id).await.localized(&locale, &app_state)?;
    Ok(Json(category))
}

#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}",
    tag = "Categories",
    request_body = CreateCategoryPayload,
    params(("id" = Uuid, Path, description = "ID da categoria")),
    responses((status = 200, description = "Categoria substituída", body = CategoryDetail)),
    security(("api_jwt" = []))
)]
pub async fn replace_category(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CreateCategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(AppError::ValidationError)
        .localized(&locale, &app_state)?;

    let category = app_state
        .category_service
        .update(id, UpdateCategoryPayload::from(payload), Some(user.id))
        .await
        .localized(&locale, &app_state)?;
    Ok(Json(category))
}

#[utoipa::path(
    patch,
    path = "/api/v1/categories/{id}",
    tag = "Categories",
    request_body = UpdateCategoryPayload,
    params(("id" = Uuid, Path, description = "ID da categoria")),
    responses((status = 200, description = "Categoria atualizada", body = CategoryDetail)),
    security(("api_jwt" = []))
)]
pub async fn update_category(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateCategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(AppError::ValidationError)
        .localized(&locale, &app_state)?;

    let category = app_state
        .category_service
        .update(id, payload, Some(user.id))
        .await
        .localized(&locale, &app_state)?;
    Ok(Json(category))
}

#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    tag = "Categories",
    params(("id" = Uuid, Path, description = "ID da categoria")),
    responses((status = 204, description = "Categoria desativada (exclusão lógica)")),
    security(("api_jwt" = []))
)]
pub async fn delete_category(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .category_service
        .soft_delete(id, Some(user.id))
        .await
        .localized(&locale, &app_state)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/tree",
    tag = "Categories",
    responses((status = 200, description = "Árvore de categorias ativas", body = Vec<CategoryNode>))
)]
pub async fn category_tree(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let tree = app_state.category_service.tree().await.localized(&locale, &app_state)?;
    Ok(Json(tree))
}
