// src/handlers/products.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        extract::{ApiJson, ApiPath, ApiQuery},
        i18n::params,
        pagination::{Page, PageRequest},
    },
    config::AppState,
    handlers::Localized,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        permissions::{RequirePermission, RequireStaff},
    },
    models::product::{
        BulkStatusPayload, CreateProductPayload, DiscountPayload, DiscountResponse, PriceRangeQuery,
        ProductDetail, ProductListItem, ProductQuery, ProductStatistics, ProductStatusResponse,
        RecentQuery, TaskScheduledResponse, UpdateProductPayload,
    },
};

#[utoipa::path(
    get,
    path = "/api/v1/products",
    tag = "Products",
    params(ProductQuery),
    responses(
        (status = 200, description = "Lista paginada de produtos", body = Page<ProductListItem>)
    )
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state.product_service.list(&query).await.localized(&locale, &app_state)?;
    Ok(Json(page))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    tag = "Products",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Produto criado", body = ProductDetail),
        (status = 400, description = "Dados inválidos"),
        (status = 401, description = "Não autenticado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<CreateProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(AppError::ValidationError)
        .localized(&locale, &app_state)?;

    let product = app_state
        .product_service
        .create(payload, Some(user.id))
        .await
        .localized(&locale, &app_state)?;

    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    tag = "Products",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto", body = ProductDetail),
        (status = 404, description = "Produto não encontrado")
    )
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = app_state.product_service.detail(id).await.localized(&locale, &app_state)?;
    Ok(Json(product))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    tag = "Products",
    request_body = CreateProductPayload,
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto substituído", body = ProductDetail),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn replace_product(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CreateProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(AppError::ValidationError)
        .localized(&locale, &app_state)?;

    let product = app_state
        .product_service
        .update(id, UpdateProductPayload::from(payload), Some(user.id))
        .await
        .localized(&locale, &app_state)?;
    Ok(Json(product))
}

#[utoipa::path(
    patch,
    path = "/api/v1/products/{id}",
    tag = "Products",
    request_body = UpdateProductPayload,
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto atualizado", body = ProductDetail),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(AppError::ValidationError)
        .localized(&locale, &app_state)?;

    let product = app_state
        .product_service
        .update(id, payload, Some(user.id))
        .await
        .localized(&locale, &app_state)?;
    Ok(Json(product))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    tag = "Products",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 204, description = "Produto desativado (exclusão lógica)"),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_product(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .product_service
        .soft_delete(id, Some(user.id))
        .await
        .localized(&locale, &app_state)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/products/recent",
    tag = "Products",
    params(RecentQuery),
    responses(
        (status = 200, description = "Produtos ativos criados nos últimos N dias", body = Page<ProductListItem>),
        (status = 400, description = "Janela fora de 1..365")
    )
)]
pub async fn recent_products(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiQuery(query): ApiQuery<RecentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .product_service
        .recent(query.days.as_deref(), PageRequest { page: query.page })
        .await
        .localized(&locale, &app_state)?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/price-range",
    tag = "Products",
    params(PriceRangeQuery),
    responses(
        (status = 200, description = "Produtos ativos na faixa de preço", body = Page<ProductListItem>),
        (status = 400, description = "Faixa ausente, inválida ou invertida")
    )
)]
pub async fn price_range(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiQuery(query): ApiQuery<PriceRangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .product_service
        .price_range(query.min.as_deref(), query.max.as_deref(), PageRequest { page: query.page })
        .await
        .localized(&locale, &app_state)?;
    Ok(Json(page))
}

#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/deactivate",
    tag = "Products",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto desativado", body = ProductStatusResponse),
        (status = 400, description = "Produto já inativo")
    ),
    security(("api_jwt" = []))
)]
pub async fn deactivate_product(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let data = app_state
        .product_service
        .set_active(id, false, Some(user.id))
        .await
        .localized(&locale, &app_state)?;
    Ok(Json(status_response(&app_state, &locale, "product_deactivated", data)))
}

#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/activate",
    tag = "Products",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto reativado", body = ProductStatusResponse),
        (status = 400, description = "Produto já ativo"),
        (status = 403, description = "Apenas equipe")
    ),
    security(("api_jwt" = []))
)]
pub async fn activate_product(
    State(app_state): State<AppState>,
    locale: Locale,
    RequirePermission(user, _): RequireStaff,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let data = app_state
        .product_service
        .set_active(id, true, Some(user.id))
        .await
        .localized(&locale, &app_state)?;
    Ok(Json(status_response(&app_state, &locale, "product_activated", data)))
}

#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/discount",
    tag = "Products",
    request_body = DiscountPayload,
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Desconto aplicado", body = DiscountResponse),
        (status = 400, description = "Percentual fora de (0, 100]"),
        (status = 403, description = "Apenas equipe")
    ),
    security(("api_jwt" = []))
)]
pub async fn apply_discount(
    State(app_state): State<AppState>,
    locale: Locale,
    RequirePermission(user, _): RequireStaff,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<DiscountPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(AppError::ValidationError)
        .localized(&locale, &app_state)?;

    let result = app_state
        .product_service
        .apply_discount(id, payload.percentage, Some(user.id))
        .await
        .localized(&locale, &app_state)?;
    Ok(Json(result))
}

#[utoipa::path(
    post,
    path = "/api/v1/products/bulk-status",
    tag = "Products",
    request_body = BulkStatusPayload,
    responses(
        (status = 202, description = "Atualização agendada no worker", body = TaskScheduledResponse),
        (status = 403, description = "Apenas equipe"),
        (status = 503, description = "Fila de tarefas indisponível")
    ),
    security(("api_jwt" = []))
)]
pub async fn bulk_status(
    State(app_state): State<AppState>,
    locale: Locale,
    _staff: RequireStaff,
    ApiJson(payload): ApiJson<BulkStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(AppError::ValidationError)
        .localized(&locale, &app_state)?;

    let task_id = app_state
        .product_service
        .schedule_bulk_status(&payload)
        .await
        .localized(&locale, &app_state)?;

    let count = payload.product_ids.len();
    let store = &app_state.i18n_store;
    let message = store.translate_with(
        store.resolve(&locale.0),
        "bulk_status_scheduled",
        &params([("count", json!(count))]),
    );
    Ok((
        StatusCode::ACCEPTED,
        Json(TaskScheduledResponse {
            message,
            task_id,
            count,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/statistics",
    tag = "Products",
    responses(
        (status = 200, description = "Agregados do catálogo", body = ProductStatistics),
        (status = 403, description = "Apenas equipe")
    ),
    security(("api_jwt" = []))
)]
pub async fn statistics(
    State(app_state): State<AppState>,
    locale: Locale,
    _staff: RequireStaff,
) -> Result<impl IntoResponse, ApiError> {
    let stats = app_state.product_service.statistics().await.localized(&locale, &app_state)?;
    Ok(Json(stats))
}

fn status_response(app_state: &AppState, locale: &Locale, key: &str, data: ProductDetail) -> ProductStatusResponse {
    let store = &app_state.i18n_store;
    ProductStatusResponse {
        message: store.translate(store.resolve(&locale.0), key),
        data,
    }
}
