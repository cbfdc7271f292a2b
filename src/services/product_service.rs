// src/services/product_service.rs

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::{collections::HashSet, sync::Arc};
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::{
        error::AppError,
        pagination::{Page, PageRequest},
    },
    db::{CategoryRepository, ProductRepository, TagRepository},
    models::product::{
        BulkStatusPayload, CreateProductPayload, DiscountResponse, NewProduct, Product,
        ProductDetail, ProductListItem, ProductQuery, ProductStatistics, UpdateProductPayload,
    },
    services::hooks::{ProductHooks, ProductSaved},
    tasks::queue::{Job, TaskId, TaskQueue},
};

pub const RECENT_DEFAULT_DAYS: i64 = 7;
pub const RECENT_MAX_DAYS: i64 = 365;

#[derive(Clone)]
pub struct ProductService {
    products: ProductRepository,
    categories: CategoryRepository,
    tags: TagRepository,
    hooks: ProductHooks,
    queue: Arc<dyn TaskQueue>,
}

impl ProductService {
    pub fn new(
        products: ProductRepository,
        categories: CategoryRepository,
        tags: TagRepository,
        queue: Arc<dyn TaskQueue>,
    ) -> Self {
        Self {
            products,
            categories,
            tags,
            hooks: ProductHooks::new(queue.clone()),
            queue,
        }
    }

    pub async fn list(&self, query: &ProductQuery) -> Result<Page<ProductListItem>, AppError> {
        let page = PageRequest { page: query.page };
        let (rows, count) = self.products.list(&query.to_filter(), &page).await?;
        Ok(Page::new(rows.iter().map(ProductListItem::from).collect(), count, &page))
    }

    pub async fn detail(&self, id: Uuid) -> Result<ProductDetail, AppError> {
        let product = self.load(id).await?;
        self.describe(product).await
    }

    pub async fn sitemap_entries(&self) -> Result<Vec<(Uuid, DateTime<Utc>)>, AppError> {
        self.products.active_modifications().await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Product>, AppError> {
        self.products.find_by_name(name).await
    }

    /// Cria o produto e suas tags numa transação; a notificação é agendada
    /// depois do commit e nunca desfaz a criação.
    pub async fn create(
        &self,
        payload: CreateProductPayload,
        actor: Option<Uuid>,
    ) -> Result<ProductDetail, AppError> {
        self.check_references(payload.category_id, &payload.tag_ids).await?;

        let new_product = NewProduct {
            name: payload.name.trim().to_string(),
            price: payload.price,
            stock: payload.stock,
            category_id: payload.category_id,
            created_by: actor,
        };

        let mut tx = self.products.pool().begin().await?;
        let product = self.products.insert(&mut *tx, &new_product).await?;
        self.products.set_tags(&mut tx, product.id, &payload.tag_ids).await?;
        tx.commit().await?;

        tracing::info!(product_id = %product.id, name = %product.name, "Produto criado");
        self.hooks.after_save(ProductSaved::Created(&product)).await;

        self.describe(product).await
    }

    /// PUT (payload completo) e PATCH (parcial) passam por aqui.
    pub async fn update(
        &self,
        id: Uuid,
        payload: UpdateProductPayload,
        actor: Option<Uuid>,
    ) -> Result<ProductDetail, AppError> {
        let mut product = self.load(id).await?;

        if payload.category_id.is_some() || payload.tag_ids.is_some() {
            self.check_references(
                payload.category_id.flatten(),
                payload.tag_ids.as_deref().unwrap_or_default(),
            )
            .await?;
        }

        payload.apply_to(&mut product);
        product.audit.touch(actor, Utc::now());
        let saved = self.save(&product, payload.tag_ids.as_deref()).await?;
        self.describe(saved).await
    }

    /// DELETE: exclusão lógica. Excluir um produto já excluído não muda nada.
    pub async fn soft_delete(&self, id: Uuid, actor: Option<Uuid>) -> Result<(), AppError> {
        let mut product = self.load(id).await?;
        if product.is_active() {
            product.audit.soft_delete(actor, Utc::now());
            self.save(&product, None).await?;
        }
        Ok(())
    }

    /// `activate`/`deactivate`. Pedir o estado atual é erro 400.
    pub async fn set_active(
        &self,
        id: Uuid,
        active: bool,
        actor: Option<Uuid>,
    ) -> Result<ProductDetail, AppError> {
        let mut product = self.load(id).await?;
        match (active, product.is_active()) {
            (true, true) => return Err(AppError::bad_request("product_already_active")),
            (false, false) => return Err(AppError::bad_request("product_already_inactive")),
            (true, false) => product.audit.restore(actor, Utc::now()),
            (false, true) => product.audit.soft_delete(actor, Utc::now()),
        }
        let saved = self.save(&product, None).await?;
        self.describe(saved).await
    }

    pub async fn apply_discount(
        &self,
        id: Uuid,
        percentage: Decimal,
        actor: Option<Uuid>,
    ) -> Result<DiscountResponse, AppError> {
        let mut product = self.load(id).await?;
        let old_price = product.price;
        let new_price = product
            .apply_discount(percentage)
            .map_err(|e| field_error("percentage", e))?;

        product.price = new_price;
        product.audit.touch(actor, Utc::now());
        let saved = self.save(&product, None).await?;

        Ok(DiscountResponse {
            old_price,
            new_price,
            discount_percentage: percentage,
            product: self.describe(saved).await?,
        })
    }

    pub async fn recent(&self, days: Option<&str>, page: PageRequest) -> Result<Page<ProductListItem>, AppError> {
        let days = parse_days(days)?;
        let since = Utc::now() - Duration::days(days);
        let (rows, count) = self.products.recent(since, &page).await?;
        Ok(Page::new(rows.iter().map(ProductListItem::from).collect(), count, &page))
    }

    pub async fn price_range(
        &self,
        min: Option<&str>,
        max: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<ProductListItem>, AppError> {
        let (min, max) = parse_price_range(min, max)?;
        let (rows, count) = self.products.price_range(min, max, &page).await?;
        Ok(Page::new(rows.iter().map(ProductListItem::from).collect(), count, &page))
    }

    /// Agenda a troca de status em lote no worker. Aqui a fila é obrigatória:
    /// sem ela o pedido falha com 503.
    pub async fn schedule_bulk_status(&self, payload: &BulkStatusPayload) -> Result<TaskId, AppError> {
        let task_id = self
            .queue
            .enqueue(Job::BulkUpdateProductStatus {
                product_ids: payload.product_ids.clone(),
                is_deleted: payload.is_deleted,
            })
            .await?;
        tracing::info!(%task_id, count = payload.product_ids.len(), "Atualização de status em lote agendada");
        Ok(task_id)
    }

    pub async fn statistics(&self) -> Result<ProductStatistics, AppError> {
        self.products.statistics().await
    }

    /// Remoção física de todos os produtos (`seed-database --clear`).
    pub async fn purge_all(&self) -> Result<usize, AppError> {
        let removed = self.products.delete_all().await?;
        for product in &removed {
            self.hooks.after_delete(product);
        }
        Ok(removed.len())
    }

    // ---
    // Internos
    // ---

    async fn load(&self, id: Uuid) -> Result<Product, AppError> {
        self.products
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("product_not_found"))
    }

    async fn save(&self, product: &Product, tag_ids: Option<&[Uuid]>) -> Result<Product, AppError> {
        self.hooks.before_update(&self.products, product).await;

        let mut tx = self.products.pool().begin().await?;
        let saved = self.products.update(&mut *tx, product).await?;
        if let Some(tag_ids) = tag_ids {
            self.products.set_tags(&mut tx, saved.id, tag_ids).await?;
        }
        tx.commit().await?;

        self.hooks.after_save(ProductSaved::Updated(&saved)).await;
        Ok(saved)
    }

    async fn describe(&self, product: Product) -> Result<ProductDetail, AppError> {
        let mut tags = self.products.tags_for(&[product.id]).await?;
        let category_name = match product.category_id {
            Some(category_id) => self
                .products
                .category_names(&[category_id])
                .await?
                .remove(&category_id),
            None => None,
        };
        let tags = tags.remove(&product.id).unwrap_or_default();
        Ok(ProductDetail::build(product, category_name, tags, Utc::now()))
    }

    /// Categoria precisa existir e estar ativa; todas as tags precisam existir.
    async fn check_references(&self, category_id: Option<Uuid>, tag_ids: &[Uuid]) -> Result<(), AppError> {
        let mut errors = ValidationErrors::new();

        if let Some(category_id) = category_id {
            let usable = self
                .categories
                .find(category_id)
                .await?
                .is_some_and(|category| category.audit.is_active());
            if !usable {
                errors.add("category_id", ValidationError::new("category_missing"));
            }
        }

        if !tag_ids.is_empty() {
            let wanted: HashSet<&Uuid> = tag_ids.iter().collect();
            if self.tags.count_existing(tag_ids).await? != wanted.len() as i64 {
                errors.add("tag_ids", ValidationError::new("tag_missing"));
            }
        }

        if errors.errors().is_empty() { Ok(()) } else { Err(errors.into()) }
    }
}

fn field_error(field: &'static str, error: ValidationError) -> AppError {
    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    AppError::ValidationError(errors)
}

/// `?days=`: ausente vale 7; precisa ser inteiro entre 1 e 365.
pub fn parse_days(raw: Option<&str>) -> Result<i64, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(RECENT_DEFAULT_DAYS);
    };
    let days: i64 = raw.parse().map_err(|_| AppError::bad_request("days_invalid"))?;
    if !(1..=RECENT_MAX_DAYS).contains(&days) {
        return Err(AppError::bad_request("days_out_of_range"));
    }
    Ok(days)
}

/// `?min=&max=`: os dois são obrigatórios, decimais, e min <= max.
pub fn parse_price_range(min: Option<&str>, max: Option<&str>) -> Result<(Decimal, Decimal), AppError> {
    fn present(v: Option<&str>) -> Option<&str> {
        v.map(str::trim).filter(|v| !v.is_empty())
    }
    let (Some(min), Some(max)) = (present(min), present(max)) else {
        return Err(AppError::bad_request("price_range_required"));
    };
    let parse = |v: &str| v.parse::<Decimal>().map_err(|_| AppError::bad_request("price_range_invalid"));
    let (min, max) = (parse(min)?, parse(max)?);
    if min > max {
        return Err(AppError::bad_request("price_range_inverted"));
    }
    Ok((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(err: AppError) -> &'static str {
        match err {
            AppError::BadRequest { key, .. } => key,
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn days_default_and_bounds() {
        assert_eq!(parse_days(None).unwrap(), 7);
        assert_eq!(parse_days(Some("30")).unwrap(), 30);
        assert_eq!(parse_days(Some("365")).unwrap(), 365);
        assert_eq!(key(parse_days(Some("400")).unwrap_err()), "days_out_of_range");
        assert_eq!(key(parse_days(Some("0")).unwrap_err()), "days_out_of_range");
        assert_eq!(key(parse_days(Some("abc")).unwrap_err()), "days_invalid");
    }

    #[test]
    fn price_range_requires_both_bounds() {
        assert_eq!(key(parse_price_range(Some("10"), None).unwrap_err()), "price_range_required");
        assert_eq!(key(parse_price_range(None, Some("10")).unwrap_err()), "price_range_required");
        assert_eq!(key(parse_price_range(Some(" "), Some("10")).unwrap_err()), "price_range_required");
    }

    #[test]
    fn price_range_rejects_inverted_or_garbage() {
        assert_eq!(key(parse_price_range(Some("10"), Some("5")).unwrap_err()), "price_range_inverted");
        assert_eq!(key(parse_price_range(Some("ten"), Some("5")).unwrap_err()), "price_range_invalid");
        let (min, max) = parse_price_range(Some("10.00"), Some("100")).unwrap();
        assert!(min < max);
    }
}
