// src/db/product_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::PageRequest},
    models::{
        product::{NewProduct, Product, ProductFilter, ProductStatistics},
        tag::TagSummary,
    },
};

const PRODUCT_COLUMNS: &str = "id, name, price, stock, category_id, created_at, updated_at, \
                               created_by, updated_by, is_deleted, deleted_at";

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn insert<'e, E>(&self, executor: E, new: &NewProduct) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (name, price, stock, category_id, created_by, updated_by) \
             VALUES ($1, $2, $3, $4, $5, $5) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(new.price)
        .bind(new.stock)
        .bind(new.category_id)
        .bind(new.created_by)
        .fetch_one(executor)
        .await?;
        Ok(product)
    }

    /// Substitui as tags de um produto (dentro da transação de quem chama).
    pub async fn set_tags(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        tag_ids: &[Uuid],
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM product_tags WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *conn)
            .await?;
        if !tag_ids.is_empty() {
            sqlx::query(
                "INSERT INTO product_tags (product_id, tag_id) \
                 SELECT $1, t FROM UNNEST($2::uuid[]) AS t ON CONFLICT DO NOTHING",
            )
            .bind(product_id)
            .bind(tag_ids)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE name = $1 ORDER BY created_at LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: &PageRequest,
    ) -> Result<(Vec<Product>, i64), AppError> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_product_filters(&mut count_qb, filter);
        let count: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_product_filters(&mut qb, filter);
        // ordering.sql() só produz nomes de coluna conhecidos
        qb.push(" ORDER BY ")
            .push(filter.ordering.sql())
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;

        Ok((rows, count))
    }

    /// Grava o estado completo de um produto já existente.
    pub async fn update<'e, E>(&self, executor: E, product: &Product) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET name = $2, price = $3, stock = $4, category_id = $5, \
             updated_at = $6, updated_by = $7, is_deleted = $8, deleted_at = $9 \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(product.id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.category_id)
        .bind(product.audit.updated_at)
        .bind(product.audit.updated_by)
        .bind(product.audit.is_deleted)
        .bind(product.audit.deleted_at)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("product_not_found"))
    }

    /// Exclusão/restauração lógica em lote. Só toca linhas cujo estado muda
    /// e devolve os ids alterados. Não passa pelos hooks de produto.
    pub async fn bulk_set_deleted(&self, ids: &[Uuid], is_deleted: bool) -> Result<Vec<Uuid>, AppError> {
        let changed = sqlx::query_scalar::<_, Uuid>(
            "UPDATE products SET is_deleted = $2, \
             deleted_at = CASE WHEN $2 THEN NOW() ELSE NULL END, updated_at = NOW() \
             WHERE id = ANY($1) AND is_deleted <> $2 \
             RETURNING id",
        )
        .bind(ids)
        .bind(is_deleted)
        .fetch_all(&self.pool)
        .await?;
        Ok(changed)
    }

    /// `(id, updated_at)` de todos os produtos ativos, para o sitemap.
    pub async fn active_modifications(&self) -> Result<Vec<(Uuid, DateTime<Utc>)>, AppError> {
        let rows = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            "SELECT id, updated_at FROM products WHERE NOT is_deleted ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Produtos ativos criados a partir de `since`, mais recentes primeiro.
    pub async fn recent(
        &self,
        since: DateTime<Utc>,
        page: &PageRequest,
    ) -> Result<(Vec<Product>, i64), AppError> {
        let filter = ProductFilter {
            is_deleted: Some(false),
            created_gte: Some(since),
            ..Default::default()
        };
        self.list(&filter, page).await
    }

    /// Produtos ativos com preço em [min, max], do mais barato ao mais caro.
    pub async fn price_range(
        &self,
        min: Decimal,
        max: Decimal,
        page: &PageRequest,
    ) -> Result<(Vec<Product>, i64), AppError> {
        let filter = ProductFilter {
            is_deleted: Some(false),
            price_gte: Some(min),
            price_lte: Some(max),
            ordering: crate::models::product::Ordering::parse(Some("price")),
            ..Default::default()
        };
        self.list(&filter, page).await
    }

    pub async fn statistics(&self) -> Result<ProductStatistics, AppError> {
        let stats = sqlx::query_as::<_, ProductStatistics>(
            "SELECT COUNT(*) AS total, \
                    COUNT(*) FILTER (WHERE NOT is_deleted) AS active, \
                    COUNT(*) FILTER (WHERE is_deleted) AS deleted, \
                    COUNT(*) FILTER (WHERE NOT is_deleted AND created_at >= NOW() - INTERVAL '7 days') AS new_last_7_days, \
                    ROUND(AVG(price) FILTER (WHERE NOT is_deleted), 2) AS average_price, \
                    MIN(price) FILTER (WHERE NOT is_deleted) AS min_price, \
                    MAX(price) FILTER (WHERE NOT is_deleted) AS max_price, \
                    COALESCE(SUM(stock) FILTER (WHERE NOT is_deleted), 0)::BIGINT AS total_stock \
             FROM products",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    /// Tags de vários produtos de uma vez, agrupadas por produto.
    pub async fn tags_for(&self, product_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<TagSummary>>, AppError> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (Uuid, Uuid, String, String, String)>(
            "SELECT pt.product_id, t.id, t.name, t.slug, t.color \
             FROM product_tags pt JOIN tags t ON t.id = pt.tag_id \
             WHERE pt.product_id = ANY($1) ORDER BY t.name",
        )
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<TagSummary>> = HashMap::new();
        for (product_id, id, name, slug, color) in rows {
            grouped
                .entry(product_id)
                .or_default()
                .push(TagSummary { id, name, slug, color });
        }
        Ok(grouped)
    }

    /// Nomes das categorias referenciadas, para o detalhe de produto.
    pub async fn category_names(&self, category_ids: &[Uuid]) -> Result<HashMap<Uuid, String>, AppError> {
        if category_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, name FROM categories WHERE id = ANY($1)",
        )
        .bind(category_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn count_active(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE NOT is_deleted")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Remoção física de todos os produtos (apenas `seed-database --clear`).
    pub async fn delete_all(&self) -> Result<Vec<Product>, AppError> {
        let removed = sqlx::query_as::<_, Product>(&format!(
            "DELETE FROM products RETURNING {PRODUCT_COLUMNS}"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(removed)
    }
}

/// Leitura de um produto por id; costura usada pelos hooks e pelas tarefas,
/// que em testes recebem uma implementação em memória.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, AppError>;
}

#[async_trait]
impl ProductLookup for ProductRepository {
    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        self.find_by_id(id).await
    }
}

fn push_product_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE TRUE");
    if let Some(name) = &filter.name {
        qb.push(" AND name = ").push_bind(name.clone());
    }
    if let Some(term) = &filter.name_contains {
        qb.push(" AND name ILIKE ").push_bind(format!("%{term}%"));
    }
    if let Some(price) = filter.price {
        qb.push(" AND price = ").push_bind(price);
    }
    if let Some(min) = filter.price_gte {
        qb.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = filter.price_lte {
        qb.push(" AND price <= ").push_bind(max);
    }
    if let Some(is_deleted) = filter.is_deleted {
        qb.push(" AND is_deleted = ").push_bind(is_deleted);
    }
    if let Some(from) = filter.created_gte {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(until) = filter.created_lte {
        qb.push(" AND created_at <= ").push_bind(until);
    }
    if let Some(term) = &filter.search {
        // busca no nome do produto e no nome da categoria
        let pattern = format!("%{term}%");
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR category_id IN (SELECT id FROM categories WHERE name ILIKE ")
            .push_bind(pattern)
            .push("))");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn filters_render_bound_parameters() {
        let filter = ProductFilter {
            name_contains: Some("book".into()),
            price_gte: Some(Decimal::from_str("10").unwrap()),
            is_deleted: Some(false),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_product_filters(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM products WHERE TRUE AND name ILIKE $1 AND price >= $2 AND is_deleted = $3"
        );
    }

    #[test]
    fn search_covers_category_names() {
        let filter = ProductFilter {
            search: Some("phone".into()),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM products");
        push_product_filters(&mut qb, &filter);
        assert!(qb.sql().contains("category_id IN (SELECT id FROM categories WHERE name ILIKE $2)"));
    }
}
