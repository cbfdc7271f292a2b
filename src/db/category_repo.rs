// src/db/category_repo.rs

use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    common::{error::AppError, i18n::params, pagination::PageRequest},
    db::map_unique_violation,
    models::{
        category::{Category, CategoryDetail, CategoryQuery},
        product::parse_bool,
    },
};

const CATEGORY_COLUMNS: &str = "id, name, slug, description, parent_id, created_at, updated_at, \
                                created_by, updated_by, is_deleted, deleted_at";

const CATEGORY_DETAIL_SELECT: &str = "SELECT c.id, c.name, c.slug, c.description, c.parent_id, \
    c.created_at, c.updated_at, c.created_by, c.updated_by, c.is_deleted, c.deleted_at, \
    p.name AS parent_name, \
    (SELECT COUNT(*) FROM categories ch WHERE ch.parent_id = c.id AND NOT ch.is_deleted) AS children_count, \
    (SELECT COUNT(*) FROM products pr WHERE pr.category_id = c.id AND NOT pr.is_deleted) AS products_count \
    FROM categories c LEFT JOIN categories p ON p.id = c.parent_id";

const CATEGORY_CONSTRAINTS: &[(&str, &str, &str)] = &[
    ("categories_name_key", "name", "category_name_taken"),
    ("categories_slug_key", "name", "category_slug_taken"),
];

#[derive(Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, category: &Category) -> Result<Category, AppError> {
        sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO categories (name, slug, description, parent_id, created_by, updated_by) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.parent_id)
        .bind(category.audit.created_by)
        .bind(category.audit.updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict(e, category))
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    pub async fn find_detail(&self, id: Uuid) -> Result<Option<CategoryDetail>, AppError> {
        let detail = sqlx::query_as::<_, CategoryDetail>(&format!("{CATEGORY_DETAIL_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(detail)
    }

    pub async fn list(
        &self,
        query: &CategoryQuery,
        page: &PageRequest,
    ) -> Result<(Vec<CategoryDetail>, i64), AppError> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM categories c");
        push_category_filters(&mut count_qb, query);
        let count: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(CATEGORY_DETAIL_SELECT);
        push_category_filters(&mut qb, query);
        qb.push(" ORDER BY ")
            .push(category_ordering(query.ordering.as_deref()))
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = qb.build_query_as::<CategoryDetail>().fetch_all(&self.pool).await?;

        Ok((rows, count))
    }

    /// Todas as categorias (ativas e excluídas) para montar a árvore.
    pub async fn all_details(&self) -> Result<Vec<CategoryDetail>, AppError> {
        let rows = sqlx::query_as::<_, CategoryDetail>(&format!("{CATEGORY_DETAIL_SELECT} ORDER BY c.name"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Mapa id -> pai de todas as categorias, para a checagem de ciclos.
    pub async fn parent_links(&self) -> Result<HashMap<Uuid, Option<Uuid>>, AppError> {
        let rows = sqlx::query_as::<_, (Uuid, Option<Uuid>)>("SELECT id, parent_id FROM categories")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn update(&self, category: &Category) -> Result<Category, AppError> {
        sqlx::query_as::<_, Category>(&format!(
            "UPDATE categories SET name = $2, slug = $3, description = $4, parent_id = $5, \
             updated_at = $6, updated_by = $7, is_deleted = $8, deleted_at = $9 \
             WHERE id = $1 RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.parent_id)
        .bind(category.audit.updated_at)
        .bind(category.audit.updated_by)
        .bind(category.audit.is_deleted)
        .bind(category.audit.deleted_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict(e, category))?
        .ok_or(AppError::NotFound("category_not_found"))
    }

    /// Remoção física de todas as categorias (apenas `seed-database --clear`).
    pub async fn delete_all(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM categories").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn conflict(e: sqlx::Error, category: &Category) -> AppError {
    map_unique_violation(
        e,
        CATEGORY_CONSTRAINTS,
        params([
            ("name", json!(category.name)),
            ("slug", json!(category.slug)),
        ]),
    )
}

fn category_ordering(raw: Option<&str>) -> &'static str {
    match raw.map(str::trim) {
        Some("-name") => "c.name DESC",
        Some("created_at") => "c.created_at ASC",
        Some("-created_at") => "c.created_at DESC",
        _ => "c.name ASC",
    }
}

fn push_category_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &CategoryQuery) {
    qb.push(" WHERE TRUE");
    if let Some(name) = query.name.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        qb.push(" AND c.name = ").push_bind(name.to_string());
    }
    if let Some(term) = query.name_icontains.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        qb.push(" AND c.name ILIKE ").push_bind(format!("%{term}%"));
    }
    if let Some(is_deleted) = query.is_deleted.as_deref().and_then(parse_bool) {
        qb.push(" AND c.is_deleted = ").push_bind(is_deleted);
    }
    // ids inválidos são ignorados, como os demais filtros
    if let Some(parent) = query.parent.as_deref().and_then(|v| Uuid::parse_str(v.trim()).ok()) {
        qb.push(" AND c.parent_id = ").push_bind(parent);
    }
    if let Some(is_null) = query.parent_isnull.as_deref().and_then(parse_bool) {
        qb.push(if is_null { " AND c.parent_id IS NULL" } else { " AND c.parent_id IS NOT NULL" });
    }
    if let Some(term) = query.search.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        let pattern = format!("%{term}%");
        qb.push(" AND (c.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR c.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_falls_back_to_name() {
        assert_eq!(category_ordering(None), "c.name ASC");
        assert_eq!(category_ordering(Some("-created_at")), "c.created_at DESC");
        assert_eq!(category_ordering(Some("slug; DROP TABLE")), "c.name ASC");
    }

    #[test]
    fn root_filter_and_unparseable_parent() {
        let query = CategoryQuery {
            parent: Some("not-a-uuid".into()),
            parent_isnull: Some("true".into()),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM categories c");
        push_category_filters(&mut qb, &query);
        assert_eq!(qb.sql(), "SELECT 1 FROM categories c WHERE TRUE AND c.parent_id IS NULL");
    }
}
