// src/db/tag_repo.rs

use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{error::AppError, i18n::params, pagination::PageRequest},
    db::map_unique_violation,
    models::tag::{Tag, TagDetail, TagQuery},
};

const TAG_COLUMNS: &str = "id, name, slug, color, created_at, created_by";

const TAG_DETAIL_SELECT: &str = "SELECT t.id, t.name, t.slug, t.color, t.created_at, t.created_by, \
    (SELECT COUNT(*) FROM product_tags pt JOIN products p ON p.id = pt.product_id \
     WHERE pt.tag_id = t.id AND NOT p.is_deleted) AS products_count \
    FROM tags t";

const TAG_CONSTRAINTS: &[(&str, &str, &str)] = &[
    ("tags_name_key", "name", "tag_name_taken"),
    ("tags_slug_key", "name", "tag_slug_taken"),
];

#[derive(Clone)]
pub struct TagRepository {
    pool: PgPool,
}

impl TagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        name: &str,
        slug: &str,
        color: &str,
        created_by: Option<Uuid>,
    ) -> Result<Tag, AppError> {
        sqlx::query_as::<_, Tag>(&format!(
            "INSERT INTO tags (name, slug, color, created_by) VALUES ($1, $2, $3, $4) \
             RETURNING {TAG_COLUMNS}"
        ))
        .bind(name)
        .bind(slug)
        .bind(color)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict(e, name, slug))
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Tag>, AppError> {
        let tag = sqlx::query_as::<_, Tag>(&format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Tag>, AppError> {
        let tag = sqlx::query_as::<_, Tag>(&format!("SELECT {TAG_COLUMNS} FROM tags WHERE name = $1"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    pub async fn find_detail(&self, id: Uuid) -> Result<Option<TagDetail>, AppError> {
        let detail = sqlx::query_as::<_, TagDetail>(&format!("{TAG_DETAIL_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(detail)
    }

    /// Quantos dos ids informados existem.
    pub async fn count_existing(&self, ids: &[Uuid]) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE id = ANY($1)")
            .bind(ids)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn list(&self, query: &TagQuery, page: &PageRequest) -> Result<(Vec<TagDetail>, i64), AppError> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tags t");
        push_tag_filters(&mut count_qb, query);
        let count: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let order = match query.ordering.as_deref().map(str::trim) {
            Some("-name") => "t.name DESC",
            Some("created_at") => "t.created_at ASC",
            Some("-created_at") => "t.created_at DESC",
            _ => "t.name ASC",
        };

        let mut qb = QueryBuilder::<Postgres>::new(TAG_DETAIL_SELECT);
        push_tag_filters(&mut qb, query);
        qb.push(" ORDER BY ")
            .push(order)
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = qb.build_query_as::<TagDetail>().fetch_all(&self.pool).await?;

        Ok((rows, count))
    }

    /// Tags com mais produtos ativos; tags sem produtos ficam de fora.
    pub async fn popular(&self, limit: i64) -> Result<Vec<TagDetail>, AppError> {
        let rows = sqlx::query_as::<_, TagDetail>(&format!(
            "SELECT * FROM ({TAG_DETAIL_SELECT}) ranked WHERE products_count > 0 \
             ORDER BY products_count DESC, name ASC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn update(&self, tag: &Tag) -> Result<Tag, AppError> {
        sqlx::query_as::<_, Tag>(&format!(
            "UPDATE tags SET name = $2, slug = $3, color = $4 WHERE id = $1 RETURNING {TAG_COLUMNS}"
        ))
        .bind(tag.id)
        .bind(&tag.name)
        .bind(&tag.slug)
        .bind(&tag.color)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict(e, &tag.name, &tag.slug))?
        .ok_or(AppError::NotFound("tag_not_found"))
    }

    /// Tags não têm exclusão lógica; os vínculos com produtos caem em cascata.
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_all(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM tags").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn conflict(e: sqlx::Error, name: &str, slug: &str) -> AppError {
    map_unique_violation(
        e,
        TAG_CONSTRAINTS,
        params([("name", json!(name)), ("slug", json!(slug))]),
    )
}

fn push_tag_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &TagQuery) {
    qb.push(" WHERE TRUE");
    if let Some(name) = query.name.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        qb.push(" AND t.name = ").push_bind(name.to_string());
    }
    if let Some(term) = query.name_icontains.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        qb.push(" AND t.name ILIKE ").push_bind(format!("%{term}%"));
    }
    if let Some(color) = query.color.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        qb.push(" AND t.color = ").push_bind(color.to_ascii_uppercase());
    }
    if let Some(term) = query.search.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        qb.push(" AND t.name ILIKE ").push_bind(format!("%{term}%"));
    }
}
