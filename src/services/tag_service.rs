// src/services/tag_service.rs

use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{Page, PageRequest},
        slug::slugify,
        validators::normalize_color,
    },
    db::TagRepository,
    models::tag::{CreateTagPayload, Tag, TagDetail, TagQuery, UpdateTagPayload},
};

#[derive(Clone)]
pub struct TagService {
    tags: TagRepository,
}

impl TagService {
    pub fn new(tags: TagRepository) -> Self {
        Self { tags }
    }

    pub async fn list(&self, query: &TagQuery) -> Result<Page<TagDetail>, AppError> {
        let page = PageRequest { page: query.page };
        let (rows, count) = self.tags.list(query, &page).await?;
        Ok(Page::new(rows, count, &page))
    }

    pub async fn detail(&self, id: Uuid) -> Result<TagDetail, AppError> {
        self.tags
            .find_detail(id)
            .await?
            .ok_or(AppError::NotFound("tag_not_found"))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Tag>, AppError> {
        self.tags.find_by_name(name).await
    }

    pub async fn popular(&self, limit: i64) -> Result<Vec<TagDetail>, AppError> {
        self.tags.popular(limit).await
    }

    pub async fn create(&self, payload: CreateTagPayload, actor: Option<Uuid>) -> Result<TagDetail, AppError> {
        let name = payload.name.trim();
        let tag = self
            .tags
            .insert(name, &slugify(name), &normalize_color(&payload.color), actor)
            .await?;
        tracing::info!(tag_id = %tag.id, name = %tag.name, "Tag criada");
        Ok(TagDetail {
            tag,
            products_count: 0,
        })
    }

    pub async fn update(&self, id: Uuid, payload: UpdateTagPayload) -> Result<TagDetail, AppError> {
        let mut tag = self
            .tags
            .find(id)
            .await?
            .ok_or(AppError::NotFound("tag_not_found"))?;

        if let Some(name) = &payload.name {
            tag.name = name.trim().to_string();
            tag.slug = slugify(&tag.name);
        }
        if let Some(color) = &payload.color {
            tag.color = normalize_color(color);
        }

        self.tags.update(&tag).await?;
        self.detail(id).await
    }

    /// Tags não têm exclusão lógica.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.tags.delete(id).await? {
            return Err(AppError::NotFound("tag_not_found"));
        }
        tracing::info!(tag_id = %id, "Tag removida");
        Ok(())
    }

    pub async fn purge_all(&self) -> Result<u64, AppError> {
        self.tags.delete_all().await
    }
}
