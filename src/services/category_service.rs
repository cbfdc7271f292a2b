// src/services/category_service.rs

use chrono::Utc;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::{
    common::{
        error::AppError,
        pagination::{Page, PageRequest},
        slug::slugify,
    },
    db::CategoryRepository,
    models::{
        audit::AuditRecord,
        category::{
            build_tree, check_parent, Category, CategoryDetail, CategoryListItem, CategoryNode,
            CategoryQuery, CreateCategoryPayload, UpdateCategoryPayload,
        },
    },
};

#[derive(Clone)]
pub struct CategoryService {
    categories: CategoryRepository,
}

impl CategoryService {
    pub fn new(categories: CategoryRepository) -> Self {
        Self { categories }
    }

    pub async fn list(&self, query: &CategoryQuery) -> Result<Page<CategoryListItem>, AppError> {
        let page = PageRequest { page: query.page };
        let (rows, count) = self.categories.list(query, &page).await?;
        Ok(Page::new(rows, count, &page).map(CategoryListItem::from))
    }

    pub async fn detail(&self, id: Uuid) -> Result<CategoryDetail, AppError> {
        self.categories
            .find_detail(id)
            .await?
            .ok_or(AppError::NotFound("category_not_found"))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Category>, AppError> {
        self.categories.find_by_name(name).await
    }

    /// Árvore das categorias ativas, raízes em ordem alfabética.
    pub async fn tree(&self) -> Result<Vec<CategoryNode>, AppError> {
        Ok(build_tree(self.categories.all_details().await?))
    }

    pub async fn create(
        &self,
        payload: CreateCategoryPayload,
        actor: Option<Uuid>,
    ) -> Result<CategoryDetail, AppError> {
        if let Some(parent_id) = payload.parent_id {
            self.validate_parent(None, parent_id).await?;
        }

        let name = payload.name.trim().to_string();
        let category = Category {
            id: Uuid::nil(),
            slug: slugify(&name),
            name,
            description: payload.description.trim().to_string(),
            parent_id: payload.parent_id,
            audit: AuditRecord::new(actor, Utc::now()),
        };
        let created = self.categories.insert(&category).await?;
        tracing::info!(category_id = %created.id, name = %created.name, "Categoria criada");
        self.detail(created.id).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        payload: UpdateCategoryPayload,
        actor: Option<Uuid>,
    ) -> Result<CategoryDetail, AppError> {
        let mut category = self.load(id).await?;

        if let Some(Some(parent_id)) = payload.parent_id {
            self.validate_parent(Some(id), parent_id).await?;
        }

        if let Some(name) = &payload.name {
            category.name = name.trim().to_string();
            category.slug = slugify(&category.name);
        }
        if let Some(description) = &payload.description {
            category.description = description.trim().to_string();
        }
        if let Some(parent_id) = payload.parent_id {
            category.parent_id = parent_id;
        }
        category.audit.touch(actor, Utc::now());

        self.categories.update(&category).await?;
        self.detail(id).await
    }

    /// Exclusão lógica; as subcategorias somem da árvore junto com o pai.
    pub async fn soft_delete(&self, id: Uuid, actor: Option<Uuid>) -> Result<(), AppError> {
        let mut category = self.load(id).await?;
        if category.audit.is_active() {
            category.audit.soft_delete(actor, Utc::now());
            self.categories.update(&category).await?;
            tracing::info!(category_id = %id, "Categoria desativada");
        }
        Ok(())
    }

    pub async fn purge_all(&self) -> Result<u64, AppError> {
        self.categories.delete_all().await
    }

    async fn load(&self, id: Uuid) -> Result<Category, AppError> {
        self.categories
            .find(id)
            .await?
            .ok_or(AppError::NotFound("category_not_found"))
    }

    async fn validate_parent(&self, category_id: Option<Uuid>, parent_id: Uuid) -> Result<(), AppError> {
        let links = self.categories.parent_links().await?;
        check_parent(category_id, parent_id, &links).map_err(|e| {
            let mut errors = ValidationErrors::new();
            errors.add("parent_id", e);
            AppError::ValidationError(errors)
        })
    }
}
