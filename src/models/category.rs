// src/models/category.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::{HashMap, HashSet};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{common::validators::validate_category_name, models::audit::AuditRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub parent_id: Option<Uuid>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditRecord,
}

/// Categoria com nome do pai e contagens agregadas.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CategoryDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub category: Category,
    pub parent_name: Option<String>,
    pub children_count: i64,
    pub products_count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryListItem {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<Uuid>,
    pub is_active: bool,
    pub products_count: i64,
}

impl From<CategoryDetail> for CategoryListItem {
    fn from(detail: CategoryDetail) -> Self {
        Self {
            id: detail.category.id,
            is_active: detail.category.audit.is_active(),
            name: detail.category.name,
            slug: detail.category.slug,
            parent_id: detail.category.parent_id,
            products_count: detail.products_count,
        }
    }
}

/// Nó da árvore de categorias; `children` some do JSON quando vazio.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryNode {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub products_count: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[schema(no_recursion)]
    pub children: Vec<CategoryNode>,
}

/// Monta a árvore a partir de todas as categorias ativas.
/// Categorias cujo pai está excluído ficam fora (não são alcançáveis por uma raiz).
pub fn build_tree(categories: Vec<CategoryDetail>) -> Vec<CategoryNode> {
    let mut by_parent: HashMap<Option<Uuid>, Vec<CategoryDetail>> = HashMap::new();
    for detail in categories
        .into_iter()
        .filter(|d| d.category.audit.is_active())
    {
        by_parent
            .entry(detail.category.parent_id)
            .or_default()
            .push(detail);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by(|a, b| a.category.name.cmp(&b.category.name));
    }

    let mut visited = HashSet::new();
    attach_children(None, &mut by_parent, &mut visited)
}

fn attach_children(
    parent: Option<Uuid>,
    by_parent: &mut HashMap<Option<Uuid>, Vec<CategoryDetail>>,
    visited: &mut HashSet<Uuid>,
) -> Vec<CategoryNode> {
    let Some(children) = by_parent.remove(&parent) else {
        return Vec::new();
    };
    children
        .into_iter()
        .filter_map(|detail| {
            if !visited.insert(detail.category.id) {
                return None;
            }
            let id = detail.category.id;
            Some(CategoryNode {
                id,
                name: detail.category.name,
                slug: detail.category.slug,
                description: detail.category.description,
                products_count: detail.products_count,
                children: attach_children(Some(id), by_parent, visited),
            })
        })
        .collect()
}

/// Valida o novo pai de uma categoria: não pode ser ela mesma nem um descendente.
/// `parents` mapeia cada categoria existente ao seu pai.
/// A verificação só existe aqui, na camada de API; o banco aceita ciclos.
pub fn check_parent(
    category_id: Option<Uuid>,
    new_parent: Uuid,
    parents: &HashMap<Uuid, Option<Uuid>>,
) -> Result<(), ValidationError> {
    if !parents.contains_key(&new_parent) {
        return Err(ValidationError::new("parent_missing"));
    }
    let Some(category_id) = category_id else {
        // categoria nova ainda não tem descendentes
        return Ok(());
    };
    if new_parent == category_id {
        return Err(ValidationError::new("category_self_parent"));
    }

    // sobe a partir do novo pai; se chegar na própria categoria, haveria ciclo
    let mut seen = HashSet::new();
    let mut cursor = Some(new_parent);
    while let Some(current) = cursor {
        if current == category_id {
            return Err(ValidationError::new("category_cycle"));
        }
        if !seen.insert(current) {
            break;
        }
        cursor = parents.get(&current).copied().flatten();
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryPayload {
    #[validate(custom(function = "validate_category_name"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 2000, code = "name_length"))]
    pub description: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryPayload {
    #[validate(custom(function = "validate_category_name"))]
    pub name: Option<String>,
    #[validate(length(max = 2000, code = "name_length"))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_id: Option<Option<Uuid>>,
}

impl From<CreateCategoryPayload> for UpdateCategoryPayload {
    fn from(p: CreateCategoryPayload) -> Self {
        Self {
            name: Some(p.name),
            description: Some(p.description),
            parent_id: Some(p.parent_id),
        }
    }
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct CategoryQuery {
    pub name: Option<String>,
    #[serde(rename = "name__icontains")]
    pub name_icontains: Option<String>,
    pub is_deleted: Option<String>,
    pub parent: Option<String>,
    #[serde(rename = "parent__isnull")]
    pub parent_isnull: Option<String>,
    pub search: Option<String>,
    /// "name", "-name", "created_at", "-created_at"
    pub ordering: Option<String>,
    pub page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn detail(name: &str, parent: Option<Uuid>, deleted: bool) -> CategoryDetail {
        let mut audit = AuditRecord::new(None, Utc::now());
        if deleted {
            audit.soft_delete(None, Utc::now());
        }
        CategoryDetail {
            category: Category {
                id: Uuid::new_v4(),
                name: name.into(),
                slug: crate::common::slug::slugify(name),
                description: String::new(),
                parent_id: parent,
                audit,
            },
            parent_name: None,
            children_count: 0,
            products_count: 0,
        }
    }

    #[test]
    fn builds_nested_tree() {
        let electronics = detail("Electronics", None, false);
        let laptops = detail("Laptops", Some(electronics.category.id), false);
        let tree = build_tree(vec![laptops, electronics]);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].name, "Electronics");
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].name, "Laptops");
    }

    #[test]
    fn leaf_nodes_omit_children_key() {
        let tree = build_tree(vec![detail("Books", None, false)]);
        let json = serde_json::to_value(&tree).unwrap();
        assert!(json[0].get("children").is_none());
    }

    #[test]
    fn deleted_categories_and_their_subtrees_are_hidden() {
        let clothing = detail("Clothing", None, true);
        let mens = detail("Men's", Some(clothing.category.id), false);
        let books = detail("Books", None, false);
        let tree = build_tree(vec![clothing, mens, books]);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].name, "Books");
    }

    #[test]
    fn parent_check_rejects_self_and_descendants() {
        let root = Uuid::new_v4();
        let child = Uuid::new_v4();
        let grandchild = Uuid::new_v4();
        let parents = HashMap::from([
            (root, None),
            (child, Some(root)),
            (grandchild, Some(child)),
        ]);

        assert_eq!(check_parent(Some(root), root, &parents).unwrap_err().code, "category_self_parent");
        assert_eq!(check_parent(Some(root), grandchild, &parents).unwrap_err().code, "category_cycle");
        assert!(check_parent(Some(grandchild), root, &parents).is_ok());
        assert!(check_parent(None, child, &parents).is_ok());
        assert_eq!(
            check_parent(Some(child), Uuid::new_v4(), &parents).unwrap_err().code,
            "parent_missing"
        );
    }

    #[test]
    fn parent_check_terminates_on_existing_cycles() {
        // ciclo gravado diretamente no banco, fora da API
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let parents = HashMap::from([(a, Some(b)), (b, Some(a)), (c, None)]);
        assert!(check_parent(Some(c), a, &parents).is_ok());
    }
}
