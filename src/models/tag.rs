// src/models/tag.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::common::validators::{validate_color, validate_tag_name};

pub const DEFAULT_TAG_COLOR: &str = "#007BFF";
pub const POPULAR_DEFAULT_LIMIT: i64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}

/// Forma resumida usada dentro do detalhe de produto.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct TagSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub color: String,
}

/// Tag com a contagem de produtos ativos associados.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TagDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub tag: Tag,
    pub products_count: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTagPayload {
    #[validate(custom(function = "validate_tag_name"))]
    pub name: String,

    #[serde(default = "default_color")]
    #[validate(custom(function = "validate_color"))]
    pub color: String,
}

fn default_color() -> String {
    DEFAULT_TAG_COLOR.to_string()
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTagPayload {
    #[validate(custom(function = "validate_tag_name"))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_color"))]
    pub color: Option<String>,
}

impl From<CreateTagPayload> for UpdateTagPayload {
    fn from(p: CreateTagPayload) -> Self {
        Self {
            name: Some(p.name),
            color: Some(p.color),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct TagQuery {
    pub name: Option<String>,
    #[serde(rename = "name__icontains")]
    pub name_icontains: Option<String>,
    pub color: Option<String>,
    pub search: Option<String>,
    /// "name", "-name", "created_at", "-created_at"
    pub ordering: Option<String>,
    pub page: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct PopularQuery {
    pub limit: Option<String>,
}

impl PopularQuery {
    /// Limite inválido ou fora de 1..=100 volta ao padrão.
    pub fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|n| (1..=100).contains(n))
            .unwrap_or(POPULAR_DEFAULT_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_defaults_when_omitted() {
        let payload: CreateTagPayload = serde_json::from_str(r#"{"name":"Sale"}"#).unwrap();
        assert_eq!(payload.color, DEFAULT_TAG_COLOR);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn invalid_color_is_a_field_error() {
        let payload = CreateTagPayload {
            name: "Sale".into(),
            color: "red".into(),
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("color"));
    }

    #[test]
    fn popular_limit_defaults_to_ten() {
        assert_eq!(PopularQuery::default().limit(), 10);
        assert_eq!(PopularQuery { limit: Some("3".into()) }.limit(), 3);
        assert_eq!(PopularQuery { limit: Some("abc".into()) }.limit(), 10);
        assert_eq!(PopularQuery { limit: Some("0".into()) }.limit(), 10);
    }
}
