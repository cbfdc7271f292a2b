// src/models/product.rs

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::validators::{
        validate_discount, validate_price, validate_product_name, validate_stock,
    },
    models::{audit::AuditRecord, tag::TagSummary},
};

/// Janela em que um produto é considerado "novo".
pub const NEW_PRODUCT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub stock: i32,
    pub category_id: Option<Uuid>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditRecord,
}

impl Product {
    pub fn is_active(&self) -> bool {
        self.audit.is_active()
    }

    pub fn is_new(&self, now: DateTime<Utc>) -> bool {
        now - self.audit.created_at <= Duration::days(NEW_PRODUCT_WINDOW_DAYS)
    }

    pub fn age_in_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.audit.created_at).num_days()
    }

    /// "R$ 2499.99"
    pub fn formatted_price(&self) -> String {
        format_price(self.price)
    }

    /// Preço com desconto percentual, arredondado em centavos.
    /// O resultado precisa continuar sendo um preço válido.
    pub fn apply_discount(&self, percent: Decimal) -> Result<Decimal, ValidationError> {
        validate_discount(&percent)?;
        let factor = (Decimal::ONE_HUNDRED - percent) / Decimal::ONE_HUNDRED;
        let discounted = (self.price * factor)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        validate_price(&discounted)?;
        Ok(discounted)
    }
}

pub fn format_price(price: Decimal) -> String {
    let mut cents = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    cents.rescale(2);
    format!("R$ {cents}")
}

/// Campos de um produto a inserir (já validados).
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

// ---
// Payloads da API
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductPayload {
    #[validate(custom(function = "validate_product_name"))]
    pub name: String,

    #[validate(custom(function = "validate_price"))]
    #[schema(value_type = f64)]
    pub price: Decimal,

    #[serde(default)]
    #[validate(custom(function = "validate_stock"))]
    pub stock: i32,

    pub category_id: Option<Uuid>,

    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

/// PUT exige os mesmos campos da criação; PATCH aceita qualquer subconjunto.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductPayload {
    #[validate(custom(function = "validate_product_name"))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_price"))]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,

    #[validate(custom(function = "validate_stock"))]
    pub stock: Option<i32>,

    // `Some(None)` remove a categoria; ausente mantém a atual.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub category_id: Option<Option<Uuid>>,

    pub tag_ids: Option<Vec<Uuid>>,
}

impl From<CreateProductPayload> for UpdateProductPayload {
    fn from(p: CreateProductPayload) -> Self {
        Self {
            name: Some(p.name),
            price: Some(p.price),
            stock: Some(p.stock),
            category_id: Some(p.category_id),
            tag_ids: Some(p.tag_ids),
        }
    }
}

impl UpdateProductPayload {
    /// Aplica as alterações presentes sobre uma cópia do produto.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.trim().to_string();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(category_id) = self.category_id {
            product.category_id = category_id;
        }
    }
}

// Distingue "campo ausente" de "campo null" em PATCH.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DiscountPayload {
    #[validate(custom(function = "validate_discount"))]
    #[schema(value_type = f64)]
    pub percentage: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkStatusPayload {
    #[validate(length(min = 1, code = "required"))]
    pub product_ids: Vec<Uuid>,
    pub is_deleted: bool,
}

// ---
// Filtros de listagem
// ---

/// Parâmetros de `GET /api/v1/products/`. Valores numéricos e datas chegam
/// como texto; os que não fazem parse são ignorados.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ProductQuery {
    pub name: Option<String>,
    #[serde(rename = "name__icontains")]
    pub name_icontains: Option<String>,
    pub price: Option<String>,
    #[serde(rename = "price__gte")]
    pub price_gte: Option<String>,
    #[serde(rename = "price__lte")]
    pub price_lte: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub is_deleted: Option<String>,
    pub active_only: Option<String>,
    #[serde(rename = "created_at__gte")]
    pub created_gte: Option<String>,
    #[serde(rename = "created_at__lte")]
    pub created_lte: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductOrderField {
    Name,
    Price,
    CreatedAt,
    UpdatedAt,
    IsDeleted,
}

impl ProductOrderField {
    pub fn column(&self) -> &'static str {
        match self {
            ProductOrderField::Name => "name",
            ProductOrderField::Price => "price",
            ProductOrderField::CreatedAt => "created_at",
            ProductOrderField::UpdatedAt => "updated_at",
            ProductOrderField::IsDeleted => "is_deleted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    pub field: ProductOrderField,
    pub descending: bool,
}

impl Default for Ordering {
    // mais recentes primeiro
    fn default() -> Self {
        Self {
            field: ProductOrderField::CreatedAt,
            descending: true,
        }
    }
}

impl Ordering {
    /// "-price" -> preço decrescente. Campos desconhecidos usam a ordem padrão.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Self::default();
        };
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let field = match name {
            "name" => ProductOrderField::Name,
            "price" => ProductOrderField::Price,
            "created_at" => ProductOrderField::CreatedAt,
            "updated_at" => ProductOrderField::UpdatedAt,
            "is_deleted" => ProductOrderField::IsDeleted,
            _ => return Self::default(),
        };
        Self { field, descending }
    }

    pub fn sql(&self) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        format!("{} {}, id {}", self.field.column(), direction, direction)
    }
}

/// Filtro já interpretado, pronto para virar SQL no repositório.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub name: Option<String>,
    pub name_contains: Option<String>,
    pub price: Option<Decimal>,
    pub price_gte: Option<Decimal>,
    pub price_lte: Option<Decimal>,
    pub is_deleted: Option<bool>,
    pub created_gte: Option<DateTime<Utc>>,
    pub created_lte: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub ordering: Ordering,
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_decimal(raw: &Option<String>) -> Option<Decimal> {
    raw.as_deref().and_then(|v| v.trim().parse::<Decimal>().ok())
}

fn parse_datetime(raw: &Option<String>) -> Option<DateTime<Utc>> {
    let raw = raw.as_deref()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn non_empty(raw: &Option<String>) -> Option<String> {
    raw.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl ProductQuery {
    pub fn to_filter(&self) -> ProductFilter {
        // `active_only=true` equivale a `is_deleted=false`; `is_deleted` explícito vence.
        let is_deleted = self
            .is_deleted
            .as_deref()
            .and_then(parse_bool)
            .or_else(|| {
                self.active_only
                    .as_deref()
                    .and_then(parse_bool)
                    .filter(|active| *active)
                    .map(|_| false)
            });

        ProductFilter {
            name: non_empty(&self.name),
            name_contains: non_empty(&self.name_icontains),
            price: parse_decimal(&self.price),
            price_gte: parse_decimal(&self.price_gte).or(parse_decimal(&self.min_price)),
            price_lte: parse_decimal(&self.price_lte).or(parse_decimal(&self.max_price)),
            is_deleted,
            created_gte: parse_datetime(&self.created_gte),
            created_lte: parse_datetime(&self.created_lte),
            search: non_empty(&self.search),
            ordering: Ordering::parse(self.ordering.as_deref()),
        }
    }
}

// ---
// Representações de saída
// ---

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductListItem {
    pub id: Uuid,
    pub name: String,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub formatted_price: String,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Product> for ProductListItem {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            price: p.price,
            formatted_price: p.formatted_price(),
            stock: p.stock,
            is_active: p.is_active(),
            created_at: p.audit.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub formatted_price: String,
    pub is_active: bool,
    pub is_new: bool,
    pub age_in_days: i64,
    pub category_name: Option<String>,
    pub tags: Vec<TagSummary>,
}

impl ProductDetail {
    pub fn build(
        product: Product,
        category_name: Option<String>,
        tags: Vec<TagSummary>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            formatted_price: product.formatted_price(),
            is_active: product.is_active(),
            is_new: product.is_new(now),
            age_in_days: product.age_in_days(now),
            category_name,
            tags,
            product,
        }
    }
}

/// Parâmetros de `GET /api/v1/products/recent/`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct RecentQuery {
    /// Janela em dias (1 a 365, padrão 7)
    pub days: Option<String>,
    pub page: Option<i64>,
}

/// Parâmetros de `GET /api/v1/products/price-range/`; ambos obrigatórios.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct PriceRangeQuery {
    pub min: Option<String>,
    pub max: Option<String>,
    pub page: Option<i64>,
}

/// Resposta de ativação/desativação.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductStatusResponse {
    pub message: String,
    pub data: ProductDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DiscountResponse {
    #[schema(value_type = f64)]
    pub old_price: Decimal,
    #[schema(value_type = f64)]
    pub new_price: Decimal,
    #[schema(value_type = f64)]
    pub discount_percentage: Decimal,
    pub product: ProductDetail,
}

/// Resposta do agendamento de `bulk-status`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskScheduledResponse {
    pub message: String,
    pub task_id: Uuid,
    pub count: usize,
}

/// Agregados de `GET /api/v1/products/statistics/`.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ProductStatistics {
    pub total: i64,
    pub active: i64,
    pub deleted: i64,
    pub new_last_7_days: i64,
    #[schema(value_type = Option<f64>)]
    pub average_price: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub min_price: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub max_price: Option<Decimal>,
    pub total_stock: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(v: &str) -> Decimal {
        Decimal::from_str(v).unwrap()
    }

    fn product(price: &str, created_at: DateTime<Utc>) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Laptop".into(),
            price: dec(price),
            stock: 5,
            category_id: None,
            audit: AuditRecord::new(None, created_at),
        }
    }

    #[test]
    fn formats_price_with_two_decimals() {
        let now = Utc::now();
        assert_eq!(product("99.99", now).formatted_price(), "R$ 99.99");
        assert_eq!(product("100", now).formatted_price(), "R$ 100.00");
        assert_eq!(format_price(dec("0.005")), "R$ 0.01");
    }

    #[test]
    fn novelty_and_age() {
        let now = Utc::now();
        let fresh = product("10", now - Duration::days(3));
        let old = product("10", now - Duration::days(30));
        assert!(fresh.is_new(now));
        assert!(!old.is_new(now));
        assert_eq!(old.age_in_days(now), 30);
    }

    #[test]
    fn discount_rounds_to_cents() {
        let now = Utc::now();
        assert_eq!(product("100.00", now).apply_discount(dec("10")).unwrap(), dec("90.00"));
        assert_eq!(product("19.99", now).apply_discount(dec("15")).unwrap(), dec("16.99"));
    }

    #[test]
    fn discount_rejects_out_of_range_or_free_products() {
        let p = product("100.00", Utc::now());
        assert_eq!(p.apply_discount(Decimal::ZERO).unwrap_err().code, "discount_out_of_range");
        assert_eq!(p.apply_discount(dec("100")).unwrap_err().code, "price_not_positive");
    }

    #[test]
    fn create_payload_rejects_bad_values_before_the_store() {
        let payload = CreateProductPayload {
            name: "  ab ".into(),
            price: dec("-5"),
            stock: -1,
            category_id: None,
            tag_ids: vec![],
        };
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("price"));
        assert!(fields.contains_key("stock"));
    }

    #[test]
    fn non_numeric_price_fails_to_deserialize() {
        let parsed: Result<CreateProductPayload, _> =
            serde_json::from_str(r#"{"name":"Laptop","price":"abc"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn patch_distinguishes_null_from_absent_category() {
        let absent: UpdateProductPayload = serde_json::from_str(r#"{"stock":3}"#).unwrap();
        let cleared: UpdateProductPayload =
            serde_json::from_str(r#"{"category_id":null}"#).unwrap();
        assert_eq!(absent.category_id, None);
        assert_eq!(cleared.category_id, Some(None));
    }

    #[test]
    fn update_applies_only_present_fields() {
        let mut p = product("10", Utc::now());
        let category = Uuid::new_v4();
        let patch = UpdateProductPayload {
            name: Some("  Gaming Laptop ".into()),
            category_id: Some(Some(category)),
            ..Default::default()
        };
        patch.apply_to(&mut p);
        assert_eq!(p.name, "Gaming Laptop");
        assert_eq!(p.price, dec("10"));
        assert_eq!(p.category_id, Some(category));
    }

    #[test]
    fn ordering_parses_direction_and_rejects_unknown_fields() {
        assert_eq!(
            Ordering::parse(Some("-price")),
            Ordering { field: ProductOrderField::Price, descending: true }
        );
        assert_eq!(Ordering::parse(Some("stock")), Ordering::default());
        assert_eq!(Ordering::parse(Some("name")).sql(), "name ASC, id ASC");
    }

    #[test]
    fn query_filter_ignores_unparseable_values() {
        let query = ProductQuery {
            price_gte: Some("abc".into()),
            min_price: Some("10".into()),
            max_price: Some("x".into()),
            active_only: Some("true".into()),
            created_gte: Some("2024-01-31".into()),
            ..Default::default()
        };
        let filter = query.to_filter();
        assert_eq!(filter.price_gte, Some(dec("10")));
        assert_eq!(filter.price_lte, None);
        assert_eq!(filter.is_deleted, Some(false));
        assert!(filter.created_gte.is_some());
    }
}
