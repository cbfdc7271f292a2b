// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "Catalog API", description = "Catálogo de produtos, categorias, tags e perfis"),
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::verify_token,
        handlers::auth::get_me,

        // --- Products ---
        handlers::products::list_products,
        handlers::products::create_product,
        handlers::products::get_product,
        handlers::products::replace_product,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::products::recent_products,
        handlers::products::price_range,
        handlers::products::deactivate_product,
        handlers::products::activate_product,
        handlers::products::apply_discount,
        handlers::products::bulk_status,
        handlers::products::statistics,

        // --- Categories ---
        handlers::categories::list_categories,
        handlers::categories::create_category,
        handlers::categories::get_category,
        handlers::categories::replace_category,
        handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::categories::category_tree,

        // --- Tags ---
        handlers::tags::list_tags,
        handlers::tags::create_tag,
        handlers::tags::get_tag,
        handlers::tags::replace_tag,
        handlers::tags::update_tag,
        handlers::tags::delete_tag,
        handlers::tags::popular_tags,

        // --- Profiles ---
        handlers::profiles::list_profiles,
        handlers::profiles::create_profile,
        handlers::profiles::get_profile,
        handlers::profiles::update_profile,
        handlers::profiles::delete_profile,
        handlers::profiles::get_my_profile,
        handlers::profiles::update_my_profile,

        // --- System ---
        handlers::system::health,
        handlers::system::info,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::TokenVerifyPayload,
            models::auth::TokenVerifyResponse,
            models::auth::UserSummary,

            // --- Products ---
            models::audit::AuditRecord,
            models::product::Product,
            models::product::ProductListItem,
            models::product::ProductDetail,
            models::product::CreateProductPayload,
            models::product::UpdateProductPayload,
            models::product::DiscountPayload,
            models::product::DiscountResponse,
            models::product::BulkStatusPayload,
            models::product::ProductStatusResponse,
            models::product::TaskScheduledResponse,
            models::product::ProductStatistics,

            // --- Categories ---
            models::category::Category,
            models::category::CategoryListItem,
            models::category::CategoryDetail,
            models::category::CategoryNode,
            models::category::CreateCategoryPayload,
            models::category::UpdateCategoryPayload,

            // --- Tags ---
            models::tag::Tag,
            models::tag::TagSummary,
            models::tag::TagDetail,
            models::tag::CreateTagPayload,
            models::tag::UpdateTagPayload,

            // --- Profiles ---
            models::profile::UserProfile,
            models::profile::ProfileListItem,
            models::profile::ProfileDetail,
            models::profile::CreateProfilePayload,
            models::profile::UpdateProfilePayload,

            // --- System ---
            handlers::system::HealthResponse,
            handlers::system::ApiInfo,
        )
    ),
    tags(
        (name = "Auth", description = "Registro, token JWT e conta atual"),
        (name = "Products", description = "Produtos, descontos e estatísticas"),
        (name = "Categories", description = "Categorias e árvore de categorias"),
        (name = "Tags", description = "Tags e tags populares"),
        (name = "Profiles", description = "Perfis de usuário"),
        (name = "System", description = "Saúde e metadados da API")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
