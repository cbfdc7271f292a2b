// src/app.rs

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method, Uri},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tower::{
    util::{MapRequest, MapRequestLayer},
    Layer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::{AppState, Settings},
    docs::ApiDoc,
    handlers,
    middleware::{hosts::allowed_hosts, throttle::throttle},
    pages,
};

const DOCS_PATH: &str = "/api/docs";

/// Aplicação pronta para servir.
pub type App = MapRequest<Router, fn(Request) -> Request>;

/// `/api/v1/products/` vira `/api/v1/products`. A UI de documentação fica de
/// fora: ela mesma redireciona `/api/docs` para `/api/docs/`.
fn trim_trailing_slash(mut request: Request) -> Request {
    let path = request.uri().path();
    if path.len() <= 1 || !path.ends_with('/') || path.starts_with(DOCS_PATH) {
        return request;
    }

    let trimmed = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    let rewritten = match request.uri().query() {
        Some(query) => format!("{trimmed}?{query}"),
        None => trimmed.to_string(),
    };
    if let Ok(uri) = rewritten.parse::<Uri>() {
        *request.uri_mut() = uri;
    }
    request
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Origem CORS inválida ignorada");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT_LANGUAGE])
        .allow_credentials(true)
}

fn api_v1_routes() -> Router<AppState> {
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/token", post(handlers::auth::login))
        .route("/token/verify", post(handlers::auth::verify_token))
        .route("/me", get(handlers::auth::get_me));

    let product_routes = Router::new()
        .route(
            "/",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route("/recent", get(handlers::products::recent_products))
        .route("/price-range", get(handlers::products::price_range))
        .route("/statistics", get(handlers::products::statistics))
        .route("/bulk-status", post(handlers::products::bulk_status))
        .route(
            "/{id}",
            get(handlers::products::get_product)
                .put(handlers::products::replace_product)
                .patch(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route("/{id}/deactivate", post(handlers::products::deactivate_product))
        .route("/{id}/activate", post(handlers::products::activate_product))
        .route("/{id}/discount", post(handlers::products::apply_discount));

    let category_routes = Router::new()
        .route(
            "/",
            get(handlers::categories::list_categories).post(handlers::categories::create_category),
        )
        .route("/tree", get(handlers::categories::category_tree))
        .route(
            "/{id}",
            get(handlers::categories::get_category)
                .put(handlers::categories::replace_category)
                .patch(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        );

    let tag_routes = Router::new()
        .route("/", get(handlers::tags::list_tags).post(handlers::tags::create_tag))
        .route("/popular", get(handlers::tags::popular_tags))
        .route(
            "/{id}",
            get(handlers::tags::get_tag)
                .put(handlers::tags::replace_tag)
                .patch(handlers::tags::update_tag)
                .delete(handlers::tags::delete_tag),
        );

    let profile_routes = Router::new()
        .route(
            "/",
            get(handlers::profiles::list_profiles).post(handlers::profiles::create_profile),
        )
        .route(
            "/me",
            get(handlers::profiles::get_my_profile)
                .put(handlers::profiles::update_my_profile)
                .patch(handlers::profiles::update_my_profile),
        )
        .route(
            "/{id}",
            get(handlers::profiles::get_profile)
                .put(handlers::profiles::update_profile)
                .patch(handlers::profiles::update_profile)
                .delete(handlers::profiles::delete_profile),
        );

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/products", product_routes)
        .nest("/categories", category_routes)
        .nest("/tags", tag_routes)
        .nest("/profiles", profile_routes)
}

/// Monta a aplicação completa: API, páginas, mídia e documentação.
pub fn build_router(app_state: AppState) -> App {
    // Throttling só na API, aplicado depois do `nest` para ver o caminho inteiro.
    let api = Router::new()
        .nest("/api/v1", api_v1_routes())
        .route("/api/health", get(handlers::system::health))
        .route("/api/info", get(handlers::system::info))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), throttle));

    let media = ServeDir::new(&app_state.settings.media_root);
    let cors = cors_layer(&app_state.settings);

    let app = Router::new()
        .merge(api)
        .merge(pages::routes())
        .merge(SwaggerUi::new(DOCS_PATH).url("/api/openapi.json", ApiDoc::openapi()))
        .nest_service("/media", media)
        .fallback(handlers::system::fallback)
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), allowed_hosts))
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!("http", method = %request.method(), path = %request.uri().path())
        }))
        .layer(CatchPanicLayer::custom(handlers::system::panic_response))
        .with_state(app_state);

    MapRequestLayer::new(trim_trailing_slash as fn(Request) -> Request).layer(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn path_after(uri: &str) -> String {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        trim_trailing_slash(request).uri().to_string()
    }

    #[test]
    fn trailing_slash_is_trimmed_outside_the_docs() {
        assert_eq!(path_after("/api/v1/products/"), "/api/v1/products");
        assert_eq!(path_after("/api/v1/products/recent/?days=3"), "/api/v1/products/recent?days=3");
        assert_eq!(path_after("/"), "/");
        assert_eq!(path_after("/api/docs/"), "/api/docs/");
    }
}
