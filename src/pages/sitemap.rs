// src/pages/sitemap.rs

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{config::AppState, middleware::i18n::Locale, pages::layout::escape};

const STATIC_PAGES: &[&str] = &["/", "/about", "/products", "/login", "/register"];

fn base_url(headers: &HeaderMap, secure: bool) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    let scheme = if secure { "https" } else { "http" };
    format!("{scheme}://{host}")
}

fn url(loc: &str, lastmod: Option<DateTime<Utc>>, changefreq: &str, priority: &str) -> String {
    let lastmod = lastmod
        .map(|at| format!("<lastmod>{}</lastmod>", at.format("%Y-%m-%d")))
        .unwrap_or_default();
    format!(
        "<url><loc>{}</loc>{lastmod}<changefreq>{changefreq}</changefreq><priority>{priority}</priority></url>",
        escape(loc)
    )
}

/// Páginas públicas e produtos ativos (`updated_at` como lastmod).
pub fn render(base: &str, products: &[(Uuid, DateTime<Utc>)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#,
    );
    for path in STATIC_PAGES {
        xml.push_str(&url(&format!("{base}{path}"), None, "daily", "0.8"));
    }
    for (id, updated_at) in products {
        xml.push_str(&url(
            &format!("{base}/api/v1/products/{id}"),
            Some(*updated_at),
            "weekly",
            "0.7",
        ));
    }
    xml.push_str("</urlset>");
    xml
}

pub async fn sitemap(State(app_state): State<AppState>, locale: Locale, headers: HeaderMap) -> Response {
    let products = match app_state.product_service.sitemap_entries().await {
        Ok(products) => products,
        Err(e) => {
            tracing::error!("Falha ao montar o sitemap: {}", e);
            return e.to_api_error(&locale, &app_state.i18n_store).into_response();
        }
    };

    let base = base_url(&headers, app_state.settings.is_production());
    (
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        render(&base, &products),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn lists_static_pages_then_active_products() {
        let id = Uuid::new_v4();
        let updated_at = Utc.with_ymd_and_hms(2024, 3, 9, 15, 30, 0).unwrap();

        let xml = render("https://catalog.example.com", &[(id, updated_at)]);

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains("<loc>https://catalog.example.com/about</loc>"));
        assert!(xml.contains(&format!(
            "<url><loc>https://catalog.example.com/api/v1/products/{id}</loc><lastmod>2024-03-09</lastmod><changefreq>weekly</changefreq><priority>0.7</priority></url>"
        )));
        assert_eq!(xml.matches("<url>").count(), STATIC_PAGES.len() + 1);
        assert!(xml.ends_with("</urlset>"));
    }

    #[test]
    fn base_url_follows_host_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "shop.example.com:8000".parse().unwrap());
        assert_eq!(base_url(&headers, false), "http://shop.example.com:8000");
        assert_eq!(base_url(&HeaderMap::new(), true), "https://localhost");
    }
}
