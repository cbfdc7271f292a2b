// src/middleware/throttle.rs

use axum::{
    extract::{ConnectInfo, OriginalUri, Request, State},
    http::{header, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::resolve_user, i18n::Locale},
    services::rate_limiter::{Decision, ThrottleScope},
};

/// Prefixo das escritas sujeitas ao limite curto (burst).
const BURST_PREFIX: &str = "/api/v1/products";

/// IP do cliente: primeiro salto de X-Forwarded-For, senão o endereço do peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(String::from)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn is_burst_write(method: &Method, path: &str) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
        && path.starts_with(BURST_PREFIX)
}

pub async fn throttle(State(app_state): State<AppState>, mut request: Request, next: Next) -> Response {
    // Token inválido não é problema daqui: o extrator do handler responde 401.
    let user = resolve_user(&app_state, request.headers()).await.ok().flatten();

    let (scope, ident) = match &user {
        Some(user) => (ThrottleScope::User, user.id.to_string()),
        None => {
            let peer = request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr);
            (ThrottleScope::Anon, client_ip(request.headers(), peer))
        }
    };

    // dentro de um `nest` a URI chega sem o prefixo
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let mut decision = app_state.rate_limiter.check(scope, &ident).await;
    if decision == Decision::Allowed && is_burst_write(request.method(), &path) {
        decision = app_state.rate_limiter.check(ThrottleScope::Burst, &ident).await;
    }

    if let Decision::Throttled { retry_after } = decision {
        let locale = Locale::from_headers(request.headers());
        let mut response = AppError::Throttled { retry_after }
            .to_api_error(&locale, &app_state.i18n_store)
            .into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        return response;
    }

    if let Some(user) = user {
        request.extensions_mut().insert(user);
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_for_wins_over_peer() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "10.0.0.9:5000".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(peer)), "10.0.0.9");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers, Some(peer)), "203.0.113.7");
        assert_eq!(client_ip(&HeaderMap::new(), None), "unknown");
    }

    #[test]
    fn only_product_writes_count_as_burst() {
        assert!(is_burst_write(&Method::POST, "/api/v1/products"));
        assert!(is_burst_write(&Method::PATCH, "/api/v1/products/abc"));
        assert!(!is_burst_write(&Method::GET, "/api/v1/products"));
        assert!(!is_burst_write(&Method::POST, "/api/v1/categories"));
    }
}
