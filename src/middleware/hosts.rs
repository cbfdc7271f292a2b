// src/middleware/hosts.rs

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{common::error::AppError, config::AppState, middleware::i18n::Locale};

/// Compara o `Host` (sem porta) com ALLOWED_HOSTS. Aceita "*" e sufixos
/// com ponto inicial (".example.com" casa com o domínio e subdomínios).
pub fn host_allowed(host: Option<&str>, allowed: &[String]) -> bool {
    if allowed.iter().any(|pattern| pattern == "*") {
        return true;
    }
    let Some(host) = host.map(strip_port).map(str::to_ascii_lowercase) else {
        return false;
    };
    allowed.iter().any(|pattern| {
        let pattern = pattern.to_ascii_lowercase();
        match pattern.strip_prefix('.') {
            Some(domain) => host == domain || host.ends_with(&pattern),
            None => host == pattern,
        }
    })
}

fn strip_port(host: &str) -> &str {
    // IPv6 entre colchetes mantém os dois-pontos internos
    if let Some(end) = host.find(']') {
        return &host[..=end];
    }
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}

pub async fn allowed_hosts(State(app_state): State<AppState>, request: Request, next: Next) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    if !host_allowed(host.as_deref(), &app_state.settings.allowed_hosts) {
        let shown = host.unwrap_or_default();
        tracing::warn!(host = %shown, "Host não permitido");
        let locale = Locale::from_headers(request.headers());
        return AppError::InvalidHost(shown)
            .to_api_error(&locale, &app_state.i18n_store)
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(list: &[&str]) -> Vec<String> {
        list.iter().map(|h| h.to_string()).collect()
    }

    #[test]
    fn exact_hosts_ignore_port_and_case() {
        let allowed = hosts(&["localhost", "127.0.0.1"]);
        assert!(host_allowed(Some("localhost:8000"), &allowed));
        assert!(host_allowed(Some("LOCALHOST"), &allowed));
        assert!(host_allowed(Some("127.0.0.1"), &allowed));
        assert!(!host_allowed(Some("evil.com"), &allowed));
        assert!(!host_allowed(None, &allowed));
    }

    #[test]
    fn leading_dot_matches_subdomains() {
        let allowed = hosts(&[".example.com"]);
        assert!(host_allowed(Some("example.com"), &allowed));
        assert!(host_allowed(Some("api.example.com:443"), &allowed));
        assert!(!host_allowed(Some("badexample.com"), &allowed));
    }

    #[test]
    fn wildcard_accepts_anything() {
        assert!(host_allowed(None, &hosts(&["*"])));
        assert!(host_allowed(Some("whatever"), &hosts(&["*"])));
    }

    #[test]
    fn ipv6_hosts_keep_their_brackets() {
        assert!(host_allowed(Some("[::1]:8000"), &hosts(&["[::1]"])));
    }
}
