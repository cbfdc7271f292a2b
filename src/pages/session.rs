// src/pages/session.rs

use axum::response::Redirect;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{middleware::auth::SESSION_COOKIE, services::auth::TOKEN_TTL_DAYS};

pub const FLASH_COOKIE: &str = "catalog_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Success,
    Info,
    Danger,
}

impl FlashLevel {
    /// Classe Bootstrap do alerta.
    pub fn css(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Info => "info",
            FlashLevel::Danger => "danger",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "success" => Some(FlashLevel::Success),
            "info" => Some(FlashLevel::Info),
            "danger" => Some(FlashLevel::Danger),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

/// Grava o JWT no cookie de sessão. Sem "lembrar de mim" o cookie morre
/// com o navegador; o token em si vale sempre 7 dias.
pub fn start(jar: CookieJar, token: String, remember: bool, secure: bool) -> CookieJar {
    let mut cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure);
    if remember {
        cookie = cookie.max_age(time::Duration::days(TOKEN_TTL_DAYS));
    }
    jar.add(cookie)
}

pub fn end(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

pub fn flash(jar: CookieJar, level: FlashLevel, message: String) -> CookieJar {
    let cookie = Cookie::build((FLASH_COOKIE, format!("{}|{}", level.css(), message)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    jar.add(cookie)
}

/// Lê e consome a mensagem pendente.
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(raw) = jar.get(FLASH_COOKIE).map(|c| c.value().to_string()) else {
        return (jar, None);
    };
    let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
    let flash = raw.split_once('|').and_then(|(level, message)| {
        FlashLevel::parse(level).map(|level| Flash {
            level,
            message: message.to_string(),
        })
    });
    (jar, flash)
}

/// Destino pós-login. Só caminhos locais; o resto vira "/".
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Página protegida sem sessão: `/login?next=<caminho>`.
pub fn login_redirect(path: &str) -> Redirect {
    let next: String = path
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'/' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            other => format!("%{other:02X}"),
        })
        .collect();
    Redirect::to(&format!("/login?next={next}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_only_accepts_local_paths() {
        assert_eq!(safe_next(Some("/profile")), "/profile");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn flash_is_read_once() {
        let jar = flash(CookieJar::new(), FlashLevel::Success, "Olá | mundo".into());
        let (jar, message) = take_flash(jar);
        let message = message.unwrap();
        assert_eq!(message.level, FlashLevel::Success);
        assert_eq!(message.message, "Olá | mundo");
        assert!(take_flash(jar).1.is_none());
    }

    #[test]
    fn remember_me_makes_the_cookie_persistent() {
        let short = start(CookieJar::new(), "t".into(), false, false);
        let long = start(CookieJar::new(), "t".into(), true, true);
        assert!(short.get(SESSION_COOKIE).unwrap().max_age().is_none());
        let cookie = long.get(SESSION_COOKIE).unwrap();
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn login_redirect_encodes_the_path() {
        let response = axum::response::IntoResponse::into_response(login_redirect("/profile/avatar"));
        let location = response.headers()["location"].to_str().unwrap();
        assert_eq!(location, "/login?next=/profile/avatar");
    }
}
