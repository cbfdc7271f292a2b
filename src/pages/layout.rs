// src/pages/layout.rs

use axum::response::Html;

use crate::pages::{session::Flash, PageContext};

const BOOTSTRAP_CSS: &str = "https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css";

/// Escapa texto para conteúdo e atributos HTML.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

fn nav_link(href: &str, label: &str) -> String {
    format!(r#"<li class="nav-item"><a class="nav-link" href="{href}">{}</a></li>"#, escape(label))
}

fn navbar(ctx: &PageContext) -> String {
    let mut left = String::new();
    left.push_str(&nav_link("/", &ctx.t("nav_home")));
    left.push_str(&nav_link("/products", &ctx.t("nav_products")));
    left.push_str(&nav_link("/about", &ctx.t("nav_about")));
    left.push_str(&nav_link("/api/docs", &ctx.t("nav_api_docs")));

    let right = match &ctx.user {
        Some(user) => format!(
            r#"{}<li class="nav-item"><form method="post" action="/logout" class="d-inline"><button type="submit" class="btn btn-link nav-link">{} ({})</button></form></li>"#,
            nav_link("/profile", &ctx.t("nav_profile")),
            escape(&ctx.t("nav_logout")),
            escape(&user.username),
        ),
        None => format!(
            "{}{}",
            nav_link("/login", &ctx.t("nav_login")),
            nav_link("/register", &ctx.t("nav_register"))
        ),
    };

    format!(
        r#"<nav class="navbar navbar-expand-lg navbar-dark bg-dark mb-4"><div class="container"><a class="navbar-brand" href="/">{}</a><ul class="navbar-nav me-auto">{left}</ul><ul class="navbar-nav">{right}</ul></div></nav>"#,
        escape(&ctx.t("page_home_title"))
    )
}

fn alert(flash: &Flash) -> String {
    format!(
        r#"<div class="alert alert-{} alert-dismissible" role="alert">{}</div>"#,
        flash.level.css(),
        escape(&flash.message)
    )
}

/// Página completa. `body` já deve vir escapado.
pub fn render(ctx: &PageContext, title: &str, body: &str) -> Html<String> {
    let flash = ctx.flash.as_ref().map(alert).unwrap_or_default();
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | {site}</title>
<link rel="stylesheet" href="{BOOTSTRAP_CSS}">
</head>
<body>
{nav}
<main class="container">
{flash}
<h1 class="mb-4">{title}</h1>
{body}
</main>
</body>
</html>"#,
        lang = ctx.lang,
        title = escape(title),
        site = escape(&ctx.t("page_home_title")),
        nav = navbar(ctx),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_and_quotes() {
        assert_eq!(
            escape(r#"<script>alert("x" & 'y')</script>"#),
            "&lt;script&gt;alert(&quot;x&quot; &amp; &#x27;y&#x27;)&lt;/script&gt;"
        );
    }
}
