// src/pages.rs

//! Páginas HTML renderizadas no servidor. A sessão é um cookie com o mesmo
//! JWT da API; validação e regras vêm dos mesmos serviços.

pub mod forms;
pub mod layout;
pub mod session;
pub mod sitemap;
pub mod views;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use crate::{
    common::{
        error::AppError,
        i18n::Params,
        validators::AVATAR_MAX_BYTES,
    },
    config::AppState,
    middleware::i18n::Locale,
    models::auth::User,
    pages::{layout::escape, session::Flash},
};

// folga para os demais campos do multipart
const AVATAR_UPLOAD_LIMIT: usize = AVATAR_MAX_BYTES + 64 * 1024;

/// Tudo que uma página precisa para renderizar: idioma, usuário e flash.
pub struct PageContext {
    pub app_state: AppState,
    pub lang: String,
    pub user: Option<User>,
    pub flash: Option<Flash>,
}

impl PageContext {
    pub fn new(app_state: &AppState, locale: &Locale, user: Option<User>, flash: Option<Flash>) -> Self {
        Self {
            lang: app_state.i18n_store.resolve(&locale.0).to_string(),
            app_state: app_state.clone(),
            user,
            flash,
        }
    }

    pub fn t(&self, key: &str) -> String {
        self.app_state.i18n_store.translate(&self.lang, key)
    }

    pub fn t_with(&self, key: &str, params: &Params) -> String {
        self.app_state.i18n_store.translate_with(&self.lang, key, params)
    }

    pub fn locale(&self) -> Locale {
        Locale(self.lang.clone())
    }

    pub fn page(&self, title_key: &str, body: &str) -> Response {
        layout::render(self, &self.t(title_key), body).into_response()
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(views::home))
        .route("/about", get(views::about))
        .route("/login", get(views::login_page).post(views::login_submit))
        .route("/register", get(views::register_page).post(views::register_submit))
        .route("/logout", get(views::logout).post(views::logout))
        .route("/profile", get(views::profile_page).post(views::profile_submit))
        .route(
            "/profile/avatar",
            post(views::avatar_upload).layer(DefaultBodyLimit::max(AVATAR_UPLOAD_LIMIT)),
        )
        .route("/products", get(views::products_page).post(views::product_submit))
        .route("/sitemap.xml", get(sitemap::sitemap))
}

pub fn not_found(app_state: &AppState, locale: &Locale) -> Response {
    let ctx = PageContext::new(app_state, locale, None, None);
    not_found_page(&ctx)
}

fn not_found_page(ctx: &PageContext) -> Response {
    let body = format!(
        r#"<p class="lead">{}</p><a class="btn btn-primary" href="/">{}</a>"#,
        escape(&ctx.t("page_not_found_body")),
        escape(&ctx.t("nav_home"))
    );
    (StatusCode::NOT_FOUND, ctx.page("page_not_found_title", &body)).into_response()
}

/// Falha de serviço fora de um formulário: 404 vira a página de não
/// encontrado, o resto vira a página de erro com o status do erro.
pub fn error_page(ctx: &PageContext, err: AppError) -> Response {
    let status = err.status();
    if status == StatusCode::NOT_FOUND {
        return not_found_page(ctx);
    }
    let api = err.to_api_error(&ctx.locale(), &ctx.app_state.i18n_store);
    let body = format!(r#"<p class="lead">{}</p>"#, escape(&api.error));
    (status, ctx.page("page_error_title", &body)).into_response()
}
