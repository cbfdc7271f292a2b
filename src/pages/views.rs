// src/pages/views.rs

use axum::{
    extract::{Multipart, Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::{
        i18n::params,
        validators::AVATAR_MAX_BYTES,
    },
    config::AppState,
    middleware::{auth::OptionalUser, i18n::Locale},
    models::{
        auth::{RegisterUserPayload, UpdateAccountPayload, User},
        category::{CategoryNode, CategoryQuery},
        product::{CreateProductPayload, ProductListItem, ProductQuery},
        profile::{ProfileDetail, UpdateProfilePayload},
        tag::TagQuery,
    },
    pages::{
        error_page,
        forms::{self, FormErrors},
        layout::escape,
        session::{self, FlashLevel},
        PageContext,
    },
};

const HOME_RECENT: usize = 5;

fn context(app_state: &AppState, locale: &Locale, user: Option<User>, jar: CookieJar) -> (CookieJar, PageContext) {
    let (jar, flash) = session::take_flash(jar);
    (jar, PageContext::new(app_state, locale, user, flash))
}

fn product_rows(products: &[ProductListItem]) -> String {
    products
        .iter()
        .map(|p| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&p.name),
                escape(&p.formatted_price),
                p.stock,
                p.created_at.format("%Y-%m-%d")
            )
        })
        .collect()
}

fn product_table(ctx: &PageContext, products: &[ProductListItem]) -> String {
    if products.is_empty() {
        return format!(r#"<p class="text-muted">{}</p>"#, escape(&ctx.t("page_products_empty")));
    }
    format!(
        r#"<table class="table table-striped"><thead><tr><th>{}</th><th>{}</th><th>{}</th><th></th></tr></thead><tbody>{}</tbody></table>"#,
        escape(&ctx.t("label_name")),
        escape(&ctx.t("label_price")),
        escape(&ctx.t("label_stock")),
        product_rows(products)
    )
}

// ---- Início e sobre ----

pub async fn home(
    State(app_state): State<AppState>,
    locale: Locale,
    OptionalUser(user): OptionalUser,
    jar: CookieJar,
) -> Response {
    let (jar, ctx) = context(&app_state, &locale, user, jar);

    let recent_query = ProductQuery {
        active_only: Some("true".into()),
        ordering: Some("-created_at".into()),
        ..Default::default()
    };
    let recent = match app_state.product_service.list(&recent_query).await {
        Ok(page) => page.results.into_iter().take(HOME_RECENT).collect::<Vec<_>>(),
        Err(e) => return error_page(&ctx, e),
    };

    let active_categories = CategoryQuery {
        is_deleted: Some("false".into()),
        ..Default::default()
    };
    let counts = async {
        let products = app_state.product_service.statistics().await?.active;
        let categories = app_state.category_service.list(&active_categories).await?.count;
        let tags = app_state.tag_service.list(&TagQuery::default()).await?.count;
        Ok::<_, crate::common::error::AppError>((products, categories, tags))
    };
    let (products, categories, tags) = match counts.await {
        Ok(counts) => counts,
        Err(e) => return error_page(&ctx, e),
    };

    let stat = |key: &str, value: i64| {
        format!(
            r#"<div class="col"><div class="card text-center"><div class="card-body"><h2>{value}</h2><p class="mb-0">{}</p></div></div></div>"#,
            escape(&ctx.t(key))
        )
    };
    let body = format!(
        r#"<p class="lead">{}</p><div class="row mb-4">{}{}{}</div>{}"#,
        escape(&ctx.t("page_home_intro")),
        stat("page_stats_products", products),
        stat("page_stats_categories", categories),
        stat("page_stats_tags", tags),
        product_table(&ctx, &recent)
    );
    (jar, ctx.page("page_home_title", &body)).into_response()
}

pub async fn about(
    State(app_state): State<AppState>,
    locale: Locale,
    OptionalUser(user): OptionalUser,
    jar: CookieJar,
) -> Response {
    let (jar, ctx) = context(&app_state, &locale, user, jar);
    let body = format!(
        r#"<p>{}</p><p><a href="/api/docs">{}</a></p>"#,
        escape(&ctx.t("page_about_body")),
        escape(&ctx.t("nav_api_docs"))
    );
    (jar, ctx.page("page_about_title", &body)).into_response()
}

// ---- Login, cadastro e logout ----

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
    pub remember_me: Option<String>,
    pub next: Option<String>,
}

fn login_form(ctx: &PageContext, form: &LoginForm, errors: &FormErrors) -> String {
    let next = form
        .next
        .as_deref()
        .map(|next| format!(r#"<input type="hidden" name="next" value="{}">"#, escape(next)))
        .unwrap_or_default();
    format!(
        r#"{summary}<form method="post" action="/login" novalidate>{next}{login}{password}{remember}{submit}</form><p class="mt-3"><a href="/register">{register}</a></p>"#,
        summary = errors.summary(ctx),
        login = forms::input("login", &ctx.t("label_login"), "text", &form.login, errors),
        password = forms::input("password", &ctx.t("label_password"), "password", "", errors),
        remember = forms::checkbox(
            "remember_me",
            &ctx.t("label_remember_me"),
            forms::is_checked(form.remember_me.as_deref())
        ),
        submit = forms::submit(&ctx.t("button_login")),
        register = escape(&ctx.t("nav_register")),
    )
}

/// Abre a sessão e redireciona com a mensagem de boas-vindas.
fn sign_in(
    ctx: &PageContext,
    jar: CookieJar,
    username: &str,
    token: String,
    remember: bool,
    flash_key: &str,
    target: &str,
) -> Response {
    let jar = session::start(jar, token, remember, ctx.app_state.settings.secure_cookies());
    let message = ctx.t_with(flash_key, &params([("username", json!(username))]));
    let jar = session::flash(jar, FlashLevel::Success, message);
    (jar, Redirect::to(target)).into_response()
}

pub async fn login_page(
    State(app_state): State<AppState>,
    locale: Locale,
    OptionalUser(user): OptionalUser,
    jar: CookieJar,
    Query(query): Query<NextQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to(&session::safe_next(query.next.as_deref())).into_response();
    }
    let (jar, mut ctx) = context(&app_state, &locale, None, jar);
    if ctx.flash.is_none() && query.next.is_some() {
        ctx.flash = Some(session::Flash {
            level: FlashLevel::Info,
            message: ctx.t("page_login_prompt"),
        });
    }
    let form = LoginForm {
        next: query.next,
        ..Default::default()
    };
    (jar, ctx.page("page_login_title", &login_form(&ctx, &form, &FormErrors::new()))).into_response()
}

pub async fn login_submit(
    State(app_state): State<AppState>,
    locale: Locale,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let ctx = PageContext::new(&app_state, &locale, None, None);

    let mut errors = FormErrors::new();
    if form.login.trim().is_empty() {
        errors.add_field("login", ctx.t("required"));
    }
    if form.password.is_empty() {
        errors.add_field("password", ctx.t("required"));
    }

    if errors.is_empty() {
        let signed_in = async {
            let user = app_state.auth_service.authenticate(form.login.trim(), &form.password).await?;
            let token = app_state.auth_service.create_token(user.id)?;
            Ok::<_, crate::common::error::AppError>((user, token))
        };
        match signed_in.await {
            Ok((user, token)) => {
                tracing::info!(user_id = %user.id, "Login pelas páginas");
                let target = session::safe_next(form.next.as_deref());
                let remember = forms::is_checked(form.remember_me.as_deref());
                return sign_in(&ctx, jar, &user.username, token, remember, "flash_logged_in", &target);
            }
            Err(e) => errors = FormErrors::from_app_error(e, &ctx),
        }
    }

    ctx.page("page_login_title", &login_form(&ctx, &form, &errors))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&RegisterForm> for RegisterUserPayload {
    fn from(form: &RegisterForm) -> Self {
        Self {
            username: form.username.trim().to_string(),
            email: form.email.trim().to_string(),
            password: form.password.clone(),
            password_confirm: form.password_confirm.clone(),
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
        }
    }
}

fn register_form(ctx: &PageContext, form: &RegisterForm, errors: &FormErrors) -> String {
    format!(
        r#"{summary}<form method="post" action="/register" novalidate>{username}{email}{first_name}{last_name}{password}{password_confirm}{submit}</form><p class="mt-3"><a href="/login">{login}</a></p>"#,
        summary = errors.summary(ctx),
        username = forms::input("username", &ctx.t("label_username"), "text", &form.username, errors),
        email = forms::input("email", &ctx.t("label_email"), "email", &form.email, errors),
        first_name = forms::input("first_name", &ctx.t("label_first_name"), "text", &form.first_name, errors),
        last_name = forms::input("last_name", &ctx.t("label_last_name"), "text", &form.last_name, errors),
        password = forms::input("password", &ctx.t("label_password"), "password", "", errors),
        password_confirm = forms::input(
            "password_confirm",
            &ctx.t("label_password_confirm"),
            "password",
            "",
            errors
        ),
        submit = forms::submit(&ctx.t("button_register")),
        login = escape(&ctx.t("nav_login")),
    )
}

pub async fn register_page(
    State(app_state): State<AppState>,
    locale: Locale,
    OptionalUser(user): OptionalUser,
    jar: CookieJar,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    let (jar, ctx) = context(&app_state, &locale, None, jar);
    let body = register_form(&ctx, &RegisterForm::default(), &FormErrors::new());
    (jar, ctx.page("page_register_title", &body)).into_response()
}

pub async fn register_submit(
    State(app_state): State<AppState>,
    locale: Locale,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Response {
    let ctx = PageContext::new(&app_state, &locale, None, None);
    let payload = RegisterUserPayload::from(&form);

    let errors = match payload.validate() {
        Err(e) => FormErrors::from_validation(&e, &ctx),
        Ok(()) => match app_state.auth_service.register(&payload).await {
            Ok(response) => {
                let username = response.user.username;
                return sign_in(&ctx, jar, &username, response.token, false, "flash_registered", "/");
            }
            Err(e) => FormErrors::from_app_error(e, &ctx),
        },
    };

    ctx.page("page_register_title", &register_form(&ctx, &form, &errors))
}

pub async fn logout(State(app_state): State<AppState>, locale: Locale, jar: CookieJar) -> Response {
    let ctx = PageContext::new(&app_state, &locale, None, None);
    let jar = session::end(jar);
    let jar = session::flash(jar, FlashLevel::Info, ctx.t("flash_logged_out"));
    (jar, Redirect::to("/")).into_response()
}

// ---- Perfil ----

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub bio: String,
    pub phone: String,
    pub birth_date: String,
    pub city: String,
    pub country: String,
    pub website: String,
}

impl From<&ProfileDetail> for ProfileForm {
    fn from(detail: &ProfileDetail) -> Self {
        let profile = &detail.profile;
        Self {
            first_name: detail.first_name.clone(),
            last_name: detail.last_name.clone(),
            email: detail.email.clone(),
            bio: profile.bio.clone(),
            phone: profile.phone.clone(),
            birth_date: profile.birth_date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            city: profile.city.clone(),
            country: profile.country.clone(),
            website: profile.website.clone(),
        }
    }
}

impl ProfileForm {
    /// Converte em payloads de conta e de perfil; erros de formato de data
    /// entram junto com os de validação.
    fn into_payloads(self, ctx: &PageContext) -> (UpdateAccountPayload, UpdateProfilePayload, FormErrors) {
        let mut errors = FormErrors::new();

        let account = UpdateAccountPayload {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
        };
        if let Err(e) = account.validate() {
            errors.merge_validation(&e, ctx);
        }

        let birth_date = match self.birth_date.trim() {
            "" => None,
            raw => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.add_field("birth_date", ctx.t("date_invalid"));
                    None
                }
            },
        };

        let profile = UpdateProfilePayload {
            bio: Some(self.bio),
            phone: Some(self.phone),
            birth_date,
            city: Some(self.city),
            country: Some(self.country),
            website: Some(self.website),
            is_verified: None,
        };
        if let Err(e) = profile.validate() {
            errors.merge_validation(&e, ctx);
        }

        (account, profile, errors)
    }
}

fn profile_body(
    ctx: &PageContext,
    detail: &ProfileDetail,
    form: &ProfileForm,
    errors: &FormErrors,
    avatar_errors: &FormErrors,
) -> String {
    let avatar = detail
        .profile
        .avatar_url()
        .map(|url| {
            format!(
                r#"<img src="{}" alt="avatar" class="rounded-circle mb-3" width="120" height="120">"#,
                escape(&url)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<div class="row">
<div class="col-md-4">{avatar}
<form method="post" action="/profile/avatar" enctype="multipart/form-data">{avatar_summary}{avatar_input}{upload}</form>
</div>
<div class="col-md-8">{summary}
<form method="post" action="/profile" novalidate>
<h2 class="h4">{account}</h2>{first_name}{last_name}{email}
<h2 class="h4">{profile}</h2>{bio}{phone}{birth_date}{city}{country}{website}{save}
</form>
</div>
</div>"#,
        avatar_summary = avatar_errors.summary(ctx),
        avatar_input = forms::file("avatar", &ctx.t("label_avatar"), "image/*", avatar_errors),
        upload = forms::submit(&ctx.t("button_upload")),
        summary = errors.summary(ctx),
        account = escape(&ctx.t("page_account_section")),
        first_name = forms::input("first_name", &ctx.t("label_first_name"), "text", &form.first_name, errors),
        last_name = forms::input("last_name", &ctx.t("label_last_name"), "text", &form.last_name, errors),
        email = forms::input("email", &ctx.t("label_email"), "email", &form.email, errors),
        profile = escape(&ctx.t("page_profile_section")),
        bio = forms::textarea("bio", &ctx.t("label_bio"), &form.bio, errors),
        phone = forms::input("phone", &ctx.t("label_phone"), "tel", &form.phone, errors),
        birth_date = forms::input("birth_date", &ctx.t("label_birth_date"), "date", &form.birth_date, errors),
        city = forms::input("city", &ctx.t("label_city"), "text", &form.city, errors),
        country = forms::input("country", &ctx.t("label_country"), "text", &form.country, errors),
        website = forms::input("website", &ctx.t("label_website"), "url", &form.website, errors),
        save = forms::submit(&ctx.t("button_save")),
    )
}

pub async fn profile_page(
    State(app_state): State<AppState>,
    locale: Locale,
    OptionalUser(user): OptionalUser,
    jar: CookieJar,
) -> Response {
    let Some(user) = user else {
        return session::login_redirect("/profile").into_response();
    };
    let detail = app_state.profile_service.for_user(&user).await;
    let (jar, ctx) = context(&app_state, &locale, Some(user), jar);
    let detail = match detail {
        Ok(detail) => detail,
        Err(e) => return error_page(&ctx, e),
    };
    let none = FormErrors::new();
    let body = profile_body(&ctx, &detail, &ProfileForm::from(&detail), &none, &none);
    (jar, ctx.page("page_profile_title", &body)).into_response()
}

pub async fn profile_submit(
    State(app_state): State<AppState>,
    locale: Locale,
    OptionalUser(user): OptionalUser,
    jar: CookieJar,
    Form(form): Form<ProfileForm>,
) -> Response {
    let Some(user) = user else {
        return session::login_redirect("/profile").into_response();
    };
    let ctx = PageContext::new(&app_state, &locale, Some(user.clone()), None);

    let (account, profile, mut errors) = form.clone().into_payloads(&ctx);

    if errors.is_empty() {
        let saved = async {
            let user = app_state.auth_service.update_account(&user, &account).await?;
            app_state.profile_service.update_own(&user, &profile).await
        };
        match saved.await {
            Ok(_) => {
                let jar = session::flash(jar, FlashLevel::Success, ctx.t("flash_profile_updated"));
                return (jar, Redirect::to("/profile")).into_response();
            }
            Err(e) => errors = FormErrors::from_app_error(e, &ctx),
        }
    }

    let detail = match app_state.profile_service.for_user(&user).await {
        Ok(detail) => detail,
        Err(e) => return error_page(&ctx, e),
    };
    let body = profile_body(&ctx, &detail, &form, &errors, &FormErrors::new());
    ctx.page("page_profile_title", &body)
}

fn upload_too_large() -> ValidationError {
    let mut err = ValidationError::new("image_too_large");
    err.add_param("max_mb".into(), &(AVATAR_MAX_BYTES / (1024 * 1024)));
    err
}

pub async fn avatar_upload(
    State(app_state): State<AppState>,
    locale: Locale,
    OptionalUser(user): OptionalUser,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let Some(user) = user else {
        return session::login_redirect("/profile").into_response();
    };
    let ctx = PageContext::new(&app_state, &locale, Some(user.clone()), None);
    let mut errors = FormErrors::new();

    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("avatar") => match field.bytes().await {
                Ok(bytes) => upload = Some(bytes),
                Err(e) => {
                    tracing::warn!("Upload de avatar rejeitado: {}", e);
                    errors.add_code("avatar", &upload_too_large(), &ctx);
                    break;
                }
            },
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Multipart inválido no upload de avatar: {}", e);
                errors.add_code("avatar", &upload_too_large(), &ctx);
                break;
            }
        }
    }

    if errors.is_empty() {
        match upload.filter(|bytes| !bytes.is_empty()) {
            Some(bytes) => match app_state.profile_service.set_avatar(&user, &bytes).await {
                Ok(_) => {
                    let jar = session::flash(jar, FlashLevel::Success, ctx.t("flash_avatar_updated"));
                    return (jar, Redirect::to("/profile")).into_response();
                }
                Err(e) => errors = FormErrors::from_app_error(e, &ctx),
            },
            None => errors.add_field("avatar", ctx.t("form_file_required")),
        }
    }

    let detail = match app_state.profile_service.for_user(&user).await {
        Ok(detail) => detail,
        Err(e) => return error_page(&ctx, e),
    };
    let body = profile_body(&ctx, &detail, &ProfileForm::from(&detail), &FormErrors::new(), &errors);
    ctx.page("page_profile_title", &body)
}

// ---- Produtos ----

#[derive(Debug, Default, Deserialize)]
pub struct ProductsPageQuery {
    pub page: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub name: String,
    pub price: String,
    pub stock: String,
    pub category_id: String,
}

impl ProductForm {
    fn into_payload(&self, ctx: &PageContext) -> Result<CreateProductPayload, FormErrors> {
        let mut errors = FormErrors::new();

        let price = match self.price.trim() {
            "" => {
                errors.add_field("price", ctx.t("required"));
                Decimal::ZERO
            }
            raw => Decimal::from_str(raw).unwrap_or_else(|_| {
                errors.add_field("price", ctx.t("number_invalid"));
                Decimal::ZERO
            }),
        };
        let stock = match self.stock.trim() {
            "" => 0,
            raw => raw.parse::<i32>().unwrap_or_else(|_| {
                errors.add_field("stock", ctx.t("number_invalid"));
                0
            }),
        };
        let category_id = match self.category_id.trim() {
            "" => None,
            raw => match Uuid::parse_str(raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add_field("category_id", ctx.t("category_missing"));
                    None
                }
            },
        };

        let payload = CreateProductPayload {
            name: self.name.trim().to_string(),
            price,
            stock,
            category_id,
            tag_ids: Vec::new(),
        };
        if let Err(e) = payload.validate() {
            // campo com erro de leitura mantém só a própria mensagem
            errors.merge_missing(FormErrors::from_validation(&e, ctx));
        }
        if errors.is_empty() {
            Ok(payload)
        } else {
            Err(errors)
        }
    }
}

fn flatten_categories(nodes: &[CategoryNode], depth: usize, out: &mut Vec<(Uuid, String)>) {
    for node in nodes {
        out.push((node.id, format!("{}{}", "\u{a0}\u{a0}".repeat(depth), node.name)));
        flatten_categories(&node.children, depth + 1, out);
    }
}

fn product_form(ctx: &PageContext, form: &ProductForm, categories: &[(Uuid, String)], errors: &FormErrors) -> String {
    let category_errors = errors.field("category_id");
    let options: String = categories
        .iter()
        .map(|(id, name)| {
            let selected = if form.category_id == id.to_string() { " selected" } else { "" };
            format!(r#"<option value="{id}"{selected}>{}</option>"#, escape(name))
        })
        .collect();
    let select = format!(
        r#"<div class="mb-3"><label for="id_category_id" class="form-label">{label}</label><select name="category_id" id="id_category_id" class="form-select{invalid}"><option value="">---------</option>{options}</select>{feedback}</div>"#,
        label = escape(&ctx.t("label_category")),
        invalid = if category_errors.is_empty() { "" } else { " is-invalid" },
        feedback = category_errors
            .iter()
            .map(|m| format!(r#"<div class="invalid-feedback">{}</div>"#, escape(m)))
            .collect::<String>(),
    );

    format!(
        r#"<h2 class="h4 mt-4">{title}</h2>{summary}<form method="post" action="/products" novalidate>{name}{price}{stock}{select}{submit}</form>"#,
        title = escape(&ctx.t("page_products_new")),
        summary = errors.summary(ctx),
        name = forms::input("name", &ctx.t("label_name"), "text", &form.name, errors),
        price = forms::input("price", &ctx.t("label_price"), "text", &form.price, errors),
        stock = forms::input("stock", &ctx.t("label_stock"), "number", &form.stock, errors),
        submit = forms::submit(&ctx.t("button_create")),
    )
}

fn pager(query: &ProductsPageQuery, previous: Option<i64>, next: Option<i64>) -> String {
    let search = query
        .search
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            let encoded: String = s
                .bytes()
                .map(|b| match b {
                    b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => (b as char).to_string(),
                    other => format!("%{other:02X}"),
                })
                .collect();
            format!("&search={encoded}")
        })
        .unwrap_or_default();
    let link = |page: Option<i64>, label: &str| match page {
        Some(page) => format!(r#"<li class="page-item"><a class="page-link" href="/products?page={page}{search}">{label}</a></li>"#),
        None => format!(r#"<li class="page-item disabled"><span class="page-link">{label}</span></li>"#),
    };
    format!(
        r#"<nav><ul class="pagination">{}{}</ul></nav>"#,
        link(previous, "&laquo;"),
        link(next, "&raquo;")
    )
}

async fn render_products(
    ctx: &PageContext,
    query: &ProductsPageQuery,
    form: &ProductForm,
    errors: &FormErrors,
) -> Response {
    let app_state = &ctx.app_state;
    let list_query = ProductQuery {
        active_only: Some("true".into()),
        search: query.search.clone(),
        page: query.page.as_deref().and_then(|p| p.trim().parse().ok()),
        ..Default::default()
    };
    let page = match app_state.product_service.list(&list_query).await {
        Ok(page) => page,
        Err(e) => return error_page(ctx, e),
    };

    let mut body = format!(
        r#"<form method="get" action="/products" class="mb-3"><input type="search" name="search" class="form-control" value="{}"></form>{}{}"#,
        escape(query.search.as_deref().unwrap_or_default()),
        product_table(ctx, &page.results),
        pager(query, page.previous, page.next)
    );

    if ctx.user.is_some() {
        let mut categories = Vec::new();
        match app_state.category_service.tree().await {
            Ok(tree) => flatten_categories(&tree, 0, &mut categories),
            Err(e) => return error_page(ctx, e),
        }
        body.push_str(&product_form(ctx, form, &categories, errors));
    }

    ctx.page("page_products_title", &body)
}

pub async fn products_page(
    State(app_state): State<AppState>,
    locale: Locale,
    OptionalUser(user): OptionalUser,
    jar: CookieJar,
    Query(query): Query<ProductsPageQuery>,
) -> Response {
    let (jar, ctx) = context(&app_state, &locale, user, jar);
    let page = render_products(&ctx, &query, &ProductForm::default(), &FormErrors::new()).await;
    (jar, page).into_response()
}

pub async fn product_submit(
    State(app_state): State<AppState>,
    locale: Locale,
    OptionalUser(user): OptionalUser,
    jar: CookieJar,
    Form(form): Form<ProductForm>,
) -> Response {
    let Some(user) = user else {
        return session::login_redirect("/products").into_response();
    };
    let ctx = PageContext::new(&app_state, &locale, Some(user.clone()), None);

    let errors = match form.into_payload(&ctx) {
        Ok(payload) => match app_state.product_service.create(payload, Some(user.id)).await {
            Ok(product) => {
                tracing::info!(product_id = %product.product.id, "Produto criado pelas páginas");
                let jar = session::flash(jar, FlashLevel::Success, ctx.t("flash_product_created"));
                return (jar, Redirect::to("/products")).into_response();
            }
            Err(e) => FormErrors::from_app_error(e, &ctx),
        },
        Err(errors) => errors,
    };

    render_products(&ctx, &ProductsPageQuery::default(), &form, &errors).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_indented_by_depth() {
        let leaf = CategoryNode {
            id: Uuid::new_v4(),
            name: "Laptops".into(),
            slug: "laptops".into(),
            description: String::new(),
            products_count: 0,
            children: vec![],
        };
        let root = CategoryNode {
            id: Uuid::new_v4(),
            name: "Electronics".into(),
            slug: "electronics".into(),
            description: String::new(),
            products_count: 1,
            children: vec![leaf],
        };
        let mut out = Vec::new();
        flatten_categories(&[root], 0, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].1, "Electronics");
        assert_eq!(out[1].1, "\u{a0}\u{a0}Laptops");
    }

    #[test]
    fn pager_keeps_the_search_term() {
        let query = ProductsPageQuery {
            page: Some("2".into()),
            search: Some("red shoes".into()),
        };
        let html = pager(&query, Some(1), None);
        assert!(html.contains("/products?page=1&search=red%20shoes"));
        assert!(html.contains("page-item disabled"));
    }
}
