// src/pages/forms.rs

use serde_json::Value;
use std::collections::BTreeMap;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::error::{validation_details, AppError},
    pages::{layout::escape, PageContext},
};

// validator agrupa erros de struct (ex.: senhas diferentes) sob esta chave
const NON_FIELD: &str = "__all__";

/// Erros de um formulário já traduzidos: por campo e gerais.
#[derive(Debug, Default)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
    general: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.general.is_empty()
    }

    pub fn field(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn add_field(&mut self, name: &str, message: String) {
        self.fields.entry(name.to_string()).or_default().push(message);
    }

    pub fn add_general(&mut self, message: String) {
        self.general.push(message);
    }

    /// Mesmos `ValidationErrors` da API, renderizados por campo.
    pub fn from_validation(errors: &ValidationErrors, ctx: &PageContext) -> Self {
        let mut form = Self::new();
        form.merge_validation(errors, ctx);
        form
    }

    pub fn merge_validation(&mut self, errors: &ValidationErrors, ctx: &PageContext) {
        let details = validation_details(errors, &ctx.lang, &ctx.app_state.i18n_store);
        let Value::Object(map) = details else {
            return;
        };
        for (field, messages) in map {
            let messages = messages
                .as_array()
                .map(|list| list.iter().filter_map(Value::as_str).map(String::from).collect())
                .unwrap_or_else(Vec::new);
            if field == NON_FIELD {
                self.general.extend(messages);
            } else {
                self.fields.entry(field).or_default().extend(messages);
            }
        }
    }

    /// Traz os erros de `other` só para campos que ainda não têm erro.
    pub fn merge_missing(&mut self, other: FormErrors) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_insert(messages);
        }
        self.general.extend(other.general);
    }

    /// Erro de serviço: validação e conflito vão para o campo, o resto é geral.
    pub fn from_app_error(err: AppError, ctx: &PageContext) -> Self {
        let mut form = Self::new();
        match &err {
            AppError::ValidationError(errors) => form.merge_validation(errors, ctx),
            AppError::Conflict { field, key, params } => {
                let message = ctx.app_state.i18n_store.translate_with(&ctx.lang, key, params);
                form.add_field(field, message);
            }
            _ => {
                let api = err.to_api_error(&ctx.locale(), &ctx.app_state.i18n_store);
                form.add_general(api.error);
            }
        }
        form
    }

    /// Erro de regra de um campo (código de `validator`).
    pub fn add_code(&mut self, field: &str, error: &ValidationError, ctx: &PageContext) {
        let message = ctx
            .app_state
            .i18n_store
            .translate_with(&ctx.lang, &error.code, &error.params);
        self.add_field(field, message);
    }

    /// Bloco de alertas para o topo do formulário.
    pub fn summary(&self, ctx: &PageContext) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut html = format!(
            r#"<div class="alert alert-danger" role="alert"><p class="mb-0">{}</p>"#,
            escape(&ctx.t("flash_form_errors"))
        );
        for message in &self.general {
            html.push_str(&format!(r#"<p class="mb-0">{}</p>"#, escape(message)));
        }
        html.push_str("</div>");
        html
    }
}

fn feedback(errors: &[String]) -> String {
    errors
        .iter()
        .map(|message| format!(r#"<div class="invalid-feedback">{}</div>"#, escape(message)))
        .collect()
}

fn control_class(base: &str, errors: &[String]) -> String {
    if errors.is_empty() {
        base.to_string()
    } else {
        format!("{base} is-invalid")
    }
}

/// `<input>` com rótulo e feedback de erro no padrão Bootstrap.
pub fn input(name: &str, label: &str, kind: &str, value: &str, errors: &FormErrors) -> String {
    let field_errors = errors.field(name);
    format!(
        r#"<div class="mb-3"><label for="id_{name}" class="form-label">{label}</label><input type="{kind}" name="{name}" id="id_{name}" class="{class}" value="{value}">{feedback}</div>"#,
        label = escape(label),
        class = control_class("form-control", field_errors),
        value = escape(value),
        feedback = feedback(field_errors),
    )
}

pub fn textarea(name: &str, label: &str, value: &str, errors: &FormErrors) -> String {
    let field_errors = errors.field(name);
    format!(
        r#"<div class="mb-3"><label for="id_{name}" class="form-label">{label}</label><textarea name="{name}" id="id_{name}" rows="4" class="{class}">{value}</textarea>{feedback}</div>"#,
        label = escape(label),
        class = control_class("form-control", field_errors),
        value = escape(value),
        feedback = feedback(field_errors),
    )
}

pub fn checkbox(name: &str, label: &str, checked: bool) -> String {
    format!(
        r#"<div class="mb-3 form-check"><input type="checkbox" name="{name}" id="id_{name}" class="form-check-input" value="on"{checked}><label for="id_{name}" class="form-check-label">{label}</label></div>"#,
        label = escape(label),
        checked = if checked { " checked" } else { "" },
    )
}

pub fn file(name: &str, label: &str, accept: &str, errors: &FormErrors) -> String {
    let field_errors = errors.field(name);
    format!(
        r#"<div class="mb-3"><label for="id_{name}" class="form-label">{label}</label><input type="file" name="{name}" id="id_{name}" accept="{accept}" class="{class}">{feedback}</div>"#,
        label = escape(label),
        class = control_class("form-control", field_errors),
        feedback = feedback(field_errors),
    )
}

pub fn submit(label: &str) -> String {
    format!(r#"<button type="submit" class="btn btn-primary">{}</button>"#, escape(label))
}

/// Checkbox HTML: presente e não vazio é marcado.
pub fn is_checked(raw: Option<&str>) -> bool {
    matches!(raw.map(str::trim), Some(v) if !v.is_empty() && v != "off" && v != "false")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_field_gets_bootstrap_feedback() {
        let mut errors = FormErrors::new();
        errors.add_field("email", "Enter a valid email address.".into());

        let html = input("email", "E-mail", "email", "x<y", &errors);
        assert!(html.contains(r#"class="form-control is-invalid""#));
        assert!(html.contains(r#"<div class="invalid-feedback">Enter a valid email address.</div>"#));
        assert!(html.contains(r#"value="x&lt;y""#));

        let clean = input("username", "Username", "text", "", &errors);
        assert!(clean.contains(r#"class="form-control""#));
        assert!(!clean.contains("invalid-feedback"));
    }

    #[test]
    fn checkbox_values() {
        assert!(is_checked(Some("on")));
        assert!(!is_checked(Some("")));
        assert!(!is_checked(None));
    }
}
