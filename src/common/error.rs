// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::{
    common::i18n::{params, I18nStore, Params},
    middleware::i18n::Locale,
    tasks::queue::QueueError,
};

// Nosso tipo de erro, agora com `thiserror` para melhor ergonomia.
// A mensagem final ao cliente sai de `to_api_error`, já traduzida.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] ValidationErrors),

    // Erro de regra de negócio (400) com chave de tradução.
    #[error("Requisição inválida: {key}")]
    BadRequest { key: &'static str, params: Params },

    #[error("Corpo da requisição inválido: {0}")]
    InvalidBody(String),

    #[error("Parâmetros de consulta inválidos: {0}")]
    InvalidQuery(String),

    // A chave indica o recurso: "product_not_found", "category_not_found"...
    #[error("Recurso não encontrado: {0}")]
    NotFound(&'static str),

    #[error("Não autenticado")]
    Unauthorized,

    #[error("Sem permissão")]
    Forbidden,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    // Violação de unicidade: campo afetado + chave de tradução.
    #[error("Conflito no campo {field}: {key}")]
    Conflict {
        field: &'static str,
        key: &'static str,
        params: Params,
    },

    #[error("Limite de requisições excedido, tente em {retry_after}s")]
    Throttled { retry_after: u64 },

    #[error("Host não permitido: {0}")]
    InvalidHost(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de cache: {0}")]
    CacheError(#[from] redis::RedisError),

    #[error("Erro na fila de tarefas: {0}")]
    QueueError(#[from] QueueError),

    #[error("Erro de E/S: {0}")]
    IoError(#[from] std::io::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn bad_request(key: &'static str) -> Self {
        AppError::BadRequest {
            key,
            params: Params::new(),
        }
    }

    pub fn conflict(field: &'static str, key: &'static str, params: Params) -> Self {
        AppError::Conflict { field, key, params }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::BadRequest { .. }
            | AppError::InvalidBody(_)
            | AppError::InvalidQuery(_)
            | AppError::InvalidHost(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized | AppError::InvalidCredentials | AppError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::CacheError(_) | AppError::QueueError(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converte o erro em uma resposta de API no idioma da requisição.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let lang = store.resolve(&locale.0);
        let status = self.status();

        let (error, details) = match self {
            AppError::ValidationError(errors) => (
                store.translate(lang, "validation_failed"),
                Some(validation_details(errors, lang, store)),
            ),
            AppError::BadRequest { key, params } => (store.translate_with(lang, key, params), None),
            AppError::InvalidBody(reason) => (
                store.translate_with(lang, "invalid_body", &params([("reason", json!(reason))])),
                None,
            ),
            AppError::InvalidQuery(reason) => (
                store.translate_with(lang, "invalid_query", &params([("reason", json!(reason))])),
                None,
            ),
            AppError::NotFound(key) => (store.translate(lang, key), None),
            AppError::Unauthorized | AppError::InvalidToken => {
                (store.translate(lang, "unauthorized"), None)
            }
            AppError::Forbidden => (store.translate(lang, "forbidden"), None),
            AppError::InvalidCredentials => (store.translate(lang, "invalid_credentials"), None),
            AppError::Conflict { field, key, params } => {
                let message = store.translate_with(lang, key, params);
                let mut details = Map::new();
                details.insert(field.to_string(), json!([message.clone()]));
                (message, Some(Value::Object(details)))
            }
            AppError::Throttled { retry_after } => (
                store.translate_with(lang, "throttled", &params([("wait", json!(retry_after))])),
                None,
            ),
            AppError::InvalidHost(_) => (store.translate(lang, "invalid_host"), None),
            AppError::CacheError(e) => {
                tracing::warn!("Serviço auxiliar indisponível: {}", e);
                (store.translate(lang, "service_unavailable"), None)
            }
            AppError::QueueError(e) => {
                tracing::warn!("Fila de tarefas indisponível: {}", e);
                (store.translate(lang, "service_unavailable"), None)
            }
            // Todos os outros erros viram 500; o detalhe fica só no log.
            e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (store.translate(lang, "internal_error"), None)
            }
        };

        ApiError {
            status,
            error,
            details,
        }
    }
}

/// Traduz os erros por campo para `{"campo": ["mensagem", ...]}`, em ordem alfabética.
pub fn validation_details(errors: &ValidationErrors, lang: &str, store: &I18nStore) -> Value {
    let mut details: BTreeMap<String, Value> = BTreeMap::new();
    collect_messages(errors, None, lang, store, &mut details);
    Value::Object(details.into_iter().collect::<Map<String, Value>>())
}

fn collect_messages(
    errors: &ValidationErrors,
    prefix: Option<&str>,
    lang: &str,
    store: &I18nStore,
    out: &mut BTreeMap<String, Value>,
) {
    for (field, kind) in errors.errors() {
        let name = match prefix {
            Some(p) => format!("{p}.{field}"),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                let messages: Vec<Value> = list
                    .iter()
                    .map(|e| Value::String(store.translate_with(lang, &e.code, &e.params)))
                    .collect();
                out.insert(name, Value::Array(messages));
            }
            ValidationErrorsKind::Struct(nested) => {
                collect_messages(nested, Some(&name), lang, store, out)
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    let item = format!("{name}[{index}]");
                    collect_messages(nested, Some(&item), lang, store, out);
                }
            }
        }
    }
}

// Estrutura de resposta de erro da API
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.error,
            "status_code": self.status.as_u16(),
        });
        if let (Some(details), Some(obj)) = (self.details, body.as_object_mut()) {
            obj.insert("details".to_string(), details);
        }
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationError;

    fn store() -> I18nStore {
        I18nStore::load("en").unwrap()
    }

    #[test]
    fn validation_errors_become_field_details() {
        let mut errors = ValidationErrors::new();
        let mut err = ValidationError::new("product_name_too_short");
        err.add_param("min".into(), &3);
        errors.add("name", err);
        errors.add("price", ValidationError::new("price_not_positive"));

        let api = AppError::ValidationError(errors).to_api_error(&Locale("en".into()), &store());

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.unwrap();
        assert_eq!(details["name"].as_array().unwrap().len(), 1);
        assert!(details["name"][0].as_str().unwrap().contains('3'));
        assert!(details["price"].is_array());
    }

    #[test]
    fn not_found_is_translated_per_locale() {
        let store = store();
        let en = AppError::NotFound("product_not_found").to_api_error(&Locale("en".into()), &store);
        let pt = AppError::NotFound("product_not_found").to_api_error(&Locale("pt".into()), &store);
        assert_eq!(en.status, StatusCode::NOT_FOUND);
        assert_ne!(en.error, pt.error);
    }

    #[test]
    fn conflict_reports_the_field() {
        let api = AppError::conflict("email", "email_taken", Params::new())
            .to_api_error(&Locale("en".into()), &store());
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert!(api.details.unwrap()["email"].is_array());
    }

    #[test]
    fn infrastructure_failures_hide_details() {
        let api = AppError::InternalServerError(anyhow::anyhow!("segredo"))
            .to_api_error(&Locale("en".into()), &store());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.error.contains("segredo"));
    }
}
