// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::validators::{validate_password, validate_username};

// Representa uma conta vinda do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Nome completo; cai para o username quando não há nome cadastrado.
    pub fn full_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Dados de uma nova conta, já com a senha transformada em hash.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

// Dados para registro de um novo usuário
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "passwords_match", skip_on_field_errors = false))]
pub struct RegisterUserPayload {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(email(code = "email_invalid"))]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    #[validate(length(max = 150, code = "name_length"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150, code = "name_length"))]
    pub last_name: String,
}

fn passwords_match(payload: &RegisterUserPayload) -> Result<(), ValidationError> {
    if payload.password != payload.password_confirm {
        return Err(ValidationError::new("password_mismatch"));
    }
    Ok(())
}

// Dados para login: aceita username ou e-mail
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(length(min = 1, code = "required"))]
    pub username: String,
    #[validate(length(min = 1, code = "required"))]
    pub password: String,
}

/// Dados da conta editáveis na página de perfil.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAccountPayload {
    #[serde(default)]
    #[validate(length(max = 150, code = "name_length"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150, code = "name_length"))]
    pub last_name: String,
    #[validate(email(code = "email_invalid"))]
    pub email: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub is_staff: bool,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name(),
            is_staff: user.is_staff,
        }
    }
}

/// Corpo de `POST /api/v1/auth/token/verify`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TokenVerifyPayload {
    #[validate(length(min = 1, code = "required"))]
    pub token: String,
}

/// Token válido: dono e janela de validade.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenVerifyResponse {
    pub user_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&Claims> for TokenVerifyResponse {
    fn from(claims: &Claims) -> Self {
        let at = |secs: usize| DateTime::from_timestamp(secs as i64, 0).unwrap_or_default();
        Self {
            user_id: claims.sub,
            issued_at: at(claims.iat),
            expires_at: at(claims.exp),
        }
    }
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: String::new(),
            first_name: first.into(),
            last_name: last.into(),
            is_staff: false,
            is_superuser: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn full_name_falls_back_to_username() {
        assert_eq!(user("Alice", "Johnson").full_name(), "Alice Johnson");
        assert_eq!(user("", "").full_name(), "alice");
        assert_eq!(user("Alice", " ").full_name(), "Alice");
    }

    #[test]
    fn registration_requires_matching_passwords() {
        let payload = RegisterUserPayload {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "password123".into(),
            password_confirm: "password124".into(),
            first_name: String::new(),
            last_name: String::new(),
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.errors().contains_key("__all__"));
    }

    #[test]
    fn registration_reports_each_bad_field() {
        let payload = RegisterUserPayload {
            username: "a b".into(),
            email: "nope".into(),
            password: "short".into(),
            password_confirm: "short".into(),
            first_name: String::new(),
            last_name: String::new(),
        };
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
