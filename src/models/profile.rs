// src/models/profile.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::common::validators::{validate_birth_date, validate_phone, validate_website};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: String,
    /// Caminho relativo a MEDIA_ROOT (ex.: "avatars/<id>.png")
    pub avatar: Option<String>,
    pub phone: String,
    pub birth_date: Option<NaiveDate>,
    pub city: String,
    pub country: String,
    pub website: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn avatar_url(&self) -> Option<String> {
        self.avatar.as_ref().map(|path| format!("/media/{path}"))
    }
}

/// Perfil junto com os dados da conta.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ProfileDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub profile: UserProfile,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileListItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub city: String,
    pub country: String,
    pub is_verified: bool,
}

impl From<ProfileDetail> for ProfileListItem {
    fn from(detail: ProfileDetail) -> Self {
        Self {
            avatar_url: detail.profile.avatar_url(),
            id: detail.profile.id,
            user_id: detail.profile.user_id,
            username: detail.username,
            full_name: detail.full_name,
            city: detail.profile.city,
            country: detail.profile.country,
            is_verified: detail.profile.is_verified,
        }
    }
}

/// Alterações de perfil. Strings vazias limpam o campo e não passam pelas
/// regras de formato (telefone, site).
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfilePayload {
    #[validate(length(max = 500, code = "name_length"))]
    pub bio: Option<String>,
    #[validate(custom(function = "validate_optional_phone"))]
    pub phone: Option<String>,
    #[validate(custom(function = "validate_birth_date"))]
    pub birth_date: Option<NaiveDate>,
    #[validate(length(max = 100, code = "name_length"))]
    pub city: Option<String>,
    #[validate(length(max = 100, code = "name_length"))]
    pub country: Option<String>,
    #[validate(custom(function = "validate_optional_website"))]
    pub website: Option<String>,
    // Só a equipe altera a verificação; ignorado para o próprio dono.
    pub is_verified: Option<bool>,
}

fn validate_optional_phone(phone: &str) -> Result<(), validator::ValidationError> {
    if phone.trim().is_empty() {
        return Ok(());
    }
    validate_phone(phone)
}

fn validate_optional_website(url: &str) -> Result<(), validator::ValidationError> {
    if url.trim().is_empty() {
        return Ok(());
    }
    validate_website(url)
}

impl UpdateProfilePayload {
    pub fn apply_to(&self, profile: &mut UserProfile, allow_verification: bool) {
        if let Some(bio) = &self.bio {
            profile.bio = bio.trim().to_string();
        }
        if let Some(phone) = &self.phone {
            profile.phone = phone.trim().to_string();
        }
        if let Some(birth_date) = self.birth_date {
            profile.birth_date = Some(birth_date);
        }
        if let Some(city) = &self.city {
            profile.city = city.trim().to_string();
        }
        if let Some(country) = &self.country {
            profile.country = country.trim().to_string();
        }
        if let Some(website) = &self.website {
            profile.website = website.trim().to_string();
        }
        if allow_verification {
            if let Some(verified) = self.is_verified {
                profile.is_verified = verified;
            }
        }
    }
}

/// Criação de perfil pela equipe (perfis normalmente nascem com a conta).
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProfilePayload {
    pub user_id: Uuid,
    #[serde(flatten)]
    #[validate(nested)]
    pub fields: UpdateProfilePayload,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ProfileQuery {
    pub city: Option<String>,
    pub country: Option<String>,
    pub is_verified: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            bio: String::new(),
            avatar: None,
            phone: String::new(),
            birth_date: None,
            city: String::new(),
            country: String::new(),
            website: String::new(),
            is_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_optional_fields_skip_format_rules() {
        let payload = UpdateProfilePayload {
            phone: Some(String::new()),
            website: Some("  ".into()),
            ..Default::default()
        };
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn malformed_phone_and_website_are_rejected() {
        let payload = UpdateProfilePayload {
            phone: Some("123".into()),
            website: Some("example.com".into()),
            ..Default::default()
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("phone"));
        assert!(errors.field_errors().contains_key("website"));
    }

    #[test]
    fn owners_cannot_verify_themselves() {
        let mut p = profile();
        let payload = UpdateProfilePayload {
            city: Some(" São Paulo ".into()),
            is_verified: Some(true),
            ..Default::default()
        };
        payload.apply_to(&mut p, false);
        assert_eq!(p.city, "São Paulo");
        assert!(!p.is_verified);

        payload.apply_to(&mut p, true);
        assert!(p.is_verified);
    }

    #[test]
    fn avatar_url_is_served_from_media() {
        let mut p = profile();
        assert_eq!(p.avatar_url(), None);
        p.avatar = Some("avatars/a.png".into());
        assert_eq!(p.avatar_url().as_deref(), Some("/media/avatars/a.png"));
    }
}
