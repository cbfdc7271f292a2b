// src/services/profile_service.rs

use image::ImageFormat;
use std::path::PathBuf;
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::{
        error::AppError,
        pagination::{Page, PageRequest},
        validators::validate_image,
    },
    db::{ProfileRepository, UserRepository},
    models::{
        auth::User,
        profile::{CreateProfilePayload, ProfileDetail, ProfileListItem, ProfileQuery, UpdateProfilePayload},
    },
};

/// Subpasta de MEDIA_ROOT onde ficam os avatares.
pub const AVATAR_DIR: &str = "avatars";

#[derive(Clone)]
pub struct ProfileService {
    profiles: ProfileRepository,
    users: UserRepository,
    media_root: PathBuf,
}

impl ProfileService {
    pub fn new(profiles: ProfileRepository, users: UserRepository, media_root: PathBuf) -> Self {
        Self {
            profiles,
            users,
            media_root,
        }
    }

    pub async fn list(&self, query: &ProfileQuery) -> Result<Page<ProfileListItem>, AppError> {
        let page = PageRequest { page: query.page };
        let (rows, count) = self.profiles.list(query, &page).await?;
        Ok(Page::new(rows, count, &page).map(ProfileListItem::from))
    }

    pub async fn detail(&self, id: Uuid) -> Result<ProfileDetail, AppError> {
        self.profiles
            .find_detail(id)
            .await?
            .ok_or(AppError::NotFound("profile_not_found"))
    }

    /// Perfil da conta. Se faltar (criação falhou no cadastro), é criado agora.
    pub async fn for_user(&self, user: &User) -> Result<ProfileDetail, AppError> {
        if let Some(detail) = self.profiles.find_detail_by_user(user.id).await? {
            return Ok(detail);
        }
        tracing::warn!(user_id = %user.id, username = %user.username, "Perfil ausente, criando agora");
        self.profiles.create_for_user(self.profiles.pool(), user.id).await?;
        self.profiles
            .find_detail_by_user(user.id)
            .await?
            .ok_or(AppError::NotFound("profile_not_found"))
    }

    /// Só o dono ou a equipe alteram um perfil; `is_verified` só pela equipe.
    pub async fn update(
        &self,
        id: Uuid,
        payload: &UpdateProfilePayload,
        actor: &User,
    ) -> Result<ProfileDetail, AppError> {
        let mut profile = self.detail(id).await?.profile;
        if !actor.is_staff && profile.user_id != actor.id {
            return Err(AppError::Forbidden);
        }
        payload.apply_to(&mut profile, actor.is_staff);
        self.profiles.update(&profile).await?;
        self.detail(id).await
    }

    pub async fn update_own(&self, actor: &User, payload: &UpdateProfilePayload) -> Result<ProfileDetail, AppError> {
        let current = self.for_user(actor).await?;
        self.update(current.profile.id, payload, actor).await
    }

    /// Criação manual pela equipe; a conta precisa existir e ainda não ter perfil.
    pub async fn create(&self, payload: &CreateProfilePayload) -> Result<ProfileDetail, AppError> {
        if self.users.find_by_id(payload.user_id).await?.is_none() {
            return Err(field_error("user_id", "user_not_found"));
        }
        if self.profiles.find_by_user(payload.user_id).await?.is_some() {
            return Err(AppError::conflict("user_id", "profile_exists", Default::default()));
        }

        let mut profile = self
            .profiles
            .create_for_user(self.profiles.pool(), payload.user_id)
            .await?;
        payload.fields.apply_to(&mut profile, true);
        let saved = self.profiles.update(&profile).await?;
        self.detail(saved.id).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.profiles.delete(id).await? {
            return Err(AppError::NotFound("profile_not_found"));
        }
        Ok(())
    }

    /// Valida e grava o avatar em MEDIA_ROOT/avatars/<perfil>.<ext>.
    pub async fn set_avatar(&self, user: &User, bytes: &[u8]) -> Result<ProfileDetail, AppError> {
        validate_image(bytes).map_err(|e| {
            let mut errors = ValidationErrors::new();
            errors.add("avatar", e);
            AppError::ValidationError(errors)
        })?;

        let current = self.for_user(user).await?;
        let relative = format!("{AVATAR_DIR}/{}.{}", current.profile.id, avatar_extension(bytes));

        let dir = self.media_root.join(AVATAR_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(self.media_root.join(&relative), bytes).await?;

        if let Some(old) = current.profile.avatar.as_deref().filter(|old| *old != relative) {
            if let Err(e) = tokio::fs::remove_file(self.media_root.join(old)).await {
                tracing::warn!(path = old, error = %e, "Avatar antigo não removido");
            }
        }

        self.profiles.set_avatar(current.profile.id, &relative).await?;
        tracing::info!(user_id = %user.id, path = %relative, "Avatar atualizado");
        self.detail(current.profile.id).await
    }
}

fn field_error(field: &'static str, code: &'static str) -> AppError {
    let mut errors = ValidationErrors::new();
    errors.add(field, ValidationError::new(code));
    AppError::ValidationError(errors)
}

pub fn avatar_extension(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "png",
        Ok(ImageFormat::Jpeg) => "jpg",
        Ok(ImageFormat::Gif) => "gif",
        Ok(ImageFormat::WebP) => "webp",
        Ok(ImageFormat::Bmp) => "bmp",
        _ => "img",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat};

    #[test]
    fn extension_follows_the_image_signature() {
        let mut png = Vec::new();
        DynamicImage::new_rgb8(120, 120)
            .write_to(&mut png, ImageOutputFormat::Png)
            .unwrap();
        assert_eq!(avatar_extension(&png), "png");
        assert_eq!(avatar_extension(b"not an image"), "img");
    }
}
