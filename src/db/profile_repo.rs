// src/db/profile_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::PageRequest},
    models::{
        product::parse_bool,
        profile::{ProfileDetail, ProfileQuery, UserProfile},
    },
};

const PROFILE_COLUMNS: &str = "id, user_id, bio, avatar, phone, birth_date, city, country, \
                               website, is_verified, created_at, updated_at";

const PROFILE_DETAIL_SELECT: &str = "SELECT p.id, p.user_id, p.bio, p.avatar, p.phone, p.birth_date, \
    p.city, p.country, p.website, p.is_verified, p.created_at, p.updated_at, \
    u.username, u.email, u.first_name, u.last_name, \
    COALESCE(NULLIF(TRIM(u.first_name || ' ' || u.last_name), ''), u.username) AS full_name \
    FROM user_profiles p JOIN users u ON u.id = p.user_id";

#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Cria o perfil da conta; se já existir, devolve o existente.
    pub async fn create_for_user<'e, E>(&self, executor: E, user_id: Uuid) -> Result<UserProfile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // O "DO UPDATE" inócuo faz o RETURNING devolver a linha existente.
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            "INSERT INTO user_profiles (user_id) VALUES ($1) \
             ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .fetch_one(executor)
        .await?;
        Ok(profile)
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    pub async fn find_detail(&self, id: Uuid) -> Result<Option<ProfileDetail>, AppError> {
        let detail = sqlx::query_as::<_, ProfileDetail>(&format!("{PROFILE_DETAIL_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(detail)
    }

    pub async fn find_detail_by_user(&self, user_id: Uuid) -> Result<Option<ProfileDetail>, AppError> {
        let detail =
            sqlx::query_as::<_, ProfileDetail>(&format!("{PROFILE_DETAIL_SELECT} WHERE p.user_id = $1"))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(detail)
    }

    pub async fn list(
        &self,
        query: &ProfileQuery,
        page: &PageRequest,
    ) -> Result<(Vec<ProfileDetail>, i64), AppError> {
        let mut count_qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM user_profiles p JOIN users u ON u.id = p.user_id",
        );
        push_profile_filters(&mut count_qb, query);
        let count: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(PROFILE_DETAIL_SELECT);
        push_profile_filters(&mut qb, query);
        qb.push(" ORDER BY u.username ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = qb.build_query_as::<ProfileDetail>().fetch_all(&self.pool).await?;

        Ok((rows, count))
    }

    pub async fn update(&self, profile: &UserProfile) -> Result<UserProfile, AppError> {
        let updated = sqlx::query_as::<_, UserProfile>(&format!(
            "UPDATE user_profiles SET bio = $2, phone = $3, birth_date = $4, city = $5, \
             country = $6, website = $7, is_verified = $8, updated_at = NOW() \
             WHERE id = $1 RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(profile.id)
        .bind(&profile.bio)
        .bind(&profile.phone)
        .bind(profile.birth_date)
        .bind(&profile.city)
        .bind(&profile.country)
        .bind(&profile.website)
        .bind(profile.is_verified)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("profile_not_found"))?;
        Ok(updated)
    }

    pub async fn set_avatar(&self, id: Uuid, avatar: &str) -> Result<UserProfile, AppError> {
        let updated = sqlx::query_as::<_, UserProfile>(&format!(
            "UPDATE user_profiles SET avatar = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id)
        .bind(avatar)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("profile_not_found"))?;
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM user_profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn push_profile_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ProfileQuery) {
    qb.push(" WHERE TRUE");
    if let Some(city) = query.city.as_deref().filter(|v| !v.trim().is_empty()) {
        qb.push(" AND p.city ILIKE ").push_bind(city.trim().to_string());
    }
    if let Some(country) = query.country.as_deref().filter(|v| !v.trim().is_empty()) {
        qb.push(" AND p.country ILIKE ").push_bind(country.trim().to_string());
    }
    if let Some(verified) = query.is_verified.as_deref().and_then(parse_bool) {
        qb.push(" AND p.is_verified = ").push_bind(verified);
    }
    if let Some(term) = query.search.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        let pattern = format!("%{term}%");
        qb.push(" AND (u.username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.last_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.bio ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}
