// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, i18n::Params},
    db::map_unique_violation,
    models::auth::{NewUser, User},
};

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, \
                            is_staff, is_superuser, is_active, created_at, updated_at";

const USER_CONSTRAINTS: &[(&str, &str, &str)] = &[
    ("users_username_key", "username", "username_taken"),
    ("users_email_key", "email", "email_taken"),
];

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Login aceita username ou e-mail (este sem diferenciar maiúsculas).
    pub async fn find_by_login(&self, login: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR LOWER(email) = LOWER($1) \
             ORDER BY (username = $1) DESC LIMIT 1"
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// E-mail já usado por outra conta (ignorando `except`).
    pub async fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool, AppError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) \
             AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    pub async fn superuser_exists(&self) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE is_superuser)")
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    // Cria um novo usuário; username/e-mail duplicados viram Conflict.
    pub async fn create_user<'e, E>(&self, executor: E, new_user: &NewUser) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash, first_name, last_name, is_staff, is_superuser) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.is_staff)
        .bind(new_user.is_superuser)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, USER_CONSTRAINTS, Params::new()))
    }

    pub async fn update_account(
        &self,
        id: Uuid,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET first_name = $2, last_name = $3, email = $4, updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, USER_CONSTRAINTS, Params::new()))?
        .ok_or(AppError::NotFound("user_not_found"))
    }

    /// Remove todas as contas comuns (usado por `seed-database --clear`).
    pub async fn delete_regular_users(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE NOT is_superuser")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
