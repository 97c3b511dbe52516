//! Users repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        user::{RegisterUser, UpdateUser, User},
        Pagination,
    },
};

use super::{search_term, unique_violation};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<User>;
    /// Look a user up by email or username, case-insensitively
    async fn find_by_login(&self, login: &str) -> AppResult<Option<User>>;
    async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool>;
    async fn username_exists(&self, username: &str, exclude_id: Option<i32>) -> AppResult<bool>;
    /// Insert a user; the first account of an empty store is made admin
    async fn create(&self, user: &RegisterUser, password_hash: &str) -> AppResult<User>;
    /// Merge present fields; a new password hash also clears stored sessions
    async fn update(&self, id: i32, user: &UpdateUser, password_hash: Option<String>) -> AppResult<User>;
    /// Returns false when no row had that id
    async fn delete(&self, id: i32) -> AppResult<bool>;
    async fn search(&self, pagination: Pagination, search: Option<String>) -> AppResult<(Vec<User>, i64)>;
    /// Append a session token, keeping only the `keep` most recent
    async fn push_token(&self, id: i32, token: &str, keep: i32) -> AppResult<()>;
    async fn remove_token(&self, id: i32, token: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_user_conflict(err: sqlx::Error) -> AppError {
    match unique_violation(&err).as_deref() {
        Some("users_username_key") => AppError::Conflict("Username already exists".to_string()),
        Some(_) => AppError::Conflict("Email already exists".to_string()),
        None => err.into(),
    }
}

#[async_trait]
impl UserStore for UsersRepository {
    /// Get user by ID
    async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn find_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE LOWER(email) = LOWER($1) OR LOWER(username) = LOWER($1)
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(login.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Check if email already exists
    async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND ($2::int IS NULL OR id != $2))",
        )
        .bind(email.trim())
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Check if username already exists
    async fn username_exists(&self, username: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1) AND ($2::int IS NULL OR id != $2))",
        )
        .bind(username.trim())
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create(&self, user: &RegisterUser, password_hash: &str) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        // Registrations queue here so only one of them can see an empty table
        sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password, username, phone, role)
            VALUES (
                $1, $2, $3, $4, $5,
                CASE WHEN EXISTS(SELECT 1 FROM users) THEN 'USER' ELSE 'ADMIN' END
            )
            RETURNING *
            "#,
        )
        .bind(user.name.trim())
        .bind(user.email.trim())
        .bind(password_hash)
        .bind(user.username.as_deref().map(str::trim))
        .bind(user.phone.as_deref().map(str::trim))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_user_conflict)?;

        tx.commit().await?;

        Ok(created)
    }

    async fn update(&self, id: i32, user: &UpdateUser, password_hash: Option<String>) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($1::text, name),
                email = COALESCE($2::text, email),
                username = COALESCE($3::text, username),
                phone = COALESCE($4::text, phone),
                password = COALESCE($5::text, password),
                tokens = CASE WHEN $5::text IS NULL THEN tokens ELSE '{}' END,
                role = COALESCE($6::text, role),
                updated_at = NOW()
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(user.name.as_deref().map(str::trim))
        .bind(user.email.as_deref().map(str::trim))
        .bind(user.username.as_deref().map(str::trim))
        .bind(user.phone.as_deref().map(str::trim))
        .bind(password_hash)
        .bind(user.role.map(|r| r.as_str()))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_user_conflict)?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Delete a user; their closed transactions go with them
    async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Search users with pagination
    async fn search(&self, pagination: Pagination, search: Option<String>) -> AppResult<(Vec<User>, i64)> {
        let pattern = search_term(search.as_deref());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1 OR username ILIKE $1)
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1 OR username ILIKE $1)
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&pattern)
        .bind(pagination.limit)
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((users, total))
    }

    async fn push_token(&self, id: i32, token: &str, keep: i32) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET tokens = (array_append(tokens, $2::text))[GREATEST(cardinality(tokens) + 2 - $3, 1):]
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(keep)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_token(&self, id: i32, token: &str) -> AppResult<()> {
        sqlx::query("UPDATE users SET tokens = array_remove(tokens, $2::text) WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
