use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use super::{format_datetime, parse_datetime};
use crate::errors::{AppError, AppResult, RepositoryError};
use crate::models::User;

/// Tokens are only ever stored as a SHA-256 digest
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn user_from_row(row: &SqliteRow) -> AppResult<User> {
    let id: String = row.get("id");
    Ok(User {
        id: Uuid::parse_str(&id).map_err(|e| RepositoryError::invalid_value("users.id", e.to_string()))?,
        email: row.get("email"),
        name: row.get("name"),
        created_at: parse_datetime("users.created_at", &row.get::<String, _>("created_at"))?,
        updated_at: parse_datetime("users.updated_at", &row.get::<String, _>("updated_at"))?,
    })
}

impl crate::database::Database {
    pub async fn create_user(&self, email: &str, name: Option<&str>) -> AppResult<User> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AppError::validation("Email is required"));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            name: name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        let result = sqlx::query(
            "INSERT INTO users (id, email, name, created_at, updated_at) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.name)
        .bind(format_datetime(&user.created_at))
        .bind(format_datetime(&user.updated_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::constraint_violation("users_email_key", "User already exists").into());
        }

        info!("Created user {} ({})", user.id, user.email);
        Ok(user)
    }

    pub async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT id, email, name, created_at, updated_at FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT id, email, name, created_at, updated_at FROM users WHERE email = ?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn update_user_name(&self, id: Uuid, name: &str) -> AppResult<User> {
        let result = sqlx::query("UPDATE users SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(format_datetime(&Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User", id.to_string()));
        }

        self.get_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id.to_string()))
    }

    /// Remove the user with their saved jobs and tokens in one transaction
    pub async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let id = id.to_string();
        let mut tx = self.pool.begin().await?;

        let jobs = sqlx::query("DELETE FROM saved_jobs WHERE user_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM api_tokens WHERE user_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        let users = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        if users > 0 {
            info!("Deleted user {} and {} saved jobs", id, jobs);
        }
        Ok(users > 0)
    }

    /// Issue a new bearer token; only its digest is persisted
    pub async fn issue_token(&self, user_id: Uuid) -> AppResult<String> {
        let token = generate_token();

        sqlx::query("INSERT INTO api_tokens (token_hash, user_id, created_at) VALUES (?, ?, ?)")
            .bind(hash_token(&token))
            .bind(user_id.to_string())
            .bind(format_datetime(&Utc::now()))
            .execute(&self.pool)
            .await?;

        Ok(token)
    }

    pub async fn authenticate_token(&self, token: &str) -> AppResult<Option<User>> {
        let token_hash = hash_token(token);
        let row = sqlx::query(
            "SELECT u.id, u.email, u.name, u.created_at, u.updated_at
             FROM api_tokens t
             JOIN users u ON u.id = t.user_id
             WHERE t.token_hash = ?",
        )
        .bind(&token_hash)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        sqlx::query("UPDATE api_tokens SET last_used_at = ? WHERE token_hash = ?")
            .bind(format_datetime(&Utc::now()))
            .bind(&token_hash)
            .execute(&self.pool)
            .await?;

        user_from_row(&row).map(Some)
    }
}
