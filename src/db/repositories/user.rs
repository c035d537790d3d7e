//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::db::pool::{backend, Backend};
use crate::db::DynDatabasePool;
use crate::models::User;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Count total users
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_USER: &str = r#"
    INSERT INTO users (id, email, name, picture, created_at)
    VALUES (?, ?, ?, ?, ?)
"#;

const SELECT_USER_BY_ID: &str = r#"
    SELECT id, email, name, picture, created_at
    FROM users
    WHERE id = ?
"#;

const SELECT_USER_BY_EMAIL: &str = r#"
    SELECT id, email, name, picture, created_at
    FROM users
    WHERE email = ?
"#;

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => create_user_sqlite(pool, user).await,
            Backend::Mysql(pool) => create_user_mysql(pool, user).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => fetch_user_sqlite(pool, SELECT_USER_BY_ID, id).await,
            Backend::Mysql(pool) => fetch_user_mysql(pool, SELECT_USER_BY_ID, id).await,
        }
        .context("Failed to get user by ID")
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => fetch_user_sqlite(pool, SELECT_USER_BY_EMAIL, email).await,
            Backend::Mysql(pool) => fetch_user_mysql(pool, SELECT_USER_BY_EMAIL, email).await,
        }
        .context("Failed to get user by email")
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM users";
        let count: i64 = match backend(&self.pool)? {
            Backend::Sqlite(pool) => sqlx::query(sql).fetch_one(pool).await?.try_get("count")?,
            Backend::Mysql(pool) => sqlx::query(sql).fetch_one(pool).await?.try_get("count")?,
        };
        Ok(count)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    sqlx::query(INSERT_USER)
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.picture)
        .bind(user.created_at)
        .execute(pool)
        .await
        .context("Failed to create user")?;

    Ok(user.clone())
}

async fn fetch_user_sqlite(pool: &SqlitePool, sql: &str, key: &str) -> Result<Option<User>> {
    let row = sqlx::query(sql).bind(key).fetch_optional(pool).await?;
    row.map(|row| row_to_user_sqlite(&row)).transpose()
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        picture: row.try_get("picture")?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    sqlx::query(INSERT_USER)
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.picture)
        .bind(user.created_at)
        .execute(pool)
        .await
        .context("Failed to create user")?;

    Ok(user.clone())
}

async fn fetch_user_mysql(pool: &MySqlPool, sql: &str, key: &str) -> Result<Option<User>> {
    let row = sqlx::query(sql).bind(key).fetch_optional(pool).await?;
    row.map(|row| row_to_user_mysql(&row)).transpose()
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        picture: row.try_get("picture")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::NewUserProfile;
    use chrono::Utc;

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    fn test_user(email: &str, picture: Option<&str>) -> User {
        User::new(
            NewUserProfile {
                email: email.to_string(),
                name: "Test User".to_string(),
                picture: picture.map(str::to_string),
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_create_and_get_by_id() {
        let repo = setup_test_repo().await;
        let user = test_user("a@x.com", Some("https://img.example.com/a.png"));

        repo.create(&user).await.expect("Failed to create user");

        let found = repo
            .get_by_id(&user.id)
            .await
            .expect("Failed to get user")
            .expect("User not found");
        assert_eq!(found, user);
    }

    #[tokio::test]
    async fn test_get_by_email() {
        let repo = setup_test_repo().await;
        let user = test_user("b@x.com", None);
        repo.create(&user).await.expect("Failed to create user");

        let found = repo
            .get_by_email("b@x.com")
            .await
            .expect("Failed to get user")
            .expect("User not found");
        assert_eq!(found.id, user.id);
        assert_eq!(found.picture, None);

        assert!(repo.get_by_email("nobody@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = setup_test_repo().await;
        repo.create(&test_user("dup@x.com", None))
            .await
            .expect("Failed to create user");

        let result = repo.create(&test_user("dup@x.com", None)).await;
        assert!(result.is_err());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let repo = setup_test_repo().await;
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
