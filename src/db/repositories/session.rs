//! Session repository
//!
//! Database operations for login sessions. Sessions are only ever inserted
//! and read; expired rows stay in place.

use crate::db::pool::{backend, Backend};
use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get the newest session carrying this bearer token
    async fn get_by_token(&self, token: &str) -> Result<Option<Session>>;

    /// Count sessions belonging to a user, expired ones included
    async fn count_by_user(&self, user_id: &str) -> Result<i64>;
}

/// SQLx-based session repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_SESSION: &str = r#"
    INSERT INTO sessions (id, user_id, session_token, created_at, expires_at)
    VALUES (?, ?, ?, ?, ?)
"#;

// Token uniqueness is not enforced, so the newest row wins.
const SELECT_SESSION_BY_TOKEN: &str = r#"
    SELECT id, user_id, session_token, created_at, expires_at
    FROM sessions
    WHERE session_token = ?
    ORDER BY created_at DESC
    LIMIT 1
"#;

const COUNT_SESSIONS_BY_USER: &str = "SELECT COUNT(*) AS count FROM sessions WHERE user_id = ?";

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => create_session_sqlite(pool, session).await,
            Backend::Mysql(pool) => create_session_mysql(pool, session).await,
        }
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Session>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => get_session_by_token_sqlite(pool, token).await,
            Backend::Mysql(pool) => get_session_by_token_mysql(pool, token).await,
        }
        .context("Failed to get session by token")
    }

    async fn count_by_user(&self, user_id: &str) -> Result<i64> {
        let count: i64 = match backend(&self.pool)? {
            Backend::Sqlite(pool) => sqlx::query(COUNT_SESSIONS_BY_USER)
                .bind(user_id)
                .fetch_one(pool)
                .await?
                .try_get("count")?,
            Backend::Mysql(pool) => sqlx::query(COUNT_SESSIONS_BY_USER)
                .bind(user_id)
                .fetch_one(pool)
                .await?
                .try_get("count")?,
        };
        Ok(count)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_session_sqlite(pool: &SqlitePool, session: &Session) -> Result<Session> {
    sqlx::query(INSERT_SESSION)
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.session_token)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(pool)
        .await
        .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_token_sqlite(pool: &SqlitePool, token: &str) -> Result<Option<Session>> {
    let row = sqlx::query(SELECT_SESSION_BY_TOKEN)
        .bind(token)
        .fetch_optional(pool)
        .await?;

    row.map(|row| row_to_session_sqlite(&row)).transpose()
}

fn row_to_session_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Session> {
    Ok(Session {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        session_token: row.try_get("session_token")?,
        created_at: row.try_get("created_at")?,
        expires_at: row.try_get("expires_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_session_mysql(pool: &MySqlPool, session: &Session) -> Result<Session> {
    sqlx::query(INSERT_SESSION)
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.session_token)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(pool)
        .await
        .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_token_mysql(pool: &MySqlPool, token: &str) -> Result<Option<Session>> {
    let row = sqlx::query(SELECT_SESSION_BY_TOKEN)
        .bind(token)
        .fetch_optional(pool)
        .await?;

    row.map(|row| row_to_session_mysql(&row)).transpose()
}

fn row_to_session_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Session> {
    Ok(Session {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        session_token: row.try_get("session_token")?,
        created_at: row.try_get("created_at")?,
        expires_at: row.try_get("expires_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::{Duration, Utc};

    async fn setup_test_repo() -> SqlxSessionRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxSessionRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get_by_token() {
        let repo = setup_test_repo().await;
        let session = Session::new("u1".to_string(), "tok1".to_string(), Utc::now(), Duration::days(7));

        let created = repo.create(&session).await.expect("Failed to create session");
        assert_eq!(created, session);

        let found = repo
            .get_by_token("tok1")
            .await
            .expect("Failed to get session")
            .expect("Session not found");
        assert_eq!(found, session);
    }

    #[tokio::test]
    async fn test_get_by_token_not_found() {
        let repo = setup_test_repo().await;
        let found = repo.get_by_token("missing").await.expect("Failed to get session");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_kept() {
        let repo = setup_test_repo().await;
        let past = Utc::now() - Duration::days(30);
        let session = Session::new("u1".to_string(), "old".to_string(), past, Duration::days(7));
        repo.create(&session).await.expect("Failed to create session");

        let found = repo.get_by_token("old").await.unwrap().expect("Session not found");
        assert!(found.is_expired_at(Utc::now()));
        assert_eq!(repo.count_by_user("u1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_token_returns_newest() {
        let repo = setup_test_repo().await;
        let now = Utc::now();
        let older = Session::new("u1".to_string(), "shared".to_string(), now - Duration::days(10), Duration::days(7));
        let newer = Session::new("u2".to_string(), "shared".to_string(), now, Duration::days(7));

        repo.create(&newer).await.unwrap();
        repo.create(&older).await.unwrap();

        let found = repo.get_by_token("shared").await.unwrap().expect("Session not found");
        assert_eq!(found.id, newer.id);
        assert_eq!(found.user_id, "u2");
    }

    #[tokio::test]
    async fn test_count_by_user() {
        let repo = setup_test_repo().await;
        let now = Utc::now();
        for token in ["a", "b", "c"] {
            let session = Session::new("u1".to_string(), token.to_string(), now, Duration::days(7));
            repo.create(&session).await.unwrap();
        }
        let other = Session::new("u2".to_string(), "d".to_string(), now, Duration::days(7));
        repo.create(&other).await.unwrap();

        assert_eq!(repo.count_by_user("u1").await.unwrap(), 3);
        assert_eq!(repo.count_by_user("u2").await.unwrap(), 1);
        assert_eq!(repo.count_by_user("u3").await.unwrap(), 0);
    }
}
