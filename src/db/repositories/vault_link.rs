//! Vault link repository
//!
//! Every read and delete is filtered by owner as well as by id, so a caller
//! can never reach another user's rows through this interface.

use crate::db::pool::{backend, Backend};
use crate::db::DynDatabasePool;
use crate::models::{AccessLevel, VaultLink};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Vault link repository trait
#[async_trait]
pub trait VaultLinkRepository: Send + Sync {
    /// Insert a new link
    async fn create(&self, link: &VaultLink) -> Result<VaultLink>;

    /// Links owned by `user_id`, newest first, at most `limit` rows
    async fn list_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<VaultLink>>;

    /// Get a link by id, only if it is owned by `user_id`
    async fn get_for_user(&self, id: &str, user_id: &str) -> Result<Option<VaultLink>>;

    /// Delete a link by id and owner, returning whether a row was removed
    async fn delete_for_user(&self, id: &str, user_id: &str) -> Result<bool>;
}

/// SQLx-based vault link repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxVaultLinkRepository {
    pool: DynDatabasePool,
}

impl SqlxVaultLinkRepository {
    /// Create a new SQLx vault link repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn VaultLinkRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_LINK: &str = r#"
    INSERT INTO vault_links (id, user_id, url, name, access_level, created_at)
    VALUES (?, ?, ?, ?, ?, ?)
"#;

const SELECT_LINKS_BY_USER: &str = r#"
    SELECT id, user_id, url, name, access_level, created_at
    FROM vault_links
    WHERE user_id = ?
    ORDER BY created_at DESC
    LIMIT ?
"#;

const SELECT_LINK_FOR_USER: &str = r#"
    SELECT id, user_id, url, name, access_level, created_at
    FROM vault_links
    WHERE id = ? AND user_id = ?
"#;

const DELETE_LINK_FOR_USER: &str = "DELETE FROM vault_links WHERE id = ? AND user_id = ?";

#[async_trait]
impl VaultLinkRepository for SqlxVaultLinkRepository {
    async fn create(&self, link: &VaultLink) -> Result<VaultLink> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => create_link_sqlite(pool, link).await,
            Backend::Mysql(pool) => create_link_mysql(pool, link).await,
        }
    }

    async fn list_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<VaultLink>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => list_links_sqlite(pool, user_id, limit).await,
            Backend::Mysql(pool) => list_links_mysql(pool, user_id, limit).await,
        }
        .context("Failed to list vault links")
    }

    async fn get_for_user(&self, id: &str, user_id: &str) -> Result<Option<VaultLink>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => get_link_sqlite(pool, id, user_id).await,
            Backend::Mysql(pool) => get_link_mysql(pool, id, user_id).await,
        }
        .context("Failed to get vault link")
    }

    async fn delete_for_user(&self, id: &str, user_id: &str) -> Result<bool> {
        let affected = match backend(&self.pool)? {
            Backend::Sqlite(pool) => sqlx::query(DELETE_LINK_FOR_USER)
                .bind(id)
                .bind(user_id)
                .execute(pool)
                .await
                .context("Failed to delete vault link")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(DELETE_LINK_FOR_USER)
                .bind(id)
                .bind(user_id)
                .execute(pool)
                .await
                .context("Failed to delete vault link")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

fn parse_access_level(raw: &str) -> Result<AccessLevel> {
    AccessLevel::from_str(raw).with_context(|| format!("Corrupt access level in store: {}", raw))
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_link_sqlite(pool: &SqlitePool, link: &VaultLink) -> Result<VaultLink> {
    sqlx::query(INSERT_LINK)
        .bind(&link.id)
        .bind(&link.user_id)
        .bind(&link.url)
        .bind(&link.name)
        .bind(link.access_level.as_str())
        .bind(link.created_at)
        .execute(pool)
        .await
        .context("Failed to create vault link")?;

    Ok(link.clone())
}

async fn list_links_sqlite(pool: &SqlitePool, user_id: &str, limit: i64) -> Result<Vec<VaultLink>> {
    let rows = sqlx::query(SELECT_LINKS_BY_USER)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_link_sqlite).collect()
}

async fn get_link_sqlite(pool: &SqlitePool, id: &str, user_id: &str) -> Result<Option<VaultLink>> {
    let row = sqlx::query(SELECT_LINK_FOR_USER)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_link_sqlite).transpose()
}

fn row_to_link_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<VaultLink> {
    let access_level: String = row.try_get("access_level")?;
    Ok(VaultLink {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        url: row.try_get("url")?,
        name: row.try_get("name")?,
        access_level: parse_access_level(&access_level)?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_link_mysql(pool: &MySqlPool, link: &VaultLink) -> Result<VaultLink> {
    sqlx::query(INSERT_LINK)
        .bind(&link.id)
        .bind(&link.user_id)
        .bind(&link.url)
        .bind(&link.name)
        .bind(link.access_level.as_str())
        .bind(link.created_at)
        .execute(pool)
        .await
        .context("Failed to create vault link")?;

    Ok(link.clone())
}

async fn list_links_mysql(pool: &MySqlPool, user_id: &str, limit: i64) -> Result<Vec<VaultLink>> {
    let rows = sqlx::query(SELECT_LINKS_BY_USER)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_link_mysql).collect()
}

async fn get_link_mysql(pool: &MySqlPool, id: &str, user_id: &str) -> Result<Option<VaultLink>> {
    let row = sqlx::query(SELECT_LINK_FOR_USER)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_link_mysql).transpose()
}

fn row_to_link_mysql(row: &sqlx::mysql::MySqlRow) -> Result<VaultLink> {
    let access_level: String = row.try_get("access_level")?;
    Ok(VaultLink {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        url: row.try_get("url")?,
        name: row.try_get("name")?,
        access_level: parse_access_level(&access_level)?,
        created_at: row.try_get("created_at")?,
    })
}
