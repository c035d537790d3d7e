//! Database layer
//!
//! The persistent store behind users, sessions and vault links. Two backends
//! are supported and picked from configuration:
//! - SQLite (default, single-file deployment)
//! - MySQL
//!
//! # Usage
//!
//! ```ignore
//! use vaultlinks::config::DatabaseConfig;
//! use vaultlinks::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
