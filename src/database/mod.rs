//! Database module
//!
//! This module provides all database functionality including:
//! - Schema and migrations
//! - Domain model definitions
//! - Mapping between domain records and persisted rows
//! - Repository layer for CRUD operations

pub mod mapping;
pub mod models;
pub mod repository;
pub mod schema;

pub use models::*;
pub use repository::Repository;
pub use schema::initialize_database;

use crate::config::{BACKGROUND_POOL_CONNECTIONS, BUSY_TIMEOUT_SECS, MAX_POOL_CONNECTIONS};
use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Build connection options shared by migration and application connections.
fn connect_options(db_path: &Path) -> std::result::Result<SqliteConnectOptions, sqlx::Error> {
    SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display())).map(
        |opts| {
            opts.create_if_missing(true)
                .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS))
                .journal_mode(SqliteJournalMode::Wal)
                .foreign_keys(true)
        },
    )
}

/// Connection options for a named shared-cache in-memory database.
///
/// Every pool built from the same name sees the same data; the database
/// vanishes when the last connection closes.
fn memory_connect_options(name: &str) -> std::result::Result<SqliteConnectOptions, sqlx::Error> {
    SqliteConnectOptions::from_str(&format!(
        "sqlite:file:{}?mode=memory&cache=shared",
        name
    ))
    .map(|opts| opts.foreign_keys(true))
}

/// Create and initialize a database connection pool.
///
/// Migrations run on a dedicated single-connection pool that is closed
/// before the application pool is created. This prevents schema-caching
/// issues where pooled connections opened before ALTER TABLE ADD COLUMN
/// still see the old column count.
pub async fn create_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::info!("Creating database connection pool at: {:?}", db_path);

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Phase 1 — run migrations on a single dedicated connection.
    // Using max_connections(1) guarantees every PRAGMA and every
    // ALTER TABLE executes on the same connection, eliminating
    // stale-schema reads from other pooled connections.
    let migration_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options(db_path)?)
        .await?;

    initialize_database(&migration_pool).await?;
    migration_pool.close().await;

    // Phase 2 — create the application pool.
    // All connections are opened *after* migrations have committed,
    // so they read the final schema including every ADD COLUMN.
    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_POOL_CONNECTIONS)
        .connect_with(connect_options(db_path)?)
        .await?;

    tracing::info!("Database pool created successfully");

    Ok(pool)
}

/// Create a secondary pool over an existing store file.
///
/// The schema is assumed to be in place; no migrations run here. Writers
/// on this pool see only committed state from other pools and vice versa.
pub async fn create_background_pool(db_path: &Path) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(BACKGROUND_POOL_CONNECTIONS)
        .connect_with(connect_options(db_path)?)
        .await?;

    tracing::debug!("Background pool created for: {:?}", db_path);

    Ok(pool)
}

/// Create and initialize a named in-memory pool for ephemeral use.
///
/// `min_connections(1)` with recycling disabled keeps at least one
/// connection open for the pool's lifetime; shared-cache in-memory
/// databases are dropped the moment their last connection closes.
pub async fn create_memory_pool(name: &str) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(MAX_POOL_CONNECTIONS)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(memory_connect_options(name)?)
        .await?;

    initialize_database(&pool).await?;

    tracing::debug!("In-memory pool created: {}", name);

    Ok(pool)
}

/// Attach a secondary pool to an existing in-memory database.
pub async fn create_memory_background_pool(name: &str) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(BACKGROUND_POOL_CONNECTIONS)
        .connect_with(memory_connect_options(name)?)
        .await?;

    Ok(pool)
}
