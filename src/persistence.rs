//! Persistence controller
//!
//! Owns the store's lifecycle: opening (with corruption recovery), the
//! main connection pool, background pools for bulk work, checkpointing,
//! and close/reopen around restore.
//!
//! The controller is an explicitly constructed handle passed to whoever
//! needs it; there is no global instance. `in_memory()` gives tests an
//! ephemeral store that shares nothing with any file on disk.

use crate::config::STORE_FILENAME;
use crate::database::{
    create_background_pool, create_memory_background_pool, create_memory_pool, create_pool,
};
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

enum StoreLocation {
    OnDisk { data_dir: PathBuf, db_path: PathBuf },
    InMemory { name: String },
}

/// Handle to an open store. Cheap to clone; all clones share the pool.
#[derive(Clone)]
pub struct PersistenceController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    location: StoreLocation,
    pool: RwLock<SqlitePool>,
}

impl PersistenceController {
    /// Open (creating if absent) the store inside `data_dir`.
    ///
    /// An unreadable store file triggers destructive recovery: the damaged
    /// file is moved aside and an empty store is created in its place.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let db_path = data_dir.join(STORE_FILENAME);
        let pool = open_or_rebuild(&db_path).await?;

        Ok(Self {
            inner: Arc::new(ControllerInner {
                location: StoreLocation::OnDisk { data_dir, db_path },
                pool: RwLock::new(pool),
            }),
        })
    }

    /// Open an ephemeral store that exists only in memory.
    ///
    /// Each controller gets its own uniquely named database; nothing is
    /// shared between instances and nothing survives drop.
    pub async fn in_memory() -> Result<Self> {
        let name = format!("notekeep-{}", Uuid::new_v4().simple());
        let pool = create_memory_pool(&name).await?;

        Ok(Self {
            inner: Arc::new(ControllerInner {
                location: StoreLocation::InMemory { name },
                pool: RwLock::new(pool),
            }),
        })
    }

    /// The current application pool.
    ///
    /// After `restore` replaces the store, previously built repositories
    /// keep the old pool; construct new ones from this method.
    pub async fn pool(&self) -> SqlitePool {
        self.inner.pool.read().await.clone()
    }

    /// Data directory backing this store, if it is on disk
    pub fn data_dir(&self) -> Option<&Path> {
        match &self.inner.location {
            StoreLocation::OnDisk { data_dir, .. } => Some(data_dir),
            StoreLocation::InMemory { .. } => None,
        }
    }

    /// Path of the store file, if it is on disk
    pub fn db_path(&self) -> Option<&Path> {
        match &self.inner.location {
            StoreLocation::OnDisk { db_path, .. } => Some(db_path),
            StoreLocation::InMemory { .. } => None,
        }
    }

    /// Flush the WAL into the main store file.
    ///
    /// Transactions commit on their own; this only matters before
    /// file-level operations like backup, where the main file must hold
    /// everything committed so far.
    pub async fn checkpoint(&self) -> Result<()> {
        if matches!(self.inner.location, StoreLocation::InMemory { .. }) {
            return Ok(());
        }

        let pool = self.pool().await;
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&pool)
            .await?;

        tracing::debug!("WAL checkpoint complete");
        Ok(())
    }

    /// Create a secondary pool over the same store for bulk work.
    ///
    /// Writers here see only committed state from the main pool and vice
    /// versa; conflicting field edits resolve to the last commit. Bulk
    /// writers are expected to share one background pool rather than each
    /// creating their own.
    pub async fn background_pool(&self) -> Result<SqlitePool> {
        match &self.inner.location {
            StoreLocation::OnDisk { db_path, .. } => create_background_pool(db_path).await,
            StoreLocation::InMemory { name } => create_memory_background_pool(name).await,
        }
    }

    /// Close the application pool. In-flight operations finish first.
    pub async fn close(&self) {
        self.inner.pool.read().await.close().await;
        tracing::info!("Store closed");
    }

    /// Reopen the store after `close`, swapping in a fresh pool.
    pub(crate) async fn reopen(&self) -> Result<()> {
        match &self.inner.location {
            StoreLocation::OnDisk { db_path, .. } => {
                let new_pool = open_or_rebuild(db_path).await?;
                let mut slot = self.inner.pool.write().await;
                let old = std::mem::replace(&mut *slot, new_pool);
                old.close().await;
                tracing::info!("Store reopened");
                Ok(())
            }
            // Nothing on disk to reopen; the pool never went away.
            StoreLocation::InMemory { .. } => Ok(()),
        }
    }
}

async fn open_or_rebuild(db_path: &Path) -> Result<SqlitePool> {
    match open_verified(db_path).await {
        Ok(pool) => Ok(pool),
        Err(cause @ (AppError::Database(_) | AppError::Corruption(_))) => {
            rebuild_store(db_path, cause).await
        }
        Err(e) => Err(e),
    }
}

async fn open_verified(db_path: &Path) -> Result<SqlitePool> {
    let pool = create_pool(db_path).await?;

    let verdict: String = sqlx::query_scalar("PRAGMA integrity_check")
        .fetch_one(&pool)
        .await?;

    if verdict != "ok" {
        pool.close().await;
        return Err(AppError::Corruption(format!(
            "integrity check failed: {verdict}"
        )));
    }

    Ok(pool)
}

/// Destructive last resort: move the damaged store aside and start empty.
async fn rebuild_store(db_path: &Path, cause: AppError) -> Result<SqlitePool> {
    tracing::error!(
        "Store at {:?} is unreadable, rebuilding from scratch. ALL DATA IN THE DAMAGED FILE IS BEING SET ASIDE. Cause: {}",
        db_path,
        cause
    );

    if db_path.exists() {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let aside = db_path.with_file_name(format!("{STORE_FILENAME}.corrupt_{timestamp}"));
        std::fs::rename(db_path, &aside)?;
        tracing::warn!("Damaged store file moved to {:?}", aside);
    }

    for suffix in ["-wal", "-shm"] {
        let sibling = sibling_path(db_path, suffix);
        if sibling.exists() {
            let _ = std::fs::remove_file(&sibling);
        }
    }

    create_pool(db_path).await
}

pub(crate) fn sibling_path(db_path: &Path, suffix: &str) -> PathBuf {
    let mut name = db_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(suffix);
    db_path.with_file_name(name)
}
