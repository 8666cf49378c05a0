//! Backup service
//!
//! File-level snapshots of the store. A backup is a checkpointed copy of
//! the SQLite file, named with a sortable timestamp and paired with a
//! SHA-256 checksum sidecar. Restore swaps the live file for a verified
//! snapshot and reopens the store; the controller never stays closed even
//! when the swap itself fails.

use crate::config::{
    BACKUPS_DIR_NAME, BACKUP_FILE_EXTENSION, BACKUP_FILE_PREFIX, BACKUP_RETENTION_COUNT,
    BACKUP_TIMESTAMP_FORMAT, STORE_FILENAME,
};
use crate::error::{AppError, Result};
use crate::persistence::{sibling_path, PersistenceController};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;

/// One backup snapshot on disk
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub created: DateTime<Utc>,
}

/// Backup service
#[derive(Clone)]
pub struct BackupService {
    controller: PersistenceController,
}

impl BackupService {
    pub fn new(controller: PersistenceController) -> Self {
        Self { controller }
    }

    /// Snapshot the store into the backups directory.
    ///
    /// The WAL is checkpointed first so the main file holds everything
    /// committed so far; the copy lands via temp-write-then-rename.
    pub async fn create_backup(&self) -> Result<PathBuf> {
        let (db_path, backups_dir) = self.disk_paths()?;

        tracing::info!("Creating backup");

        self.controller.checkpoint().await?;
        fs::create_dir_all(&backups_dir).await?;

        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT);
        let filename = format!("{BACKUP_FILE_PREFIX}{timestamp}.{BACKUP_FILE_EXTENSION}");
        let backup_path = backups_dir.join(&filename);

        let data = fs::read(&db_path).await?;
        let checksum = calculate_checksum(&data);

        let temp_path = backup_path.with_extension("tmp");
        fs::write(&temp_path, &data).await?;
        fs::rename(&temp_path, &backup_path).await?;
        fs::write(checksum_path(&backup_path), &checksum).await?;

        tracing::info!("Backup created: {:?} ({} bytes)", backup_path, data.len());

        self.apply_retention_policy().await?;

        Ok(backup_path)
    }

    /// List available backups, newest first
    pub async fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        let (_, backups_dir) = self.disk_paths()?;

        if !backups_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        let mut entries = fs::read_dir(&backups_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !is_backup_name(name) {
                continue;
            }

            let metadata = entry.metadata().await?;
            // Creation time is unavailable on some filesystems
            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            backups.push(BackupInfo {
                name: name.to_string(),
                path: path.clone(),
                size: metadata.len(),
                created,
            });
        }

        backups.sort_by(|a, b| b.created.cmp(&a.created).then(b.name.cmp(&a.name)));

        Ok(backups)
    }

    /// Delete exactly the named backup and its checksum sidecar.
    /// A missing file is a no-op; the caller's listing may be stale.
    pub async fn delete_backup(&self, name: &str) -> Result<()> {
        let (_, backups_dir) = self.disk_paths()?;
        let backup_path = backups_dir.join(validate_backup_name(name)?);

        if backup_path.exists() {
            fs::remove_file(&backup_path).await?;
            tracing::info!("Deleted backup: {}", name);
        }

        let sidecar = checksum_path(&backup_path);
        if sidecar.exists() {
            let _ = fs::remove_file(&sidecar).await;
        }

        Ok(())
    }

    /// Replace the live store with the named backup.
    ///
    /// The store is closed for the swap and reopened afterwards no matter
    /// how the swap went, so the application is never left without an
    /// open store. The pre-restore file is kept next to the store until
    /// the copy has landed.
    pub async fn restore_backup(&self, name: &str) -> Result<()> {
        let (db_path, backups_dir) = self.disk_paths()?;
        let backup_path = backups_dir.join(validate_backup_name(name)?);

        if !backup_path.exists() {
            return Err(AppError::Restore(format!("backup not found: {name}")));
        }

        self.verify_checksum(&backup_path).await?;

        tracing::info!("Restoring from backup: {:?}", backup_path);

        self.controller.checkpoint().await?;
        self.controller.close().await;

        let aside = db_path.with_file_name(format!("{STORE_FILENAME}.pre_restore"));
        let mut moved_aside = false;
        if db_path.exists() {
            fs::rename(&db_path, &aside).await?;
            moved_aside = true;
        }

        for suffix in ["-wal", "-shm"] {
            let sibling = sibling_path(&db_path, suffix);
            if sibling.exists() {
                let _ = fs::remove_file(&sibling).await;
            }
        }

        let copy_result = fs::copy(&backup_path, &db_path).await;

        if copy_result.is_err() && moved_aside {
            // Put the previous store back so reopen has something to open
            let _ = fs::rename(&aside, &db_path).await;
        }

        // Reopen unconditionally; a closed store is the one unacceptable
        // end state here.
        let reopen_result = self.controller.reopen().await;

        copy_result?;
        reopen_result?;

        if moved_aside && aside.exists() {
            let _ = fs::remove_file(&aside).await;
        }

        tracing::info!("Restore completed successfully");

        Ok(())
    }

    /// Keep only the newest N backup files
    async fn apply_retention_policy(&self) -> Result<()> {
        let backups = self.list_backups().await?;

        if backups.len() <= BACKUP_RETENTION_COUNT {
            return Ok(());
        }

        for backup in backups.iter().skip(BACKUP_RETENTION_COUNT) {
            tracing::info!("Deleting old backup: {}", backup.name);

            if let Err(e) = fs::remove_file(&backup.path).await {
                tracing::warn!("Failed to delete backup file {:?}: {}", backup.path, e);
            }
            let sidecar = checksum_path(&backup.path);
            if sidecar.exists() {
                let _ = fs::remove_file(&sidecar).await;
            }
        }

        Ok(())
    }

    async fn verify_checksum(&self, backup_path: &Path) -> Result<()> {
        let sidecar = checksum_path(backup_path);
        if !sidecar.exists() {
            tracing::warn!("No checksum sidecar for {:?}, skipping verification", backup_path);
            return Ok(());
        }

        let expected = fs::read_to_string(&sidecar).await?;
        let data = fs::read(backup_path).await?;
        let actual = calculate_checksum(&data);

        if actual != expected.trim() {
            return Err(AppError::Restore(format!(
                "checksum mismatch for {:?}: expected {}, got {}",
                backup_path,
                expected.trim(),
                actual
            )));
        }

        Ok(())
    }

    fn disk_paths(&self) -> Result<(PathBuf, PathBuf)> {
        let db_path = self
            .controller
            .db_path()
            .ok_or_else(|| AppError::Backup("in-memory store has no backing file".to_string()))?;
        let backups_dir = self
            .controller
            .data_dir()
            .expect("on-disk store always has a data dir")
            .join(BACKUPS_DIR_NAME);

        Ok((db_path.to_path_buf(), backups_dir))
    }
}

fn is_backup_name(name: &str) -> bool {
    name.starts_with(BACKUP_FILE_PREFIX)
        && name.ends_with(&format!(".{BACKUP_FILE_EXTENSION}"))
}

fn validate_backup_name(name: &str) -> Result<&str> {
    if !is_backup_name(name) || name.contains('/') || name.contains('\\') {
        return Err(AppError::Backup(format!("invalid backup name: {name}")));
    }
    Ok(name)
}

fn checksum_path(backup_path: &Path) -> PathBuf {
    let mut name = backup_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".sha256");
    backup_path.with_file_name(name)
}

fn calculate_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Note, Repository};
    use tempfile::TempDir;

    async fn create_test_service() -> (BackupService, PersistenceController, TempDir) {
        let temp = TempDir::new().unwrap();
        let controller = PersistenceController::open(temp.path()).await.unwrap();
        let service = BackupService::new(controller.clone());
        (service, controller, temp)
    }

    #[tokio::test]
    async fn test_create_backup_names_and_sidecar() {
        let (service, controller, _temp) = create_test_service().await;

        let repo = Repository::new(controller.pool().await);
        repo.upsert_note(&Note::new("Backed up", "")).await.unwrap();

        let backup_path = service.create_backup().await.unwrap();

        assert!(backup_path.exists());
        let name = backup_path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(BACKUP_FILE_PREFIX));
        assert!(name.ends_with(".sqlite"));
        assert!(checksum_path(&backup_path).exists());
    }

    #[tokio::test]
    async fn test_list_backups_newest_first() {
        let (service, _controller, _temp) = create_test_service().await;

        // Fabricate snapshots with distinct names; creation order gives
        // distinct timestamps on filesystems with coarse clocks too.
        let (_, backups_dir) = service.disk_paths().unwrap();
        fs::create_dir_all(&backups_dir).await.unwrap();
        for stamp in ["20240101_000000", "20240102_000000"] {
            let path = backups_dir.join(format!("backup_{stamp}.sqlite"));
            fs::write(&path, b"snapshot").await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        let backups = service.list_backups().await.unwrap();
        assert_eq!(backups.len(), 2);
        assert!(backups[0].created >= backups[1].created);
    }

    #[tokio::test]
    async fn test_delete_backup_removes_exactly_one() {
        let (service, _controller, _temp) = create_test_service().await;

        let first = service.create_backup().await.unwrap();
        let first_name = first.file_name().unwrap().to_string_lossy().to_string();

        let (_, backups_dir) = service.disk_paths().unwrap();
        let other = backups_dir.join("backup_19990101_000000.sqlite");
        fs::write(&other, b"old snapshot").await.unwrap();

        service.delete_backup(&first_name).await.unwrap();

        assert!(!first.exists());
        assert!(other.exists());
    }

    #[tokio::test]
    async fn test_delete_missing_backup_is_noop() {
        let (service, _controller, _temp) = create_test_service().await;
        service.create_backup().await.unwrap();

        service
            .delete_backup("backup_19700101_000000.sqlite")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_rejects_path_traversal() {
        let (service, _controller, _temp) = create_test_service().await;

        let result = service.delete_backup("../notekeep.sqlite").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_restore_round_trip() {
        let (service, controller, _temp) = create_test_service().await;

        let repo = Repository::new(controller.pool().await);
        repo.upsert_note(&Note::new("Original", "")).await.unwrap();

        let backup_path = service.create_backup().await.unwrap();
        let backup_name = backup_path.file_name().unwrap().to_string_lossy().to_string();

        repo.upsert_note(&Note::new("After backup", "")).await.unwrap();
        assert_eq!(repo.list_notes().await.unwrap().len(), 2);

        service.restore_backup(&backup_name).await.unwrap();

        // The swap replaced the store file; build a repository on the
        // fresh pool.
        let repo = Repository::new(controller.pool().await);
        let notes = repo.list_notes().await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Original");
    }

    #[tokio::test]
    async fn test_restore_unknown_backup_fails_but_store_stays_open() {
        let (service, controller, _temp) = create_test_service().await;

        let repo = Repository::new(controller.pool().await);
        repo.upsert_note(&Note::new("Still here", "")).await.unwrap();

        let result = service.restore_backup("backup_20000101_000000.sqlite").await;
        assert!(result.is_err());

        assert_eq!(repo.list_notes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_restore_detects_tampering() {
        let (service, _controller, _temp) = create_test_service().await;

        let backup_path = service.create_backup().await.unwrap();
        let backup_name = backup_path.file_name().unwrap().to_string_lossy().to_string();

        let mut data = fs::read(&backup_path).await.unwrap();
        data[16] ^= 0xFF;
        fs::write(&backup_path, &data).await.unwrap();

        let result = service.restore_backup(&backup_name).await;
        assert!(matches!(result, Err(AppError::Restore(_))));
    }

    #[tokio::test]
    async fn test_retention_policy_prunes_oldest() {
        let (service, _controller, _temp) = create_test_service().await;

        let (_, backups_dir) = service.disk_paths().unwrap();
        fs::create_dir_all(&backups_dir).await.unwrap();
        for i in 0..(BACKUP_RETENTION_COUNT + 2) {
            let path = backups_dir.join(format!("backup_2024010{}_00000{}.sqlite", i % 9, i));
            fs::write(&path, b"snapshot").await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        service.create_backup().await.unwrap();

        let backups = service.list_backups().await.unwrap();
        assert_eq!(backups.len(), BACKUP_RETENTION_COUNT);
    }

    #[tokio::test]
    async fn test_backup_requires_on_disk_store() {
        let controller = PersistenceController::in_memory().await.unwrap();
        let service = BackupService::new(controller);

        let result = service.create_backup().await;
        assert!(matches!(result, Err(AppError::Backup(_))));
    }
}
