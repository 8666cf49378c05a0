//! Folder store
//!
//! Folders only group things; deleting one never deletes its contents.
//! The collection is published sorted by name.

use super::StoreEvent;
use crate::config::EVENT_CHANNEL_CAPACITY;
use crate::database::{Folder, Repository};
use crate::error::{AppError, Result};
use crate::services::{ErrorReporter, TracingReporter};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Store for managing folders
#[derive(Clone)]
pub struct FolderStore {
    repo: Repository,
    snapshot: Arc<RwLock<Vec<Folder>>>,
    events: broadcast::Sender<StoreEvent>,
    reporter: Arc<dyn ErrorReporter>,
}

impl FolderStore {
    pub fn new(repo: Repository) -> Self {
        Self::with_reporter(repo, Arc::new(TracingReporter))
    }

    pub fn with_reporter(repo: Repository, reporter: Arc<dyn ErrorReporter>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            repo,
            snapshot: Arc::new(RwLock::new(Vec::new())),
            events,
            reporter,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> Vec<Folder> {
        self.snapshot.read().await.clone()
    }

    /// Reload the collection from storage and return it, sorted by name
    pub async fn load_all(&self) -> Result<Vec<Folder>> {
        self.reload().await
    }

    /// Create a folder. Name uniqueness is an app convention, not enforced.
    pub async fn create(&self, name: String) -> Result<Folder> {
        tracing::info!("Creating folder: {}", name);

        let folder = Folder::new(name);
        self.apply(&folder, "create folder").await?;

        Ok(folder)
    }

    /// Rename an existing folder
    pub async fn rename(&self, mut folder: Folder, name: String) -> Result<Folder> {
        tracing::debug!("Renaming folder {} to: {}", folder.id, name);

        folder.name = name;
        self.apply(&folder, "rename folder").await?;

        Ok(folder)
    }

    /// Delete folders by id; contained notes and checklists survive with
    /// their folder reference cleared
    pub async fn delete(&self, ids: &[String]) -> Result<()> {
        tracing::info!("Deleting {} folder(s)", ids.len());

        if let Err(e) = self.repo.delete_folders(ids).await {
            self.report(&e, "delete folders");
            return Err(e);
        }

        self.reload().await?;
        self.publish();
        Ok(())
    }

    async fn apply(&self, folder: &Folder, context: &str) -> Result<()> {
        if let Err(e) = self.repo.upsert_folder(folder).await {
            self.report(&e, context);
            return Err(e);
        }

        self.reload().await?;
        self.publish();
        Ok(())
    }

    async fn reload(&self) -> Result<Vec<Folder>> {
        let folders = match self.repo.list_folders().await {
            Ok(folders) => folders,
            Err(e) => {
                self.report(&e, "reload folders");
                return Err(e);
            }
        };

        *self.snapshot.write().await = folders.clone();
        Ok(folders)
    }

    fn publish(&self) {
        let _ = self.events.send(StoreEvent::FoldersChanged);
    }

    fn report(&self, error: &AppError, context: &str) {
        self.reporter.report(error, context);
    }
}
