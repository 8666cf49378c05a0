//! Checklist store
//!
//! Same contract as the note store; the body of a checklist is its owned
//! item list, replaced wholesale on every save.

use super::StoreEvent;
use crate::config::EVENT_CHANNEL_CAPACITY;
use crate::database::{ChecklistItem, ChecklistNote, Repository};
use crate::error::{AppError, Result};
use crate::services::{ErrorReporter, TracingReporter};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Store for managing checklists
#[derive(Clone)]
pub struct ChecklistStore {
    repo: Repository,
    snapshot: Arc<RwLock<Vec<ChecklistNote>>>,
    events: broadcast::Sender<StoreEvent>,
    reporter: Arc<dyn ErrorReporter>,
}

impl ChecklistStore {
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

    pub async fn snapshot(&self) -> Vec<ChecklistNote> {
        self.snapshot.read().await.clone()
    }

    /// Reload the collection from storage and return it, newest first
    pub async fn load_all(&self) -> Result<Vec<ChecklistNote>> {
        self.reload().await
    }

    /// Create a checklist with the given fields and defaults for the rest
    pub async fn create(
        &self,
        title: String,
        folder_id: Option<String>,
        items: Vec<ChecklistItem>,
    ) -> Result<ChecklistNote> {
        tracing::info!("Creating new checklist: {}", title);

        let mut checklist = ChecklistNote::new(title);
        checklist.folder_id = folder_id;
        checklist.items = items;

        self.apply(&checklist, "create checklist").await?;

        tracing::info!("Checklist created successfully: {}", checklist.id);
        Ok(checklist)
    }

    /// Persist an edited checklist; `date` is refreshed to now
    pub async fn update(&self, mut checklist: ChecklistNote) -> Result<ChecklistNote> {
        tracing::debug!("Updating checklist: {}", checklist.id);

        checklist.date = Utc::now();
        self.apply(&checklist, "update checklist").await?;

        Ok(checklist)
    }

    /// Flip the pinned flag through the regular update path
    pub async fn toggle_pin(&self, mut checklist: ChecklistNote) -> Result<ChecklistNote> {
        checklist.is_pinned = !checklist.is_pinned;
        self.update(checklist).await
    }

    /// Delete checklists by id; their items go with them
    pub async fn delete(&self, ids: &[String]) -> Result<()> {
        tracing::info!("Deleting {} checklist(s)", ids.len());

        if let Err(e) = self.repo.delete_checklists(ids).await {
            self.report(&e, "delete checklists");
            return Err(e);
        }

        self.reload().await?;
        self.publish();
        Ok(())
    }

    async fn apply(&self, checklist: &ChecklistNote, context: &str) -> Result<()> {
        if let Err(e) = self.repo.upsert_checklist(checklist).await {
            self.report(&e, context);
            return Err(e);
        }

        self.reload().await?;
        self.publish();
        Ok(())
    }

    async fn reload(&self) -> Result<Vec<ChecklistNote>> {
        let checklists = match self.repo.list_checklists().await {
            Ok(checklists) => checklists,
            Err(e) => {
                self.report(&e, "reload checklists");
                return Err(e);
            }
        };

        *self.snapshot.write().await = checklists.clone();
        Ok(checklists)
    }

    fn publish(&self) {
        let _ = self.events.send(StoreEvent::ChecklistsChanged);
    }

    fn report(&self, error: &AppError, context: &str) {
        self.reporter.report(error, context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_store() -> ChecklistStore {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        ChecklistStore::new(Repository::new(pool))
    }

    #[tokio::test]
    async fn test_create_with_items() {
        let store = create_test_store().await;

        let items = vec![
            ChecklistItem::new("milk"),
            ChecklistItem::new("eggs"),
            ChecklistItem::new("bread"),
        ];
        let checklist = store
            .create("Groceries".to_string(), None, items)
            .await
            .unwrap();

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, checklist.id);
        assert_eq!(snapshot[0].items.len(), 3);
    }

    #[tokio::test]
    async fn test_update_replaces_items() {
        let store = create_test_store().await;

        let checklist = store
            .create(
                "Chores".to_string(),
                None,
                vec![
                    ChecklistItem::new("one"),
                    ChecklistItem::new("two"),
                    ChecklistItem::new("three"),
                ],
            )
            .await
            .unwrap();
        let original_ids: Vec<String> =
            checklist.items.iter().map(|i| i.id.clone()).collect();

        let mut edited = checklist;
        edited.items = vec![ChecklistItem::new("four"), ChecklistItem::new("five")];
        store.update(edited).await.unwrap();

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot[0].items.len(), 2);
        for item in &snapshot[0].items {
            assert!(!original_ids.contains(&item.id));
        }
    }

    #[tokio::test]
    async fn test_double_toggle_restores_pin_state() {
        let store = create_test_store().await;

        let checklist = store
            .create("Pin me".to_string(), None, Vec::new())
            .await
            .unwrap();

        let pinned = store.toggle_pin(checklist).await.unwrap();
        assert!(pinned.is_pinned);

        let unpinned = store.toggle_pin(pinned).await.unwrap();
        assert!(!unpinned.is_pinned);
    }

    #[tokio::test]
    async fn test_delete_broadcasts_event() {
        let store = create_test_store().await;

        let checklist = store
            .create("Doomed".to_string(), None, Vec::new())
            .await
            .unwrap();

        let mut events = store.subscribe();
        store.delete(&[checklist.id]).await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            StoreEvent::ChecklistsChanged
        );
        assert!(store.snapshot().await.is_empty());
    }
}
