//! Tag store
//!
//! Tags are shared across notes and checklists; deleting one removes the
//! associations, never the tagged items. Published sorted by name.

use super::StoreEvent;
use crate::config::EVENT_CHANNEL_CAPACITY;
use crate::database::{Repository, Tag, TagColor};
use crate::error::{AppError, Result};
use crate::services::{ErrorReporter, TracingReporter};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Store for managing tags
#[derive(Clone)]
pub struct TagStore {
    repo: Repository,
    snapshot: Arc<RwLock<Vec<Tag>>>,
    events: broadcast::Sender<StoreEvent>,
    reporter: Arc<dyn ErrorReporter>,
}

impl TagStore {
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

    pub async fn snapshot(&self) -> Vec<Tag> {
        self.snapshot.read().await.clone()
    }

    /// Reload the collection from storage and return it, sorted by name
    pub async fn load_all(&self) -> Result<Vec<Tag>> {
        self.reload().await
    }

    pub async fn create(&self, name: String, color: TagColor) -> Result<Tag> {
        tracing::info!("Creating tag: {}", name);

        let tag = Tag::new(name, color);
        self.apply(&tag, "create tag").await?;

        Ok(tag)
    }

    /// Persist an edited tag (rename or recolor)
    pub async fn update(&self, tag: Tag) -> Result<Tag> {
        tracing::debug!("Updating tag: {}", tag.id);

        self.apply(&tag, "update tag").await?;
        Ok(tag)
    }

    /// Delete tags by id; tagged notes and checklists keep existing
    pub async fn delete(&self, ids: &[String]) -> Result<()> {
        tracing::info!("Deleting {} tag(s)", ids.len());

        if let Err(e) = self.repo.delete_tags(ids).await {
            self.report(&e, "delete tags");
            return Err(e);
        }

        self.reload().await?;
        self.publish();
        Ok(())
    }

    async fn apply(&self, tag: &Tag, context: &str) -> Result<()> {
        if let Err(e) = self.repo.upsert_tag(tag).await {
            self.report(&e, context);
            return Err(e);
        }

        self.reload().await?;
        self.publish();
        Ok(())
    }

    async fn reload(&self) -> Result<Vec<Tag>> {
        let tags = match self.repo.list_tags().await {
            Ok(tags) => tags,
            Err(e) => {
                self.report(&e, "reload tags");
                return Err(e);
            }
        };

        *self.snapshot.write().await = tags.clone();
        Ok(tags)
    }

    fn publish(&self) {
        let _ = self.events.send(StoreEvent::TagsChanged);
    }

    fn report(&self, error: &AppError, context: &str) {
        self.reporter.report(error, context);
    }
}
