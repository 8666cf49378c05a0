//! Note store
//!
//! High-level operations for notes: create with defaults, update with a
//! refreshed timestamp, batched delete, pin toggling. Publishes a full
//! snapshot after every mutation and feeds the id-keyed cache.

use super::StoreEvent;
use crate::cache::NoteCache;
use crate::config::EVENT_CHANNEL_CAPACITY;
use crate::database::{Note, Repository};
use crate::error::{AppError, Result};
use crate::services::{ErrorReporter, TracingReporter};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Store for managing notes
#[derive(Clone)]
pub struct NoteStore {
    repo: Repository,
    snapshot: Arc<RwLock<Vec<Note>>>,
    cache: Arc<NoteCache>,
    events: broadcast::Sender<StoreEvent>,
    reporter: Arc<dyn ErrorReporter>,
}

impl NoteStore {
    pub fn new(repo: Repository) -> Self {
        Self::with_reporter(repo, Arc::new(TracingReporter))
    }

    pub fn with_reporter(repo: Repository, reporter: Arc<dyn ErrorReporter>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            repo,
            snapshot: Arc::new(RwLock::new(Vec::new())),
            cache: Arc::new(NoteCache::new()),
            events,
            reporter,
        }
    }

    /// Subscribe to change events. Observers read snapshots afterwards.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Last published snapshot, without touching storage
    pub async fn snapshot(&self) -> Vec<Note> {
        self.snapshot.read().await.clone()
    }

    /// Single note by id from the cache backing the snapshot
    pub async fn get(&self, id: &str) -> Option<Note> {
        self.cache.get(id).await
    }

    /// Reload the collection from storage and return it, newest first
    pub async fn load_all(&self) -> Result<Vec<Note>> {
        self.reload().await
    }

    /// Create a note with the given fields and defaults for the rest
    pub async fn create(
        &self,
        title: String,
        content: String,
        folder_id: Option<String>,
    ) -> Result<Note> {
        tracing::info!("Creating new note: {}", title);

        let mut note = Note::new(title, content);
        note.folder_id = folder_id;

        self.apply(&note, "create note").await?;

        tracing::info!("Note created successfully: {}", note.id);
        Ok(note)
    }

    /// Persist an edited note; `date` is refreshed to now
    pub async fn update(&self, mut note: Note) -> Result<Note> {
        tracing::debug!("Updating note: {}", note.id);

        note.date = Utc::now();
        self.apply(&note, "update note").await?;

        Ok(note)
    }

    /// Flip the pinned flag through the regular update path
    pub async fn toggle_pin(&self, mut note: Note) -> Result<Note> {
        note.is_pinned = !note.is_pinned;
        self.update(note).await
    }

    /// Delete notes by id. Unknown ids are tolerated; the caller's view
    /// may be stale.
    pub async fn delete(&self, ids: &[String]) -> Result<()> {
        tracing::info!("Deleting {} note(s)", ids.len());

        if let Err(e) = self.repo.delete_notes(ids).await {
            self.report(&e, "delete notes");
            return Err(e);
        }

        self.reload().await?;
        self.publish();
        Ok(())
    }

    async fn apply(&self, note: &Note, context: &str) -> Result<()> {
        if let Err(e) = self.repo.upsert_note(note).await {
            self.report(&e, context);
            return Err(e);
        }

        self.reload().await?;
        self.publish();
        Ok(())
    }

    async fn reload(&self) -> Result<Vec<Note>> {
        let notes = match self.repo.list_notes().await {
            Ok(notes) => notes,
            Err(e) => {
                self.report(&e, "reload notes");
                return Err(e);
            }
        };

        self.cache.replace(&notes).await;
        *self.snapshot.write().await = notes.clone();
        Ok(notes)
    }

    fn publish(&self) {
        let _ = self.events.send(StoreEvent::NotesChanged);
    }

    fn report(&self, error: &AppError, context: &str) {
        self.reporter.report(error, context);
    }
}
