//! Thread-safe in-memory note cache
//!
//! Keyed by note id, serialized through a single lock so concurrent
//! readers and writers never race. The canonical data always lives in
//! the persisted store; the cache is rebuilt from it on every reload.

use crate::database::Note;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct NoteCache {
    entries: RwLock<HashMap<String, Note>>,
}

impl NoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &str) -> Option<Note> {
        self.entries.read().await.get(id).cloned()
    }

    pub async fn insert(&self, note: Note) {
        self.entries.write().await.insert(note.id.clone(), note);
    }

    pub async fn remove(&self, id: &str) -> Option<Note> {
        self.entries.write().await.remove(id)
    }

    /// Swap the whole cache for a fresh snapshot in one critical section
    pub async fn replace(&self, notes: &[Note]) {
        let mut entries = self.entries.write().await;
        entries.clear();
        for note in notes {
            entries.insert(note.id.clone(), note.clone());
        }
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
