//! Bulk import service
//!
//! Imports a whole JSON document of folders, tags, notes, and checklists
//! in one background pass. The work runs on the store's background pool,
//! committing independently of the main context; progress is reported
//! through the task collaborator. References inside the document follow
//! the usual rule: what does not resolve is dropped, not an error.

use super::tasks::{TaskHandle, TaskQueue};
use crate::database::{ChecklistNote, Folder, Note, Repository, Tag};
use crate::error::Result;
use crate::persistence::PersistenceController;
use serde::{Deserialize, Serialize};

/// Everything one import brings in. All sections are optional.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ImportDocument {
    #[serde(default)]
    pub folders: Vec<Folder>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub checklists: Vec<ChecklistNote>,
}

impl ImportDocument {
    pub fn record_count(&self) -> usize {
        self.folders.len() + self.tags.len() + self.notes.len() + self.checklists.len()
    }
}

/// Import service
#[derive(Clone)]
pub struct ImportService {
    controller: PersistenceController,
    tasks: TaskQueue,
}

impl ImportService {
    pub fn new(controller: PersistenceController, tasks: TaskQueue) -> Self {
        Self { controller, tasks }
    }

    /// Parse a JSON document and submit the import as a background task
    pub async fn import_json(&self, json: &str) -> Result<TaskHandle> {
        let document: ImportDocument = serde_json::from_str(json)?;
        self.import_document(document).await
    }

    /// Submit an already-parsed document as a background task.
    ///
    /// Folders and tags land first so the notes and checklists that
    /// reference them resolve.
    pub async fn import_document(&self, document: ImportDocument) -> Result<TaskHandle> {
        let pool = self.controller.background_pool().await?;
        let total = document.record_count();

        tracing::info!("Starting import of {} records", total);

        Ok(self.tasks.submit("import", move |progress| async move {
            let repo = Repository::new(pool);
            let mut done = 0usize;
            let total = total.max(1);

            for folder in &document.folders {
                repo.upsert_folder(folder).await?;
                done += 1;
                progress.report(done as f64 / total as f64);
            }

            for tag in &document.tags {
                repo.upsert_tag(tag).await?;
                done += 1;
                progress.report(done as f64 / total as f64);
            }

            for note in &document.notes {
                repo.upsert_note(note).await?;
                done += 1;
                progress.report(done as f64 / total as f64);
            }

            for checklist in &document.checklists {
                repo.upsert_checklist(checklist).await?;
                done += 1;
                progress.report(done as f64 / total as f64);
            }

            progress.report(1.0);
            tracing::info!("Import complete: {} records", done);

            Ok(())
        }))
    }
}
