//! Repository layer for database operations
//!
//! One entity family per method group: notes, checklists, folders, tags.
//! Every mutation runs in a transaction through the mapping layer, and
//! transient lock contention is retried once before the error surfaces.
//!
//! Deletes are batched (single statement for any number of ids) and
//! tolerate unknown identifiers: the caller's snapshot may be stale, so a
//! missing row is a no-op, not an error.

use super::mapping::{self, ChecklistItemRow, ChecklistRow, FolderRow, NoteRow, TagRow};
use super::models::{ChecklistNote, Folder, Note, Tag};
use crate::error::Result;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::future::Future;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ===== Notes =====

    /// Load every note, newest first
    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        let rows: Vec<NoteRow> = sqlx::query_as("SELECT * FROM notes ORDER BY date DESC")
            .fetch_all(&self.pool)
            .await?;

        let mut tag_map = self.load_tag_links("note_tags", "note_id").await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let tag_ids = tag_map.remove(&row.id).unwrap_or_default();
                mapping::note_to_domain(row, tag_ids)
            })
            .collect())
    }

    /// Get a single note by id
    pub async fn get_note(&self, id: &str) -> Result<Option<Note>> {
        let row: Option<NoteRow> = sqlx::query_as("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let tag_ids: Vec<String> =
            sqlx::query_scalar("SELECT tag_id FROM note_tags WHERE note_id = ? ORDER BY position")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;

        Ok(Some(mapping::note_to_domain(row, tag_ids)))
    }

    /// Insert-or-update a note by id
    pub async fn upsert_note(&self, note: &Note) -> Result<()> {
        retry_once("upsert note", || self.try_upsert_note(note)).await
    }

    async fn try_upsert_note(&self, note: &Note) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        mapping::upsert_note(&mut tx, note).await?;
        tx.commit().await?;

        tracing::debug!("Upserted note: {}", note.id);
        Ok(())
    }

    /// Delete notes by id; unknown ids are skipped
    pub async fn delete_notes(&self, ids: &[String]) -> Result<u64> {
        retry_once("delete notes", || self.try_delete("notes", ids)).await
    }

    // ===== Checklists =====

    /// Load every checklist with its items, newest first
    pub async fn list_checklists(&self) -> Result<Vec<ChecklistNote>> {
        let rows: Vec<ChecklistRow> = sqlx::query_as("SELECT * FROM checklists ORDER BY date DESC")
            .fetch_all(&self.pool)
            .await?;

        let item_rows: Vec<ChecklistItemRow> =
            sqlx::query_as("SELECT * FROM checklist_items ORDER BY checklist_id, position")
                .fetch_all(&self.pool)
                .await?;

        let mut items_by_parent: HashMap<String, Vec<ChecklistItemRow>> = HashMap::new();
        for item in item_rows {
            items_by_parent
                .entry(item.checklist_id.clone())
                .or_default()
                .push(item);
        }

        let mut tag_map = self.load_tag_links("checklist_tags", "checklist_id").await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = items_by_parent.remove(&row.id).unwrap_or_default();
                let tag_ids = tag_map.remove(&row.id).unwrap_or_default();
                mapping::checklist_to_domain(row, items, tag_ids)
            })
            .collect())
    }

    /// Insert-or-update a checklist by id, replacing its owned items
    pub async fn upsert_checklist(&self, checklist: &ChecklistNote) -> Result<()> {
        retry_once("upsert checklist", || self.try_upsert_checklist(checklist)).await
    }

    async fn try_upsert_checklist(&self, checklist: &ChecklistNote) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        mapping::upsert_checklist(&mut tx, checklist).await?;
        tx.commit().await?;

        tracing::debug!("Upserted checklist: {}", checklist.id);
        Ok(())
    }

    /// Delete checklists by id; owned items cascade away with their parent
    pub async fn delete_checklists(&self, ids: &[String]) -> Result<u64> {
        retry_once("delete checklists", || self.try_delete("checklists", ids)).await
    }

    // ===== Folders =====

    /// Load every folder, sorted by name
    pub async fn list_folders(&self) -> Result<Vec<Folder>> {
        let rows: Vec<FolderRow> = sqlx::query_as("SELECT * FROM folders ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(mapping::folder_to_domain).collect())
    }

    /// Insert-or-update a folder by id
    pub async fn upsert_folder(&self, folder: &Folder) -> Result<()> {
        retry_once("upsert folder", || self.try_upsert_folder(folder)).await
    }

    async fn try_upsert_folder(&self, folder: &Folder) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        mapping::upsert_folder(&mut tx, folder).await?;
        tx.commit().await?;

        tracing::debug!("Upserted folder: {}", folder.id);
        Ok(())
    }

    /// Delete folders by id. Notes and checklists inside keep existing;
    /// their folder reference is nulled by the schema's deletion rule.
    pub async fn delete_folders(&self, ids: &[String]) -> Result<u64> {
        retry_once("delete folders", || self.try_delete("folders", ids)).await
    }

    // ===== Tags =====

    /// Load every tag, sorted by name
    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        let rows: Vec<TagRow> = sqlx::query_as("SELECT * FROM tags ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(mapping::tag_to_domain).collect())
    }

    /// Insert-or-update a tag by id
    pub async fn upsert_tag(&self, tag: &Tag) -> Result<()> {
        retry_once("upsert tag", || self.try_upsert_tag(tag)).await
    }

    async fn try_upsert_tag(&self, tag: &Tag) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        mapping::upsert_tag(&mut tx, tag).await?;
        tx.commit().await?;

        tracing::debug!("Upserted tag: {}", tag.id);
        Ok(())
    }

    /// Delete tags by id. Tagged notes and checklists keep existing; the
    /// association rows go away with the tag.
    pub async fn delete_tags(&self, ids: &[String]) -> Result<u64> {
        retry_once("delete tags", || self.try_delete("tags", ids)).await
    }

    // ===== Shared =====

    async fn try_delete(&self, table: &str, ids: &[String]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("DELETE FROM {table} WHERE id IN ({placeholders})");

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let rows = query.execute(&self.pool).await?.rows_affected();

        tracing::debug!("Deleted {} of {} requested rows from {}", rows, ids.len(), table);

        Ok(rows)
    }

    async fn load_tag_links(
        &self,
        table: &str,
        owner_column: &str,
    ) -> Result<HashMap<String, Vec<String>>> {
        let rows: Vec<(String, String)> = sqlx::query_as(&format!(
            "SELECT {owner_column}, tag_id FROM {table} ORDER BY {owner_column}, position"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (owner_id, tag_id) in rows {
            map.entry(owner_id).or_default().push(tag_id);
        }

        Ok(map)
    }
}

/// Retry a mutation once when it failed with a recoverable lock error.
///
/// A failure that survives the retry propagates as an infrastructure
/// error in release builds and aborts in debug builds.
async fn retry_once<T, F, Fut>(operation: &str, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let result = match f().await {
        Err(e) if e.is_retryable() => {
            tracing::warn!(
                "Recoverable database error during {}, retrying once: {}",
                operation,
                e
            );
            f().await
        }
        other => other,
    };

    result.map_err(|e| {
        tracing::error!("Database mutation '{}' failed: {}", operation, e);
        #[cfg(debug_assertions)]
        panic!("database mutation '{operation}' failed: {e}");
        #[cfg(not(debug_assertions))]
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{ChecklistItem, Priority, TagColor};
    use crate::database::schema::initialize_database;
    use chrono::{Duration, Utc};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_repo() -> Repository {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        Repository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_load_identity() {
        let repo = create_test_repo().await;

        let note = Note::new("Test Note", "body");
        repo.upsert_note(&note).await.unwrap();

        let notes = repo.list_notes().await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, note.id);
        assert_eq!(notes[0].title, "Test Note");
    }

    #[tokio::test]
    async fn test_round_trip_preserves_all_fields() {
        let repo = create_test_repo().await;

        let folder = Folder::new("Work");
        repo.upsert_folder(&folder).await.unwrap();
        let tag = Tag::new("urgent", TagColor::Red);
        repo.upsert_tag(&tag).await.unwrap();

        let mut note = Note::new("Round trip", "content here");
        note.folder_id = Some(folder.id.clone());
        note.tag_ids = vec![tag.id.clone()];
        note.is_pinned = true;
        note.priority = Priority::Medium;
        note.image_data = Some(vec![1, 2, 3]);
        note.attributed_content = Some(vec![9, 8, 7]);

        repo.upsert_note(&note).await.unwrap();

        let loaded = repo.get_note(&note.id).await.unwrap().unwrap();
        assert_eq!(loaded, note);
    }

    #[tokio::test]
    async fn test_delete_then_load() {
        let repo = create_test_repo().await;

        let note = Note::new("Doomed", "");
        repo.upsert_note(&note).await.unwrap();

        let removed = repo.delete_notes(&[note.id.clone()]).await.unwrap();
        assert_eq!(removed, 1);

        let notes = repo.list_notes().await.unwrap();
        assert!(notes.iter().all(|n| n.id != note.id));
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_noop() {
        let repo = create_test_repo().await;

        let note = Note::new("Survivor", "");
        repo.upsert_note(&note).await.unwrap();

        let removed = repo
            .delete_notes(&["does-not-exist".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert_eq!(repo.list_notes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_delete() {
        let repo = create_test_repo().await;

        let mut ids = Vec::new();
        for i in 0..5 {
            let note = Note::new(format!("Note {}", i), "");
            repo.upsert_note(&note).await.unwrap();
            ids.push(note.id);
        }

        let removed = repo.delete_notes(&ids[..3]).await.unwrap();
        assert_eq!(removed, 3);
        assert_eq!(repo.list_notes().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_notes_sorted_by_date_descending() {
        let repo = create_test_repo().await;

        let base = Utc::now();
        for (title, offset) in [("oldest", 2), ("middle", 1), ("newest", 0)] {
            let mut note = Note::new(title, "");
            note.date = base - Duration::hours(offset);
            repo.upsert_note(&note).await.unwrap();
        }

        let titles: Vec<String> = repo
            .list_notes()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.title)
            .collect();

        assert_eq!(titles, vec!["newest", "middle", "oldest"]);
    }

    #[tokio::test]
    async fn test_checklists_sorted_by_date_descending() {
        let repo = create_test_repo().await;

        let base = Utc::now();
        for (title, offset) in [("stale", 3), ("fresh", 0), ("aging", 1)] {
            let mut checklist = ChecklistNote::new(title);
            checklist.date = base - Duration::hours(offset);
            repo.upsert_checklist(&checklist).await.unwrap();
        }

        let titles: Vec<String> = repo
            .list_checklists()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();

        assert_eq!(titles, vec!["fresh", "aging", "stale"]);
    }

    #[tokio::test]
    async fn test_folders_sorted_by_name() {
        let repo = create_test_repo().await;

        for name in ["Projects", "Archive", "Inbox"] {
            repo.upsert_folder(&Folder::new(name)).await.unwrap();
        }

        let names: Vec<String> = repo
            .list_folders()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();

        assert_eq!(names, vec!["Archive", "Inbox", "Projects"]);
    }

    #[tokio::test]
    async fn test_folder_delete_nullifies_references() {
        let repo = create_test_repo().await;

        let folder = Folder::new("Work");
        repo.upsert_folder(&folder).await.unwrap();

        let mut note = Note::new("A", "");
        note.folder_id = Some(folder.id.clone());
        repo.upsert_note(&note).await.unwrap();

        repo.delete_folders(&[folder.id.clone()]).await.unwrap();

        let notes = repo.list_notes().await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "A");
        assert_eq!(notes[0].folder_id, None);
    }

    #[tokio::test]
    async fn test_checklist_delete_cascades_items() {
        let repo = create_test_repo().await;

        let mut checklist = ChecklistNote::new("Chores");
        checklist.items = vec![
            ChecklistItem::new("one"),
            ChecklistItem::new("two"),
            ChecklistItem::new("three"),
        ];
        repo.upsert_checklist(&checklist).await.unwrap();

        repo.delete_checklists(&[checklist.id.clone()]).await.unwrap();

        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM checklist_items")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_tag_delete_nullifies_associations() {
        let repo = create_test_repo().await;

        let keep = Tag::new("keep", TagColor::Green);
        let doomed = Tag::new("doomed", TagColor::Red);
        repo.upsert_tag(&keep).await.unwrap();
        repo.upsert_tag(&doomed).await.unwrap();

        let mut note = Note::new("Tagged", "");
        note.tag_ids = vec![doomed.id.clone(), keep.id.clone()];
        repo.upsert_note(&note).await.unwrap();

        repo.delete_tags(&[doomed.id.clone()]).await.unwrap();

        let notes = repo.list_notes().await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].tag_ids, vec![keep.id.clone()]);
    }

    #[tokio::test]
    async fn test_checklist_items_load_in_order() {
        let repo = create_test_repo().await;

        let mut checklist = ChecklistNote::new("Ordered");
        checklist.items = vec![
            ChecklistItem::new("alpha"),
            ChecklistItem::new("beta"),
            ChecklistItem::new("gamma"),
        ];
        repo.upsert_checklist(&checklist).await.unwrap();

        let loaded = repo.list_checklists().await.unwrap();
        let texts: Vec<&str> = loaded[0].items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha", "beta", "gamma"]);
    }
}
