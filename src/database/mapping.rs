//! Mapping between domain records and persisted rows
//!
//! The only place that knows both shapes. Domain → row is an upsert keyed
//! by the caller-assigned identifier: insert if absent, otherwise overwrite
//! every scalar column (last writer wins, no merging). Row → domain
//! flattens relationships into identifier lists.
//!
//! Dangling references are policy-absorbed here: a folder or tag id that
//! does not resolve against the current store is dropped silently, never
//! an error. Calling any upsert twice with the same record is idempotent.
//!
//! All functions take `&mut SqliteConnection` so the repository can compose
//! them inside a single transaction.

use super::models::{ChecklistItem, ChecklistNote, Folder, Note, Priority, Tag, TagColor};
use crate::error::Result;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};

// ===== Persisted rows =====

#[derive(Debug, FromRow)]
pub(crate) struct NoteRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub folder_id: Option<String>,
    pub is_pinned: bool,
    pub date: DateTime<Utc>,
    pub image_data: Option<Vec<u8>>,
    pub attributed_content: Option<Vec<u8>>,
    pub priority: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct ChecklistRow {
    pub id: String,
    pub title: String,
    pub folder_id: Option<String>,
    pub is_pinned: bool,
    pub date: DateTime<Utc>,
    pub priority: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct ChecklistItemRow {
    pub id: String,
    pub checklist_id: String,
    pub text: String,
    pub is_done: bool,
    #[allow(dead_code)]
    pub position: i64,
}

#[derive(Debug, FromRow)]
pub(crate) struct FolderRow {
    pub id: String,
    pub name: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct TagRow {
    pub id: String,
    pub name: String,
    pub color: String,
}

// ===== Row → domain =====

pub(crate) fn note_to_domain(row: NoteRow, tag_ids: Vec<String>) -> Note {
    Note {
        id: row.id,
        title: row.title,
        content: row.content,
        folder_id: row.folder_id,
        is_pinned: row.is_pinned,
        date: row.date,
        image_data: row.image_data,
        attributed_content: row.attributed_content,
        tag_ids,
        priority: Priority::from_key(&row.priority),
    }
}

pub(crate) fn checklist_to_domain(
    row: ChecklistRow,
    items: Vec<ChecklistItemRow>,
    tag_ids: Vec<String>,
) -> ChecklistNote {
    ChecklistNote {
        id: row.id,
        title: row.title,
        folder_id: row.folder_id,
        items: items
            .into_iter()
            .map(|item| ChecklistItem {
                id: item.id,
                text: item.text,
                is_done: item.is_done,
            })
            .collect(),
        is_pinned: row.is_pinned,
        date: row.date,
        tag_ids,
        priority: Priority::from_key(&row.priority),
    }
}

pub(crate) fn folder_to_domain(row: FolderRow) -> Folder {
    Folder {
        id: row.id,
        name: row.name,
    }
}

pub(crate) fn tag_to_domain(row: TagRow) -> Tag {
    Tag {
        id: row.id,
        name: row.name,
        color: TagColor::from_key(&row.color),
    }
}

// ===== Domain → row (upsert) =====

/// Insert-or-update a note by id, rewiring its folder and tag references.
pub(crate) async fn upsert_note(conn: &mut SqliteConnection, note: &Note) -> Result<()> {
    let folder_id = resolve_folder(conn, note.folder_id.as_deref()).await?;

    sqlx::query(
        r#"
        INSERT INTO notes (id, title, content, folder_id, is_pinned, date, image_data, attributed_content, priority)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            content = excluded.content,
            folder_id = excluded.folder_id,
            is_pinned = excluded.is_pinned,
            date = excluded.date,
            image_data = excluded.image_data,
            attributed_content = excluded.attributed_content,
            priority = excluded.priority
        "#,
    )
    .bind(&note.id)
    .bind(&note.title)
    .bind(&note.content)
    .bind(&folder_id)
    .bind(note.is_pinned)
    .bind(note.date)
    .bind(&note.image_data)
    .bind(&note.attributed_content)
    .bind(note.priority.as_str())
    .execute(&mut *conn)
    .await?;

    rewrite_tag_links(conn, "note_tags", "note_id", &note.id, &note.tag_ids).await?;

    Ok(())
}

/// Insert-or-update a checklist by id.
///
/// Owned items are replaced wholesale: the previous item rows are deleted
/// and fresh rows inserted from the record, preserving caller-issued item
/// identifiers and list order.
pub(crate) async fn upsert_checklist(
    conn: &mut SqliteConnection,
    checklist: &ChecklistNote,
) -> Result<()> {
    let folder_id = resolve_folder(conn, checklist.folder_id.as_deref()).await?;

    sqlx::query(
        r#"
        INSERT INTO checklists (id, title, folder_id, is_pinned, date, priority)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            folder_id = excluded.folder_id,
            is_pinned = excluded.is_pinned,
            date = excluded.date,
            priority = excluded.priority
        "#,
    )
    .bind(&checklist.id)
    .bind(&checklist.title)
    .bind(&folder_id)
    .bind(checklist.is_pinned)
    .bind(checklist.date)
    .bind(checklist.priority.as_str())
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM checklist_items WHERE checklist_id = ?")
        .bind(&checklist.id)
        .execute(&mut *conn)
        .await?;

    for (position, item) in checklist.items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO checklist_items (id, checklist_id, text, is_done, position) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&item.id)
        .bind(&checklist.id)
        .bind(&item.text)
        .bind(item.is_done)
        .bind(position as i64)
        .execute(&mut *conn)
        .await?;
    }

    rewrite_tag_links(
        conn,
        "checklist_tags",
        "checklist_id",
        &checklist.id,
        &checklist.tag_ids,
    )
    .await?;

    Ok(())
}

pub(crate) async fn upsert_folder(conn: &mut SqliteConnection, folder: &Folder) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO folders (id, name) VALUES (?, ?)
        ON CONFLICT(id) DO UPDATE SET name = excluded.name
        "#,
    )
    .bind(&folder.id)
    .bind(&folder.name)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn upsert_tag(conn: &mut SqliteConnection, tag: &Tag) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tags (id, name, color) VALUES (?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET name = excluded.name, color = excluded.color
        "#,
    )
    .bind(&tag.id)
    .bind(&tag.name)
    .bind(tag.color.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// ===== Relationship resolution =====

/// Resolve a folder reference against the current folder set.
/// An unresolvable reference becomes "no folder".
async fn resolve_folder(
    conn: &mut SqliteConnection,
    folder_id: Option<&str>,
) -> Result<Option<String>> {
    let Some(id) = folder_id else {
        return Ok(None);
    };

    let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM folders WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    if exists.is_none() {
        tracing::debug!("Dropping unresolvable folder reference: {}", id);
    }

    Ok(exists.map(|_| id.to_string()))
}

/// Replace the tag association rows for one owner.
///
/// Order follows the record's list; duplicate tag ids produce duplicate
/// rows. Unresolvable tag ids are dropped.
async fn rewrite_tag_links(
    conn: &mut SqliteConnection,
    table: &str,
    owner_column: &str,
    owner_id: &str,
    tag_ids: &[String],
) -> Result<()> {
    sqlx::query(&format!("DELETE FROM {table} WHERE {owner_column} = ?"))
        .bind(owner_id)
        .execute(&mut *conn)
        .await?;

    let mut position = 0i64;
    for tag_id in tag_ids {
        let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM tags WHERE id = ?")
            .bind(tag_id)
            .fetch_optional(&mut *conn)
            .await?;

        if exists.is_none() {
            tracing::debug!("Dropping unresolvable tag reference: {}", tag_id);
            continue;
        }

        sqlx::query(&format!(
            "INSERT INTO {table} ({owner_column}, tag_id, position) VALUES (?, ?, ?)"
        ))
        .bind(owner_id)
        .bind(tag_id)
        .bind(position)
        .execute(&mut *conn)
        .await?;

        position += 1;
    }

    Ok(())
}
