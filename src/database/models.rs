//! Domain records
//!
//! Plain value types the rest of the application works with. These are
//! what the stores hand out and accept; persisted rows never leave the
//! database module. Identity is the `id` field; everything else is data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Priority assigned to a note or checklist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Priority {
    /// Key stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::None => "none",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Rehydrate from a stored key. Unknown keys decode as `None` so rows
    /// written by a newer schema revision still load.
    pub fn from_key(key: &str) -> Self {
        match key {
            "low" => Priority::Low,
            "medium" => Priority::Medium,
            "high" => Priority::High,
            _ => Priority::None,
        }
    }
}

/// Fixed display palette for tags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagColor {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
    #[default]
    Gray,
}

impl TagColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagColor::Red => "red",
            TagColor::Orange => "orange",
            TagColor::Yellow => "yellow",
            TagColor::Green => "green",
            TagColor::Blue => "blue",
            TagColor::Purple => "purple",
            TagColor::Pink => "pink",
            TagColor::Gray => "gray",
        }
    }

    /// Unknown keys fall back to gray rather than failing the load.
    pub fn from_key(key: &str) -> Self {
        match key {
            "red" => TagColor::Red,
            "orange" => TagColor::Orange,
            "yellow" => TagColor::Yellow,
            "green" => TagColor::Green,
            "blue" => TagColor::Blue,
            "purple" => TagColor::Purple,
            "pink" => TagColor::Pink,
            _ => TagColor::Gray,
        }
    }
}

/// A free-form note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Folder the note lives in, if any. Cleared when the folder is deleted.
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub is_pinned: bool,
    /// Last-modified timestamp; refreshed on every edit, drives sort order
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub image_data: Option<Vec<u8>>,
    /// Opaque rich-text encoding owned by the editor layer
    #[serde(default)]
    pub attributed_content: Option<Vec<u8>>,
    /// Ordered tag references; duplicates are permitted
    #[serde(default)]
    pub tag_ids: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl Note {
    /// Create a new note with a generated identifier and default fields
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            folder_id: None,
            is_pinned: false,
            date: Utc::now(),
            image_data: None,
            attributed_content: None,
            tag_ids: Vec::new(),
            priority: Priority::None,
        }
    }
}

/// A single entry of a checklist, owned exclusively by its parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub is_done: bool,
}

impl ChecklistItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            is_done: false,
        }
    }
}

/// A checklist note: like a note, but its body is an ordered item list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistNote {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    /// Owned items; replaced wholesale on every save
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
    #[serde(default)]
    pub is_pinned: bool,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl ChecklistNote {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            folder_id: None,
            items: Vec::new(),
            is_pinned: false,
            date: Utc::now(),
            tag_ids: Vec::new(),
            priority: Priority::None,
        }
    }
}

/// A folder grouping notes and checklists.
/// Deleting a folder never deletes its contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
        }
    }
}

/// A tag attachable to any number of notes and checklists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: TagColor,
}

impl Tag {
    pub fn new(name: impl Into<String>, color: TagColor) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_round_trips_through_key() {
        for p in [Priority::None, Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(Priority::from_key(p.as_str()), p);
        }
    }

    #[test]
    fn unknown_priority_key_decodes_as_none() {
        assert_eq!(Priority::from_key("urgent"), Priority::None);
    }

    #[test]
    fn unknown_color_key_decodes_as_gray() {
        assert_eq!(TagColor::from_key("chartreuse"), TagColor::Gray);
    }

    #[test]
    fn new_note_has_defaults() {
        let note = Note::new("Groceries", "milk");
        assert!(!note.id.is_empty());
        assert!(!note.is_pinned);
        assert!(note.tag_ids.is_empty());
        assert_eq!(note.priority, Priority::None);
        assert!(note.folder_id.is_none());
    }

    #[test]
    fn new_items_start_unchecked() {
        let item = ChecklistItem::new("buy milk");
        assert!(!item.is_done);
    }
}
