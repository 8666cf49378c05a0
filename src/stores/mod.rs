//! Observable stores
//!
//! One store per entity family. Each holds the repository, a published
//! snapshot of its collection, and a change-event channel. Every mutation
//! commits, refreshes the snapshot with a full reload, and then broadcasts;
//! observers subscribe to the channel and read snapshots, never storage.

pub mod checklists;
pub mod folders;
pub mod notes;
pub mod tags;

pub use checklists::ChecklistStore;
pub use folders::FolderStore;
pub use notes::NoteStore;
pub use tags::TagStore;

/// Emitted on the store's broadcast channel after each committed mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    NotesChanged,
    ChecklistsChanged,
    FoldersChanged,
    TagsChanged,
}
