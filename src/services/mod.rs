//! Services module
//!
//! Bulk operations over the store (backup, import) plus the collaborator
//! interfaces the core talks to: the error-reporting sink and the
//! background-task queue.

pub mod backup;
pub mod import;
pub mod reporting;
pub mod tasks;

pub use backup::{BackupInfo, BackupService};
pub use import::{ImportDocument, ImportService};
pub use reporting::{ErrorReporter, TracingReporter};
pub use tasks::{ProgressReporter, TaskHandle, TaskQueue};
