//! Error types for the notekeep storage core
//!
//! All errors use thiserror for structured error handling.
//! Not-found and unresolvable-reference conditions are absorbed as no-ops
//! by the repository and mapping layers; only infrastructure failures
//! (storage engine, filesystem, serialization) surface through this type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backup error: {0}")]
    Backup(String),

    #[error("Restore error: {0}")]
    Restore(String),

    #[error("Store corrupted: {0}")]
    Corruption(String),

    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Whether a single automatic retry is worth attempting.
    ///
    /// SQLITE_BUSY (5) and SQLITE_LOCKED (6) are transient contention
    /// between connections sharing the store file.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(sqlx::Error::Database(db)) => {
                matches!(db.code().as_deref(), Some("5") | Some("6"))
            }
            _ => false,
        }
    }

    /// Whether this error came from the storage engine or filesystem,
    /// as opposed to a policy error raised by a service.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::Io(_)
                | AppError::Serialization(_)
                | AppError::Corruption(_)
        )
    }

    /// Suggested recovery actions for the presentation collaborator.
    ///
    /// The core never renders these; they travel with the error report so
    /// the UI layer can build its own localized alert.
    pub fn recovery_actions(&self) -> &'static [&'static str] {
        match self {
            AppError::Database(_) => &["retry", "reopen-store"],
            AppError::Io(_) => &["retry", "check-disk-space"],
            AppError::Serialization(_) => &["retry"],
            AppError::Backup(_) => &["retry"],
            AppError::Restore(_) => &["retry", "choose-other-backup"],
            AppError::Corruption(_) => &["restore-from-backup", "reset-store"],
            AppError::Generic(_) => &["retry"],
        }
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
