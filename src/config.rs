//! Application configuration constants
//!
//! Central location for storage layout, pool sizing, and backup policy
//! constants used throughout the crate.

// ===== Store Layout =====

/// Filename of the SQLite store inside the data directory
pub const STORE_FILENAME: &str = "notekeep.sqlite";

/// Subdirectory of the data directory holding backup snapshots
pub const BACKUPS_DIR_NAME: &str = "backups";

// ===== Connection Pools =====

/// Maximum connections in the main application pool
pub const MAX_POOL_CONNECTIONS: u32 = 5;

/// Maximum connections in a background pool.
/// Bulk writers are expected to serialize through a single background pool.
pub const BACKGROUND_POOL_CONNECTIONS: u32 = 2;

/// How long a connection waits on a locked database before failing
pub const BUSY_TIMEOUT_SECS: u64 = 5;

// ===== Backup Policy =====

/// Prefix for backup snapshot filenames
pub const BACKUP_FILE_PREFIX: &str = "backup_";

/// Extension for backup snapshot filenames
pub const BACKUP_FILE_EXTENSION: &str = "sqlite";

/// Timestamp format embedded in backup filenames.
/// Lexicographic order of the formatted value matches chronological order.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Number of backup files kept by the retention policy
pub const BACKUP_RETENTION_COUNT: usize = 10;

// ===== Stores =====

/// Capacity of each store's change-event broadcast channel.
/// Observers that fall further behind than this miss events, not data;
/// the next snapshot read is always consistent.
pub const EVENT_CHANNEL_CAPACITY: usize = 16;
