//! Logbook configuration
//!
//! Policy values used by the logbook tree (shard size, recent list length,
//! backup interval, compression). A [`LogbookConfig`] is built by whoever
//! assembles the application and handed to each [`Logbook`](crate::Logbook)
//! at construction time.

use serde::{Deserialize, Serialize};

// ===== Tree Limits =====

/// Default number of entries a single logbook file holds before new entries
/// spill into a child file
pub const DEFAULT_MAX_ENTRIES: usize = 50;

/// Default length of the recent-entries list kept on the root logbook
pub const DEFAULT_MAX_RECENT_ENTRIES: usize = 10;

// ===== Backup Policy =====

/// Default number of days between two automatic backups
pub const DEFAULT_BACKUP_INTERVAL_DAYS: u32 = 30;

/// Maximum backup interval in days (1 year)
pub const MAX_BACKUP_INTERVAL_DAYS: u32 = 365;

// ===== File Naming =====

/// Infix used between the parent file stem and the child index
pub const CHILD_FILE_INFIX: &str = "_include_";

/// Infix used between the logbook file stem and the backup date
pub const BACKUP_FILE_INFIX: &str = "_backup_";

/// Policy values for a logbook tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogbookConfig {
    /// Entries held directly by one node
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_max_recent_entries")]
    pub max_recent_entries: usize,
    #[serde(default = "default_true")]
    pub auto_backup: bool,
    #[serde(default = "default_backup_interval_days")]
    pub backup_interval_days: u32,
    /// Store entry text deflated in newly created logbooks
    #[serde(default)]
    pub use_compression: bool,
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_max_recent_entries() -> usize {
    DEFAULT_MAX_RECENT_ENTRIES
}

fn default_true() -> bool {
    true
}

fn default_backup_interval_days() -> u32 {
    DEFAULT_BACKUP_INTERVAL_DAYS
}

impl Default for LogbookConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            max_recent_entries: default_max_recent_entries(),
            auto_backup: true,
            backup_interval_days: default_backup_interval_days(),
            use_compression: false,
        }
    }
}

impl LogbookConfig {
    /// Clamp values that would break the tree invariants
    pub fn validated(mut self) -> Self {
        if self.max_entries == 0 {
            tracing::warn!("max_entries of 0 is not usable, falling back to 1");
            self.max_entries = 1;
        }

        self.backup_interval_days = self.backup_interval_days.clamp(1, MAX_BACKUP_INTERVAL_DAYS);
        self
    }

    /// Backup interval as a chrono duration
    pub fn backup_interval(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.backup_interval_days))
    }
}
