//! Domain model
//!
//! Plain data records stored in a logbook tree. Entities never point at each
//! other: ownership lives in the [`Relations`] table, keyed by opaque ids.

pub mod attachment;
pub mod backup;
pub mod entry;
pub mod keyword;
pub mod relations;
pub mod sort;

pub use attachment::{Attachment, AttachmentType, Provenance};
pub use backup::{Backup, BackupList};
pub use entry::Entry;
pub use keyword::Keyword;
pub use relations::Relations;
pub use sort::{SortMethod, SortOrder};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Second-resolution UTC time stamp
pub type TimeStamp = DateTime<Utc>;

/// Current time truncated to whole seconds, the resolution stored on disk
pub fn now() -> TimeStamp {
    from_unix(Utc::now().timestamp())
}

/// Build a time stamp from unix seconds
pub fn from_unix(seconds: i64) -> TimeStamp {
    DateTime::from_timestamp(seconds, 0).unwrap_or_default()
}

/// Identity of an entry inside one logbook tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(pub(crate) u64);

/// Identity of an attachment inside one logbook tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttachmentId(pub(crate) u64);

/// Index of a node in the logbook arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entry#{}", self.0)
    }
}

impl std::fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "attachment#{}", self.0)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}
