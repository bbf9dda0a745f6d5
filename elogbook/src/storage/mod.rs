//! Storage module
//!
//! XML codec for a single logbook file. Each file holds a header, references
//! to its child files, the recent-entries summary, the entries it owns (with
//! nested attachments) and a flat list of backup records. Tree assembly is
//! done by [`Logbook`](crate::Logbook); this module only knows about one file
//! at a time.

pub mod compression;
pub mod document;
pub mod reader;
pub mod writer;

pub use document::{DocumentRef, EntryRecord, NodeDocument, NodeHeader, XmlError};
pub use reader::{parse_document, read_document};
pub use writer::{serialize_document, write_document};

/// Element and attribute names of the on-disk format
pub(crate) mod names {
    pub const LOGBOOK: &str = "Logbook";
    pub const COMMENTS: &str = "Comments";
    pub const CHILD: &str = "Child";
    pub const RECENT_ENTRIES: &str = "RecentEntries";
    pub const RECENT: &str = "Recent";
    pub const ENTRY: &str = "Entry";
    pub const TEXT: &str = "Text";
    pub const ATTACHMENT: &str = "Attachment";
    pub const BACKUP: &str = "Backup";

    pub const TITLE: &str = "title";
    pub const AUTHOR: &str = "author";
    pub const DIRECTORY: &str = "directory";
    pub const PARENT_FILE: &str = "parent_file";
    pub const CREATION: &str = "creation";
    pub const MODIFICATION: &str = "modification";
    pub const BACKUP_TIME: &str = "backup";
    pub const SAVED: &str = "saved";
    pub const SORT_METHOD: &str = "sort_method";
    pub const SORT_ORDER: &str = "sort_order";
    pub const COMPRESSION: &str = "compression";
    pub const IS_BACKUP: &str = "is_backup";
    pub const ENTRIES: &str = "entries";
    pub const CHILDREN: &str = "children";
    pub const FILE: &str = "file";
    pub const KEYWORD: &str = "keyword";
    pub const COLOR: &str = "color";
    pub const ENCODING: &str = "encoding";
    pub const SOURCE_FILE: &str = "source_file";
    pub const TYPE: &str = "type";
    pub const PROVENANCE: &str = "provenance";
    pub const SIZE: &str = "size";

    pub const ENCODING_DEFLATE: &str = "deflate";
}
