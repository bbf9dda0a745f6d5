//! In-memory form of one logbook file

use crate::model::{now, Attachment, Backup, Entry, SortMethod, SortOrder, TimeStamp};
use std::fmt;
use std::path::{Path, PathBuf};

/// Header attributes of a logbook file
#[derive(Debug, Clone, PartialEq)]
pub struct NodeHeader {
    pub title: String,
    pub author: String,
    pub comments: String,
    pub directory: Option<PathBuf>,
    pub parent_file: Option<PathBuf>,
    pub creation: TimeStamp,
    pub modification: TimeStamp,
    pub backup: Option<TimeStamp>,
    pub saved: Option<TimeStamp>,
    pub sort_method: SortMethod,
    pub sort_order: SortOrder,
    pub use_compression: bool,
    pub is_backup: bool,
    /// Entry count declared by the file
    pub entry_count: usize,
    /// Child count declared by the file
    pub child_count: usize,
}

impl Default for NodeHeader {
    fn default() -> Self {
        let now = now();
        Self {
            title: String::new(),
            author: String::new(),
            comments: String::new(),
            directory: None,
            parent_file: None,
            creation: now,
            modification: now,
            backup: None,
            saved: None,
            sort_method: SortMethod::default(),
            sort_order: SortOrder::default(),
            use_compression: false,
            is_backup: false,
            entry_count: 0,
            child_count: 0,
        }
    }
}

/// An entry together with its attachments, as stored in a file
#[derive(Debug, Clone, PartialEq)]
pub struct EntryRecord {
    pub entry: Entry,
    pub attachments: Vec<Attachment>,
}

/// Everything parsed out of one logbook file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeDocument {
    pub header: NodeHeader,
    /// Child file names, relative to the directory of this file
    pub children: Vec<String>,
    pub recent_entries: Vec<TimeStamp>,
    pub entries: Vec<EntryRecord>,
    pub backups: Vec<Backup>,
}

/// Borrowed view of a node handed to the writer
pub struct DocumentRef<'a> {
    pub header: &'a NodeHeader,
    pub children: &'a [String],
    pub recent_entries: &'a [TimeStamp],
    pub entries: Vec<(&'a Entry, Vec<&'a Attachment>)>,
    pub backups: &'a [Backup],
}

/// A non-fatal problem found while reading a logbook file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlError {
    pub file: PathBuf,
    pub message: String,
    /// Byte offset in the file, when known
    pub position: Option<u64>,
}

impl XmlError {
    pub fn new(file: &Path, message: impl Into<String>, position: Option<u64>) -> Self {
        Self {
            file: file.to_path_buf(),
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(
                f,
                "{} (byte {}): {}",
                self.file.display(),
                position,
                self.message
            ),
            None => write!(f, "{}: {}", self.file.display(), self.message),
        }
    }
}
