//! A single file-backed logbook node

use crate::model::{now, Backup, NodeId, SortMethod, SortOrder, TimeStamp};
use crate::storage::{NodeHeader, XmlError};
use std::path::{Path, PathBuf};

/// One XML file of a logbook tree: header, children and backup records
///
/// Entries are not stored here; the owning [`Logbook`](super::Logbook) keeps
/// them in its arena and records which node owns each one.
#[derive(Debug, Clone)]
pub struct LogbookNode {
    pub(crate) file: Option<PathBuf>,
    pub(crate) header: NodeHeader,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) backups: Vec<Backup>,
    pub(crate) recent_entries: Vec<TimeStamp>,
    pub(crate) modified: bool,
    pub(crate) read_only: bool,
    pub(crate) xml_errors: Vec<XmlError>,
}

impl LogbookNode {
    pub(crate) fn new(file: Option<PathBuf>, header: NodeHeader) -> Self {
        Self {
            file,
            header,
            parent: None,
            children: Vec::new(),
            backups: Vec::new(),
            recent_entries: Vec::new(),
            modified: false,
            read_only: false,
            xml_errors: Vec::new(),
        }
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn parent_file(&self) -> Option<&Path> {
        self.header.parent_file.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Direct children, in creation order
    pub fn child_nodes(&self) -> &[NodeId] {
        &self.children
    }

    pub fn directory(&self) -> Option<&Path> {
        self.header.directory.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.header.title
    }

    pub fn author(&self) -> &str {
        &self.header.author
    }

    pub fn comments(&self) -> &str {
        &self.header.comments
    }

    pub fn creation(&self) -> TimeStamp {
        self.header.creation
    }

    pub fn modification(&self) -> TimeStamp {
        self.header.modification
    }

    pub fn backup(&self) -> Option<TimeStamp> {
        self.header.backup
    }

    pub fn saved(&self) -> Option<TimeStamp> {
        self.header.saved
    }

    pub fn sort_method(&self) -> SortMethod {
        self.header.sort_method
    }

    pub fn sort_order(&self) -> SortOrder {
        self.header.sort_order
    }

    pub fn use_compression(&self) -> bool {
        self.header.use_compression
    }

    pub fn is_backup(&self) -> bool {
        self.header.is_backup
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Own dirty flag, ignoring descendants
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Entry count declared in the file when it was last read or written
    pub fn xml_entries(&self) -> usize {
        self.header.entry_count
    }

    /// Child count declared in the file when it was last read or written
    pub fn xml_children(&self) -> usize {
        self.header.child_count
    }

    pub fn backup_files(&self) -> &[Backup] {
        &self.backups
    }

    pub fn xml_errors(&self) -> &[XmlError] {
        &self.xml_errors
    }

    pub fn set_modified(&mut self, value: bool) {
        self.modified = value;
        if value {
            self.header.modification = now();
        }
    }

    /// True when reading this node recorded parse problems
    ///
    /// Such a node may hold only part of its file; it takes no new entries
    /// and is not written back until its errors are cleared.
    pub fn is_incomplete(&self) -> bool {
        !self.xml_errors.is_empty()
    }

    /// Accept the content as read, allowing the node to be written again
    pub fn clear_xml_errors(&mut self) {
        self.xml_errors.clear();
    }

    pub fn set_title(&mut self, title: &str) -> bool {
        if self.header.title == title {
            return false;
        }
        self.header.title = title.to_string();
        self.set_modified(true);
        true
    }

    pub fn set_author(&mut self, author: &str) -> bool {
        if self.header.author == author {
            return false;
        }
        self.header.author = author.to_string();
        self.set_modified(true);
        true
    }

    pub fn set_comments(&mut self, comments: &str) -> bool {
        if self.header.comments == comments {
            return false;
        }
        self.header.comments = comments.to_string();
        self.set_modified(true);
        true
    }

    pub fn set_directory(&mut self, directory: impl Into<PathBuf>) -> bool {
        let directory = directory.into();
        if self.header.directory.as_ref() == Some(&directory) {
            return false;
        }
        self.header.directory = Some(directory);
        self.set_modified(true);
        true
    }

    /// Change the backing file; the node content is not marked modified
    pub fn set_file(&mut self, file: impl Into<PathBuf>) -> bool {
        let file = file.into();
        if self.file.as_ref() == Some(&file) {
            return false;
        }
        self.file = Some(file);
        true
    }

    pub fn set_parent_file(&mut self, file: impl Into<PathBuf>) -> bool {
        let file = file.into();
        if self.header.parent_file.as_ref() == Some(&file) {
            return false;
        }
        self.header.parent_file = Some(file);
        true
    }

    pub fn set_sort_method(&mut self, method: SortMethod) -> bool {
        if self.header.sort_method == method {
            return false;
        }
        self.header.sort_method = method;
        self.set_modified(true);
        true
    }

    pub fn set_sort_order(&mut self, order: SortOrder) -> bool {
        if self.header.sort_order == order {
            return false;
        }
        self.header.sort_order = order;
        self.set_modified(true);
        true
    }

    pub fn set_use_compression(&mut self, value: bool) -> bool {
        if self.header.use_compression == value {
            return false;
        }
        self.header.use_compression = value;
        self.set_modified(true);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_report_changes() {
        let mut node = LogbookNode::new(None, NodeHeader::default());

        assert!(node.set_title("Shift log"));
        assert!(node.is_modified());
        assert!(!node.set_title("Shift log"));

        node.set_modified(false);
        assert!(!node.set_sort_method(SortMethod::Creation));
        assert!(!node.is_modified());
        assert!(node.set_sort_order(SortOrder::Descending));
        assert!(node.is_modified());
    }

    #[test]
    fn test_file_changes_do_not_dirty() {
        let mut node = LogbookNode::new(None, NodeHeader::default());

        assert!(node.set_file("log.xml"));
        assert!(!node.set_file("log.xml"));
        assert!(node.set_parent_file("parent.xml"));
        assert!(!node.is_modified());
        assert_eq!(node.parent_file(), Some(Path::new("parent.xml")));
    }
}
