//! Logbook tree
//!
//! A logbook is a tree of XML files. Each node holds at most
//! [`LogbookConfig::max_entries`] entries directly; once every node is full a
//! new child node is created. All insertion goes through
//! [`Logbook::latest_child`] so that this invariant holds for the whole tree.
//!
//! Entries and attachments live in arenas owned by the [`Logbook`] and are
//! addressed by [`EntryId`] / [`AttachmentId`]. Which node owns which entry is
//! recorded in a [`Relations`] table.

pub mod backup;
pub mod node;
pub mod persist;
pub mod sync;

pub use node::LogbookNode;
pub use persist::child_filename;
pub use sync::{synchronize_logbooks, SyncReport};

use crate::config::LogbookConfig;
use crate::error::Result;
use crate::model::{
    Attachment, AttachmentId, Entry, EntryId, Keyword, NodeId, Relations, TimeStamp,
};
use crate::storage::NodeHeader;
use chrono::Duration;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

const ROOT: NodeId = NodeId(0);

/// A logbook tree: root node, child nodes, entries and attachments
#[derive(Debug, Clone)]
pub struct Logbook {
    config: LogbookConfig,
    nodes: Vec<Option<LogbookNode>>,
    entry_arena: HashMap<EntryId, Entry>,
    attachment_arena: HashMap<AttachmentId, Attachment>,
    relations: Relations,
    next_entry: u64,
    next_attachment: u64,
    /// Child files of removed or renamed nodes, deleted on the next save
    orphaned_files: Vec<PathBuf>,
}

impl Logbook {
    /// Create an empty logbook without backing file
    pub fn new(config: LogbookConfig) -> Self {
        let config = config.validated();
        let header = NodeHeader {
            use_compression: config.use_compression,
            ..NodeHeader::default()
        };

        Self {
            config,
            nodes: vec![Some(LogbookNode::new(None, header))],
            entry_arena: HashMap::new(),
            attachment_arena: HashMap::new(),
            relations: Relations::new(),
            next_entry: 0,
            next_attachment: 0,
            orphaned_files: Vec::new(),
        }
    }

    /// Create an empty logbook backed by `file`; nothing is read yet
    pub fn with_file(file: impl Into<PathBuf>, config: LogbookConfig) -> Self {
        let mut logbook = Self::new(config);
        logbook.root_node_mut().file = Some(file.into());
        logbook
    }

    /// Create a logbook backed by `file` and read the whole tree
    ///
    /// Parse problems do not fail the call; see [`Logbook::xml_errors`].
    pub fn open(file: impl Into<PathBuf>, config: LogbookConfig) -> Result<Self> {
        let mut logbook = Self::with_file(file, config);
        logbook.read()?;
        Ok(logbook)
    }

    pub fn config(&self) -> &LogbookConfig {
        &self.config
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    /// Backing file of the root node
    pub fn file(&self) -> Option<&Path> {
        self.root_node().file()
    }

    /// Node by id
    ///
    /// # Panics
    ///
    /// If the node was removed from the tree.
    pub fn node(&self, id: NodeId) -> &LogbookNode {
        match self.nodes.get(id.0).and_then(Option::as_ref) {
            Some(node) => node,
            None => panic!("{} is not part of the logbook", id),
        }
    }

    /// Mutable node by id
    ///
    /// # Panics
    ///
    /// If the node was removed from the tree.
    pub fn node_mut(&mut self, id: NodeId) -> &mut LogbookNode {
        match self.nodes.get_mut(id.0).and_then(Option::as_mut) {
            Some(node) => node,
            None => panic!("{} is not part of the logbook", id),
        }
    }

    pub fn root_node(&self) -> &LogbookNode {
        self.node(ROOT)
    }

    pub fn root_node_mut(&mut self) -> &mut LogbookNode {
        self.node_mut(ROOT)
    }

    /// All descendants of `node`, depth-first in creation order
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        self.collect_children(node, &mut result);
        result
    }

    fn collect_children(&self, node: NodeId, result: &mut Vec<NodeId>) {
        for child in &self.node(node).children {
            result.push(*child);
            self.collect_children(*child, result);
        }
    }

    /// Root followed by all its descendants
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut result = vec![ROOT];
        self.collect_children(ROOT, &mut result);
        result
    }

    /// Attach a new node below `parent`, reusing the slot of a removed node
    pub(crate) fn add_node(&mut self, parent: NodeId, file: Option<PathBuf>, header: NodeHeader) -> NodeId {
        let mut node = LogbookNode::new(file, header);
        node.parent = Some(parent);

        let id = match self.nodes.iter().skip(1).position(Option::is_none) {
            Some(free) => {
                let id = NodeId(free + 1);
                self.nodes[id.0] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        };

        self.node_mut(parent).children.push(id);
        id
    }

    // ===== Entries =====

    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entry_arena.get(&id)
    }

    pub(crate) fn entry_ref(&self, id: EntryId) -> &Entry {
        match self.entry_arena.get(&id) {
            Some(entry) => entry,
            None => panic!("{} does not exist", id),
        }
    }

    /// All entries of the tree
    pub fn entries(&self) -> Vec<EntryId> {
        self.entries_of(ROOT)
    }

    /// Entries owned by `node` and all its descendants
    pub fn entries_of(&self, node: NodeId) -> Vec<EntryId> {
        let mut result: Vec<EntryId> = self.relations.entries_of(node).collect();
        for child in self.children(node) {
            result.extend(self.relations.entries_of(child));
        }
        result
    }

    /// Entries owned directly by `node`
    pub fn owned_entries(&self, node: NodeId) -> Vec<EntryId> {
        self.relations.entries_of(node).collect()
    }

    pub fn owned_entry_count(&self, node: NodeId) -> usize {
        self.relations.entry_count(node)
    }

    /// Node owning `entry`
    ///
    /// # Panics
    ///
    /// If the entry is not part of this logbook.
    pub fn owner(&self, entry: EntryId) -> NodeId {
        self.relations.owner(entry)
    }

    pub fn find_by_creation(&self, creation: TimeStamp) -> Option<EntryId> {
        self.entry_arena
            .iter()
            .find(|(_, entry)| entry.creation() == creation)
            .map(|(id, _)| *id)
    }

    /// First second at or after `creation` that no entry of the tree uses
    pub(crate) fn free_creation(&self, creation: TimeStamp) -> TimeStamp {
        let mut creation = creation;
        while self.find_by_creation(creation).is_some() {
            creation += Duration::seconds(1);
        }
        creation
    }

    /// Node that receives the next new entry
    ///
    /// Scans the root, then its descendants depth-first, for a node with
    /// room left. Nodes that were not read completely are skipped. When no
    /// node qualifies a new child of the root is created and both root and
    /// child are marked modified; the child gets its file name on save.
    pub fn latest_child(&mut self) -> NodeId {
        let max_entries = self.config.max_entries;
        let candidate = std::iter::once(ROOT)
            .chain(self.children(ROOT))
            .find(|node| {
                !self.node(*node).is_incomplete()
                    && self.relations.entry_count(*node) < max_entries
            });

        if let Some(node) = candidate {
            return node;
        }

        let root = self.root_node();
        let header = NodeHeader {
            title: root.header.title.clone(),
            author: root.header.author.clone(),
            directory: root.header.directory.clone(),
            parent_file: root.file.clone(),
            sort_method: root.header.sort_method,
            sort_order: root.header.sort_order,
            use_compression: root.header.use_compression,
            ..NodeHeader::default()
        };
        let child = self.add_node(ROOT, None, header);
        self.node_mut(child).set_modified(true);
        self.root_node_mut().set_modified(true);

        tracing::debug!("Created child logbook {}", child);

        child
    }

    /// Insert an entry into the tree, respecting the per-node capacity
    ///
    /// Creation stamps are unique within a tree: if another entry was created
    /// in the same second, the new entry moves to the next free second.
    pub fn add_entry(&mut self, mut entry: Entry) -> EntryId {
        let creation = self.free_creation(entry.creation());
        if creation != entry.creation() {
            tracing::debug!(
                "Creation time {} is taken, using {}",
                entry.creation(),
                creation
            );
            entry.set_creation(creation);
            entry.modification = entry.modification.max(creation);
        }

        let node = self.latest_child();
        let id = self.insert_entry(node, entry);
        self.node_mut(node).set_modified(true);
        id
    }

    pub(crate) fn insert_entry(&mut self, node: NodeId, entry: Entry) -> EntryId {
        let id = EntryId(self.next_entry);
        self.next_entry += 1;
        self.entry_arena.insert(id, entry);
        self.relations.associate_entry(id, node);
        id
    }

    pub(crate) fn insert_attachment(&mut self, entry: EntryId, attachment: Attachment) -> AttachmentId {
        let id = AttachmentId(self.next_attachment);
        self.next_attachment += 1;
        self.attachment_arena.insert(id, attachment);
        self.relations.associate_attachment(id, entry);
        id
    }

    /// Apply `f` to an entry and mark its node modified
    ///
    /// # Panics
    ///
    /// If the entry is not part of this logbook.
    pub fn modify_entry<R>(&mut self, id: EntryId, f: impl FnOnce(&mut Entry) -> R) -> R {
        let node = self.relations.owner(id);
        let result = match self.entry_arena.get_mut(&id) {
            Some(entry) => f(entry),
            None => panic!("{} does not exist", id),
        };
        self.node_mut(node).set_modified(true);
        result
    }

    /// Remove an entry and its attachment records from the tree
    ///
    /// Attached files are left on disk.
    ///
    /// # Panics
    ///
    /// If the entry is not part of this logbook.
    pub fn delete_entry(&mut self, id: EntryId) -> Entry {
        let node = self.relations.owner(id);

        let attachments: Vec<AttachmentId> = self.relations.attachments_of(id).collect();
        for attachment in attachments {
            self.relations.disassociate_attachment(attachment);
            self.attachment_arena.remove(&attachment);
        }

        self.relations.disassociate_entry(id);
        self.node_mut(node).set_modified(true);

        match self.entry_arena.remove(&id) {
            Some(entry) => entry,
            None => panic!("{} does not exist", id),
        }
    }

    pub fn empty(&self) -> bool {
        self.entry_arena.is_empty()
    }

    /// Entries matching `query` in title, keyword, author or text
    pub fn search(&self, query: &str) -> Vec<EntryId> {
        self.entries()
            .into_iter()
            .filter(|id| self.entry_ref(*id).matches(query))
            .collect()
    }

    /// All entries ordered with the root's sort method and order
    pub fn sorted_entries(&self) -> Vec<EntryId> {
        let method = self.root_node().sort_method();
        let order = self.root_node().sort_order();

        let mut entries = self.entries();
        entries.sort_by(|a, b| {
            order.apply(method.compare(self.entry_ref(*a), self.entry_ref(*b)))
        });
        entries
    }

    /// Every keyword in use, including the ancestors of used keywords
    pub fn keywords(&self) -> BTreeSet<Keyword> {
        let mut keywords = BTreeSet::new();
        keywords.insert(Keyword::root());

        for entry in self.entry_arena.values() {
            let mut keyword = entry.keyword.clone();
            while !keyword.is_root() {
                let parent = keyword.parent();
                keywords.insert(keyword);
                keyword = parent;
            }
        }
        keywords
    }

    /// Move every entry below `old` to the same place below `new`
    ///
    /// Returns the number of entries changed.
    pub fn rename_keyword(&mut self, old: &Keyword, new: &Keyword) -> usize {
        let changes: Vec<(EntryId, Keyword)> = self
            .entries()
            .into_iter()
            .filter_map(|id| {
                self.entry_ref(id)
                    .keyword
                    .reparent(old, new)
                    .map(|keyword| (id, keyword))
            })
            .collect();

        let count = changes.len();
        for (id, keyword) in changes {
            self.modify_entry(id, |entry| {
                entry.keyword = keyword;
                entry.touch();
            });
        }

        tracing::info!("Renamed keyword {} to {} on {} entries", old, new, count);
        count
    }

    // ===== Attachments =====

    pub fn attachment(&self, id: AttachmentId) -> Option<&Attachment> {
        self.attachment_arena.get(&id)
    }

    /// All attachments referenced by entries of the tree
    pub fn attachments(&self) -> Vec<AttachmentId> {
        self.entries()
            .into_iter()
            .flat_map(|entry| self.relations.attachments_of(entry).collect::<Vec<_>>())
            .collect()
    }

    pub fn attachments_of(&self, entry: EntryId) -> Vec<AttachmentId> {
        self.relations.attachments_of(entry).collect()
    }

    /// Entry owning `attachment`
    ///
    /// # Panics
    ///
    /// If the attachment is not part of this logbook.
    pub fn attachment_owner(&self, attachment: AttachmentId) -> EntryId {
        self.relations.attachment_owner(attachment)
    }

    /// Attach a record to an entry and mark the entry's node modified
    ///
    /// # Panics
    ///
    /// If the entry is not part of this logbook.
    pub fn add_attachment(&mut self, entry: EntryId, attachment: Attachment) -> AttachmentId {
        let node = self.relations.owner(entry);
        let id = self.insert_attachment(entry, attachment);
        self.node_mut(node).set_modified(true);
        id
    }

    /// Remove an attachment from its entry
    ///
    /// With `delete_file`, the underlying file is removed too unless another
    /// attachment of this tree references the same file.
    pub fn delete_attachment(&mut self, id: AttachmentId, delete_file: bool) -> Result<Attachment> {
        let entry = self.relations.attachment_owner(id);
        let node = self.relations.owner(entry);

        if delete_file {
            let attachment = &self.attachment_arena[&id];
            let shared = self
                .attachment_arena
                .iter()
                .any(|(other_id, other)| *other_id != id && other.is_same_file(attachment));

            if attachment.is_url() {
                tracing::debug!("Not deleting URL attachment target {}", attachment.file);
            } else if shared {
                tracing::info!("Keeping {} referenced by other attachments", attachment.file);
            } else if attachment.path().exists() {
                std::fs::remove_file(attachment.path())?;
                tracing::info!("Deleted attachment file {}", attachment.file);
            }
        }

        self.relations.disassociate_attachment(id);
        self.node_mut(node).set_modified(true);

        match self.attachment_arena.remove(&id) {
            Some(attachment) => Ok(attachment),
            None => panic!("{} does not exist", id),
        }
    }

    // ===== Tree shape =====

    /// True if any node of the tree has unsaved changes
    pub fn modified(&self) -> bool {
        self.nodes().into_iter().any(|node| self.node(node).modified)
    }

    /// True if `node` or one of its descendants has unsaved changes
    pub fn node_modified(&self, node: NodeId) -> bool {
        self.node(node).modified
            || self
                .children(node)
                .into_iter()
                .any(|child| self.node(child).modified)
    }

    pub fn set_modified_recursive(&mut self, value: bool) {
        for node in self.nodes() {
            self.node_mut(node).set_modified(value);
        }
    }

    /// Accept every node as read so that the tree can be written again
    ///
    /// Content lost while parsing stays lost; the next save overwrites the
    /// damaged files.
    pub fn clear_xml_errors(&mut self) {
        for node in self.nodes() {
            self.node_mut(node).clear_xml_errors();
        }
    }

    /// Drop every child node that owns no entry and has no non-empty
    /// descendant; returns the number of nodes removed
    ///
    /// Nodes that were not read completely are kept. Files of removed nodes
    /// are deleted on the next save, and their ids may be reused.
    pub fn remove_empty_children(&mut self) -> usize {
        self.prune(ROOT)
    }

    fn prune(&mut self, node: NodeId) -> usize {
        let children = self.node(node).children.clone();
        let mut removed = 0;
        let mut kept = Vec::with_capacity(children.len());

        for child in children {
            removed += self.prune(child);

            let empty = self.relations.entry_count(child) == 0
                && self.node(child).children.is_empty()
                && !self.node(child).is_incomplete();

            if empty {
                tracing::debug!("Removing empty child logbook {:?}", self.node(child).file());
                if let Some(dropped) = self.nodes[child.0].take() {
                    self.orphaned_files.extend(dropped.file);
                }
                removed += 1;
            } else {
                kept.push(child);
            }
        }

        if kept.len() != self.node(node).children.len() {
            let parent = self.node_mut(node);
            parent.children = kept;
            parent.set_modified(true);
        }

        removed
    }

    /// Repack all entries, in creation order, into as few nodes as possible
    ///
    /// Entry and attachment identities are preserved; node ids are
    /// renumbered. Every node of the resulting tree is marked modified.
    pub fn reorganize(&mut self) {
        let mut entries = self.entries();
        entries.sort_by_key(|id| (self.entry_ref(*id).creation(), *id));

        for id in &entries {
            self.relations.disassociate_entry(*id);
        }

        for id in &entries {
            let node = self.latest_child();
            self.relations.associate_entry(*id, node);
        }

        let removed = self.remove_empty_children();
        self.compact();
        self.set_modified_recursive(true);

        tracing::info!(
            "Reorganized {} entries into {} files ({} removed)",
            entries.len(),
            self.nodes().len(),
            removed
        );
    }

    /// Renumber nodes depth-first so that the arena holds no free slots
    fn compact(&mut self) {
        let order = self.nodes();
        let mapping: HashMap<NodeId, NodeId> = order
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, NodeId(index)))
            .collect();

        let owned: Vec<(EntryId, NodeId)> = order
            .iter()
            .flat_map(|node| {
                self.relations
                    .entries_of(*node)
                    .map(|entry| (entry, mapping[node]))
                    .collect::<Vec<_>>()
            })
            .collect();
        for (entry, _) in &owned {
            self.relations.disassociate_entry(*entry);
        }
        for (entry, node) in owned {
            self.relations.associate_entry(entry, node);
        }

        let mut nodes = Vec::with_capacity(order.len());
        for id in order {
            if let Some(mut node) = self.nodes[id.0].take() {
                node.parent = node.parent.map(|parent| mapping[&parent]);
                node.children = node.children.iter().map(|child| mapping[child]).collect();
                nodes.push(Some(node));
            }
        }
        self.nodes = nodes;
    }

    /// True when every node's declared entry and child counts match its
    /// live content
    pub fn is_consistent(&self) -> bool {
        self.nodes().into_iter().all(|id| {
            let node = self.node(id);
            node.xml_entries() == self.relations.entry_count(id)
                && node.xml_children() == node.children.len()
        })
    }

    // ===== Recent entries =====

    /// Recently used entries of the tree, oldest first
    pub fn recent_entries(&self) -> Vec<EntryId> {
        let by_creation: HashMap<TimeStamp, EntryId> = self
            .entries()
            .into_iter()
            .map(|id| (self.entry_ref(id).creation(), id))
            .collect();

        self.root_node()
            .recent_entries
            .iter()
            .filter_map(|creation| by_creation.get(creation).copied())
            .collect()
    }

    /// Move `entry` to the end of the recent list, dropping the oldest
    /// records beyond the configured length
    pub fn add_recent_entry(&mut self, entry: EntryId) {
        let creation = self.entry_ref(entry).creation();
        let max = self.config.max_recent_entries;

        let root = self.root_node_mut();
        if root.recent_entries.last() == Some(&creation) {
            return;
        }

        root.recent_entries.retain(|stamp| *stamp != creation);
        root.recent_entries.push(creation);
        root.set_modified(true);

        self.truncate_recent_entries(max);
    }

    /// Keep only the `count` most recent records
    pub fn truncate_recent_entries(&mut self, count: usize) {
        let root = self.root_node_mut();
        let len = root.recent_entries.len();
        if len > count {
            root.recent_entries.drain(..len - count);
            root.set_modified(true);
        }
    }

    pub(crate) fn take_orphaned_files(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.orphaned_files)
    }

    pub(crate) fn add_orphaned_file(&mut self, file: PathBuf) {
        self.orphaned_files.push(file);
    }

    /// Drop every node, entry and attachment, keeping the root's file
    pub(crate) fn clear(&mut self) {
        let file = self.root_node().file.clone();
        *self = Self::new(self.config.clone());
        self.root_node_mut().file = file;
    }
}
