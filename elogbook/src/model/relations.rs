//! Ownership relations between logbook entities
//!
//! Entries are owned by exactly one node; attachments by exactly one entry.
//! Both relations are stored here in both directions so that association and
//! disassociation are plain table updates. Asking for the owner of something
//! that has none is a programming error and panics.

use super::{AttachmentId, EntryId, NodeId};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct Relations {
    entry_node: BTreeMap<EntryId, NodeId>,
    node_entries: BTreeMap<NodeId, BTreeSet<EntryId>>,
    attachment_entry: BTreeMap<AttachmentId, EntryId>,
    entry_attachments: BTreeMap<EntryId, BTreeSet<AttachmentId>>,
}

impl Relations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `node` the owner of `entry`
    ///
    /// # Panics
    ///
    /// If the entry is already owned by a node.
    pub fn associate_entry(&mut self, entry: EntryId, node: NodeId) {
        if let Some(owner) = self.entry_node.insert(entry, node) {
            panic!("{} is already owned by {}", entry, owner);
        }
        self.node_entries.entry(node).or_default().insert(entry);
    }

    /// Detach `entry` from its node, returning the former owner
    pub fn disassociate_entry(&mut self, entry: EntryId) -> Option<NodeId> {
        let node = self.entry_node.remove(&entry)?;
        if let Some(entries) = self.node_entries.get_mut(&node) {
            entries.remove(&entry);
            if entries.is_empty() {
                self.node_entries.remove(&node);
            }
        }
        Some(node)
    }

    /// Owning node of `entry`
    ///
    /// # Panics
    ///
    /// If the entry has no owner.
    pub fn owner(&self, entry: EntryId) -> NodeId {
        match self.entry_node.get(&entry) {
            Some(node) => *node,
            None => panic!("{} is not owned by any logbook node", entry),
        }
    }

    pub fn try_owner(&self, entry: EntryId) -> Option<NodeId> {
        self.entry_node.get(&entry).copied()
    }

    /// Entries owned directly by `node`, in id order
    pub fn entries_of(&self, node: NodeId) -> impl Iterator<Item = EntryId> + '_ {
        self.node_entries.get(&node).into_iter().flatten().copied()
    }

    pub fn entry_count(&self, node: NodeId) -> usize {
        self.node_entries.get(&node).map_or(0, BTreeSet::len)
    }

    /// Make `entry` the owner of `attachment`
    ///
    /// # Panics
    ///
    /// If the attachment already belongs to an entry.
    pub fn associate_attachment(&mut self, attachment: AttachmentId, entry: EntryId) {
        if let Some(owner) = self.attachment_entry.insert(attachment, entry) {
            panic!("{} is already attached to {}", attachment, owner);
        }
        self.entry_attachments
            .entry(entry)
            .or_default()
            .insert(attachment);
    }

    pub fn disassociate_attachment(&mut self, attachment: AttachmentId) -> Option<EntryId> {
        let entry = self.attachment_entry.remove(&attachment)?;
        if let Some(attachments) = self.entry_attachments.get_mut(&entry) {
            attachments.remove(&attachment);
            if attachments.is_empty() {
                self.entry_attachments.remove(&entry);
            }
        }
        Some(entry)
    }

    /// Entry an attachment belongs to
    ///
    /// # Panics
    ///
    /// If the attachment is not attached to any entry.
    pub fn attachment_owner(&self, attachment: AttachmentId) -> EntryId {
        match self.attachment_entry.get(&attachment) {
            Some(entry) => *entry,
            None => panic!("{} is not attached to any entry", attachment),
        }
    }

    pub fn attachments_of(&self, entry: EntryId) -> impl Iterator<Item = AttachmentId> + '_ {
        self.entry_attachments.get(&entry).into_iter().flatten().copied()
    }
}
