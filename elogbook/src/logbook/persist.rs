//! Reading and writing logbook trees
//!
//! The root file references its children by file name; each child is read
//! from (and written to) its own file. Only nodes marked modified are
//! rewritten on save.

use super::{Logbook, ROOT};
use crate::config::CHILD_FILE_INFIX;
use crate::error::{LogbookError, Result};
use crate::model::{now, Attachment, Entry, EntryId, NodeId};
use crate::storage::{read_document, write_document, DocumentRef, EntryRecord, XmlError};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the child at `index` of the node stored in `file`
///
/// `log.xml` gives `log_include_0.xml`, `log_include_1.xml`, ...
pub fn child_filename(file: &Path, index: usize) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name = match file.extension() {
        Some(extension) => format!(
            "{}{}{}.{}",
            stem,
            CHILD_FILE_INFIX,
            index,
            extension.to_string_lossy()
        ),
        None => format!("{}{}{}", stem, CHILD_FILE_INFIX, index),
    };

    file.with_file_name(name)
}

impl Logbook {
    /// Load the tree from the root file and every referenced child file
    ///
    /// Any previous content is discarded. Returns `Ok(false)` when parse
    /// problems were recorded (see [`Logbook::xml_errors`]); only failing to
    /// read the root file is an error.
    pub fn read(&mut self) -> Result<bool> {
        let file = self.root_node().file.clone().ok_or(LogbookError::NoFile)?;
        self.clear();

        tracing::info!("Reading logbook {:?}", file);

        let mut visited = HashSet::new();
        self.read_node(ROOT, &file, &mut visited)?;
        self.separate_duplicate_creations();

        let errors = self.xml_errors();
        if !self.is_consistent() {
            tracing::warn!("Logbook {:?} declares counts that differ from its content", file);
        }

        tracing::info!(
            "Read {} entries in {} files ({} errors)",
            self.entry_arena.len(),
            self.nodes().len(),
            errors.len()
        );

        Ok(errors.is_empty())
    }

    fn read_node(&mut self, node: NodeId, file: &Path, visited: &mut HashSet<PathBuf>) -> Result<()> {
        let key = fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
        if !visited.insert(key) {
            self.node_mut(node).xml_errors.push(XmlError::new(
                file,
                "File is already part of this logbook",
                None,
            ));
            return Ok(());
        }

        let (document, errors) = read_document(file)?;
        let read_only = fs::metadata(file)
            .map(|metadata| metadata.permissions().readonly())
            .unwrap_or(false);

        let entry_count = document.entries.len();
        {
            let target = self.node_mut(node);
            target.file = Some(file.to_path_buf());
            target.header = document.header;
            target.backups = document.backups;
            target.recent_entries = document.recent_entries;
            target.xml_errors = errors;
            target.read_only = read_only;
            target.modified = false;

            if target.header.entry_count != entry_count {
                tracing::warn!(
                    "{:?} declares {} entries but holds {}",
                    file,
                    target.header.entry_count,
                    entry_count
                );
            }
        }

        for EntryRecord { entry, attachments } in document.entries {
            let id = self.insert_entry(node, entry);
            for attachment in attachments {
                self.insert_attachment(id, attachment);
            }
        }

        let directory = file.parent().unwrap_or(Path::new(""));
        for name in document.children {
            let child_file = directory.join(&name);
            let child = self.add_node(node, Some(child_file.clone()), Default::default());

            if let Err(e) = self.read_node(child, &child_file, visited) {
                tracing::warn!("Failed to read child logbook {:?}: {}", child_file, e);
                self.node_mut(child).xml_errors.push(XmlError::new(
                    &child_file,
                    format!("Cannot read file: {}", e),
                    None,
                ));
            }
        }

        Ok(())
    }

    /// Move every entry that shares its creation time with an entry read
    /// earlier to the next free second and mark its node modified
    fn separate_duplicate_creations(&mut self) -> usize {
        let mut ids = self.entries();
        ids.sort();

        let mut seen = HashSet::new();
        let duplicates: Vec<EntryId> = ids
            .into_iter()
            .filter(|id| !seen.insert(self.entry_ref(*id).creation()))
            .collect();

        for id in &duplicates {
            let old = self.entry_ref(*id).creation();
            let creation = self.free_creation(old);
            tracing::warn!(
                "Entry created at {} appears twice in {:?}, moved to {}",
                old,
                self.node(self.owner(*id)).file(),
                creation
            );
            self.modify_entry(*id, |entry| {
                entry.set_creation(creation);
                entry.modification = entry.modification.max(creation);
            });
        }

        duplicates.len()
    }

    /// Parse problems recorded anywhere in the tree
    pub fn xml_errors(&self) -> Vec<XmlError> {
        self.nodes()
            .into_iter()
            .flat_map(|node| self.node(node).xml_errors.clone())
            .collect()
    }

    /// Save the tree
    ///
    /// With `None`, modified nodes are written to their own files. Given a
    /// different path, the root moves there, child files are renamed after
    /// it and every node is written.
    ///
    /// Nothing is written if a node that needs writing is read-only or was
    /// not read completely (see [`Logbook::clear_xml_errors`]). Child files
    /// left over from removed or renamed nodes are deleted afterwards.
    pub fn write(&mut self, file: Option<&Path>) -> Result<()> {
        let target = match file {
            Some(file) => file.to_path_buf(),
            None => self.root_node().file.clone().ok_or(LogbookError::NoFile)?,
        };

        let save_as = self.root_node().file() != Some(target.as_path());
        if save_as {
            tracing::info!("Saving logbook as {:?}", target);
            self.root_node_mut().file = Some(target.clone());
            for node in self.nodes() {
                self.node_mut(node).read_only = false;
            }
            self.set_modified_recursive(true);
        }

        if let Some(directory) = self.root_node().directory() {
            if directory.exists() && !directory.is_dir() {
                return Err(LogbookError::NotADirectory(directory.to_path_buf()));
            }
        }

        self.assign_files(ROOT, &target, !save_as);

        for id in self.nodes() {
            let node = self.node(id);
            if !node.modified {
                continue;
            }
            let file = node.file.clone().unwrap_or_else(|| target.clone());
            if node.is_incomplete() {
                return Err(LogbookError::Incomplete(file));
            }
            if node.read_only {
                return Err(LogbookError::ReadOnly(file));
            }
        }

        let written = self.write_node(ROOT)?;
        tracing::info!("Saved logbook {:?} ({} files written)", target, written);

        let orphaned = self.take_orphaned_files();
        if !save_as {
            self.delete_orphaned_files(orphaned);
        }

        Ok(())
    }

    /// Name every descendant of `node` after its parent's file and point it
    /// back to the root; nodes whose name changes are marked modified
    fn assign_files(&mut self, node: NodeId, root: &Path, track_renames: bool) {
        let Some(path) = self.node(node).file.clone() else {
            return;
        };

        let children = self.node(node).children.clone();
        for (index, child) in children.into_iter().enumerate() {
            let target = self.node_mut(child);
            let previous = target.file.clone();

            let renamed = target.set_file(child_filename(&path, index));
            let reparented = target.set_parent_file(root);
            if renamed || reparented {
                target.set_modified(true);
            }

            if renamed && track_renames {
                if let Some(previous) = previous {
                    self.add_orphaned_file(previous);
                }
            }

            self.assign_files(child, root, track_renames);
        }
    }

    fn write_node(&mut self, node: NodeId) -> Result<usize> {
        let children = self.node(node).children.clone();

        let mut written = 0;
        if self.node(node).modified {
            let path = self.node(node).file.clone().ok_or(LogbookError::NoFile)?;
            let child_paths: Vec<PathBuf> = children
                .iter()
                .filter_map(|child| self.node(*child).file.clone())
                .collect();

            self.node_mut(node).header.saved = Some(now());
            let child_names = file_names(&child_paths);

            write_document(&path, &self.document_ref(node, &child_names))?;

            let entry_count = self.relations.entry_count(node);
            let target = self.node_mut(node);
            target.header.entry_count = entry_count;
            target.header.child_count = children.len();
            target.modified = false;
            written += 1;
        }

        for child in children {
            written += self.write_node(child)?;
        }

        Ok(written)
    }

    /// Remove files that no node of the tree uses any more
    fn delete_orphaned_files(&self, files: Vec<PathBuf>) {
        let live: HashSet<PathBuf> = self
            .nodes()
            .into_iter()
            .filter_map(|node| self.node(node).file.clone())
            .collect();

        for file in files {
            if live.contains(&file) || !file.exists() {
                continue;
            }
            match fs::remove_file(&file) {
                Ok(()) => tracing::info!("Deleted unused child logbook {:?}", file),
                Err(e) => tracing::warn!("Failed to delete unused child logbook {:?}: {}", file, e),
            }
        }
    }

    /// Write a full copy of the tree rooted at `path` without touching the
    /// tree's own files, names or dirty flags
    pub fn write_copy(&self, path: &Path, as_backup: bool) -> Result<()> {
        tracing::info!("Writing logbook copy to {:?}", path);
        self.write_copy_node(ROOT, path, path, as_backup)
    }

    fn write_copy_node(&self, node: NodeId, path: &Path, root: &Path, as_backup: bool) -> Result<()> {
        let children = &self.node(node).children;
        let child_paths: Vec<PathBuf> = (0..children.len())
            .map(|index| child_filename(path, index))
            .collect();

        let mut header = self.node(node).header.clone();
        header.is_backup = as_backup;
        header.parent_file = (node != ROOT).then(|| root.to_path_buf());
        header.saved = Some(now());

        let child_names = file_names(&child_paths);
        let mut document = self.document_ref(node, &child_names);
        document.header = &header;
        write_document(path, &document)?;

        for (child, child_path) in children.iter().zip(&child_paths) {
            self.write_copy_node(*child, child_path, root, as_backup)?;
        }

        Ok(())
    }

    /// Borrowed view of one node, entries in creation order
    fn document_ref<'a>(
        &'a self,
        node: NodeId,
        child_names: &'a [String],
    ) -> DocumentRef<'a> {
        let target = self.node(node);

        let mut entries: Vec<(&'a Entry, Vec<&'a Attachment>)> = self
            .relations
            .entries_of(node)
            .map(|id| {
                let attachments = self
                    .relations
                    .attachments_of(id)
                    .map(|attachment| &self.attachment_arena[&attachment])
                    .collect();
                (self.entry_ref(id), attachments)
            })
            .collect();
        entries.sort_by_key(|(entry, _)| entry.creation());

        DocumentRef {
            header: &target.header,
            children: child_names,
            recent_entries: &target.recent_entries,
            entries,
            backups: &target.backups,
        }
    }
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect()
}
