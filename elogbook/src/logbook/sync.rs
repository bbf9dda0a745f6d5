//! Merging two logbook trees
//!
//! Entries are matched by creation time. When both trees hold an entry with
//! the same creation time, the copy with the more recent modification time
//! wins; on an exact tie the local copy is kept.

use super::Logbook;
use crate::model::{EntryId, TimeStamp};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Outcome of a two-way synchronization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries copied from remote into local
    pub copied_to_local: usize,
    /// Entries copied from local into remote
    pub copied_to_remote: usize,
    /// Local entries removed because remote held a newer copy
    pub replaced_in_local: usize,
    /// Remote entries removed because local held a newer copy
    pub replaced_in_remote: usize,
}

impl Logbook {
    /// Copy into this tree every entry of `other` that is missing here or
    /// newer than the local entry with the same creation time
    ///
    /// Copies are inserted through [`Logbook::latest_child`] and keep their
    /// creation time. The returned map pairs each superseded local entry with
    /// its replacement; the superseded entries are left in place for the
    /// caller to delete. If several local entries share a creation time, all
    /// but the newest are superseded by it, or all of them by a newer copy.
    pub fn synchronize(&mut self, other: &Logbook) -> BTreeMap<EntryId, EntryId> {
        let local = self.entries_by_creation();
        let mut duplicates = BTreeMap::new();

        let mut winners = BTreeMap::new();
        for (creation, ids) in &local {
            let winner = self.newest_of(ids);
            for id in ids.iter().filter(|id| **id != winner) {
                duplicates.insert(*id, winner);
            }
            winners.insert(*creation, winner);
        }

        let mut copied = 0;
        for (creation, ids) in other.entries_by_creation() {
            let remote_id = other.newest_of(&ids);
            let remote = other.entry_ref(remote_id);

            if let Some(winner) = winners.get(&creation) {
                if self.entry_ref(*winner).modification >= remote.modification {
                    continue;
                }
            }

            let mut entry = remote.clone();
            entry.find_selected = false;
            entry.keyword_selected = false;

            let node = self.latest_child();
            let new_id = self.insert_entry(node, entry);
            for attachment in other.attachments_of(remote_id) {
                if let Some(attachment) = other.attachment(attachment) {
                    self.insert_attachment(new_id, attachment.clone());
                }
            }
            self.node_mut(node).set_modified(true);
            copied += 1;

            for local_id in local.get(&creation).into_iter().flatten() {
                duplicates.insert(*local_id, new_id);
            }
        }

        tracing::info!(
            "Synchronized from {:?}: {} entries copied, {} superseded",
            other.file(),
            copied,
            duplicates.len()
        );

        duplicates
    }

    fn entries_by_creation(&self) -> BTreeMap<TimeStamp, Vec<EntryId>> {
        let mut result: BTreeMap<TimeStamp, Vec<EntryId>> = BTreeMap::new();
        for id in self.entries() {
            result.entry(self.entry_ref(id).creation()).or_default().push(id);
        }
        result
    }

    /// Most recently modified of `ids`, lowest id on a tie
    fn newest_of(&self, ids: &[EntryId]) -> EntryId {
        ids.iter()
            .copied()
            .min_by_key(|id| (Reverse(self.entry_ref(*id).modification), *id))
            .unwrap_or_else(|| panic!("no entries to choose from"))
    }
}

/// Run both synchronization passes and delete superseded entries on each
/// side, leaving both trees with the same content
///
/// Both trees still have to be written by the caller.
pub fn synchronize_logbooks(local: &mut Logbook, remote: &mut Logbook) -> SyncReport {
    let local_before = local.entries().len();
    let duplicates = local.synchronize(remote);
    let copied_to_local = local.entries().len() - local_before;
    for superseded in duplicates.keys() {
        local.delete_entry(*superseded);
    }

    let remote_before = remote.entries().len();
    let remote_duplicates = remote.synchronize(local);
    let copied_to_remote = remote.entries().len() - remote_before;
    for superseded in remote_duplicates.keys() {
        remote.delete_entry(*superseded);
    }

    SyncReport {
        copied_to_local,
        copied_to_remote,
        replaced_in_local: duplicates.len(),
        replaced_in_remote: remote_duplicates.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogbookConfig;
    use crate::model::{from_unix, Attachment, Entry};
    use std::collections::BTreeSet;

    fn logbook() -> Logbook {
        Logbook::new(LogbookConfig {
            max_entries: 2,
            ..LogbookConfig::default()
        })
    }

    fn entry(creation: i64, modification: i64, title: &str) -> Entry {
        let mut entry = Entry::new(from_unix(creation));
        entry.modification = from_unix(modification);
        entry.title = title.to_string();
        entry
    }

    fn content(logbook: &Logbook) -> BTreeSet<(i64, i64, String, String)> {
        logbook
            .entries()
            .into_iter()
            .map(|id| {
                let (creation, modification, title, _, text, _) =
                    logbook.entry(id).unwrap().content_key();
                (creation.timestamp(), modification.timestamp(), title.to_string(), text.to_string())
            })
            .collect()
    }

    #[test]
    fn test_newer_remote_supersedes_local() {
        let mut a = logbook();
        let mut b = logbook();
        let e1 = a.add_entry(entry(100, 200, "old"));
        b.add_entry(entry(100, 300, "new"));

        let duplicates = a.synchronize(&b);

        assert_eq!(duplicates.len(), 1);
        let replacement = duplicates[&e1];
        assert_eq!(a.entry(replacement).unwrap().modification, from_unix(300));
        assert_eq!(a.entry(replacement).unwrap().title, "new");
        // superseded entry is left for the caller
        assert!(a.entry(e1).is_some());
        assert_eq!(a.entries().len(), 2);
    }

    #[test]
    fn test_older_or_equal_remote_is_skipped() {
        let mut a = logbook();
        let mut b = logbook();
        a.add_entry(entry(100, 300, "local"));
        a.add_entry(entry(200, 200, "local tie"));
        b.add_entry(entry(100, 250, "remote older"));
        b.add_entry(entry(200, 200, "remote tie"));

        assert!(a.synchronize(&b).is_empty());
        assert_eq!(a.entries().len(), 2);
        assert!(content(&a).iter().any(|(_, _, title, _)| title == "local tie"));
    }

    #[test]
    fn test_two_pass_convergence() {
        let mut a = logbook();
        let mut b = logbook();
        a.add_entry(entry(1, 10, "only a"));
        a.add_entry(entry(2, 50, "a newer"));
        a.add_entry(entry(3, 10, "b newer (a copy)"));
        b.add_entry(entry(2, 20, "a newer (b copy)"));
        b.add_entry(entry(3, 90, "b newer"));
        b.add_entry(entry(4, 10, "only b"));
        let with_attachment = b.add_entry(entry(5, 10, "with attachment"));
        b.add_attachment(with_attachment, Attachment::new("https://example.org"));

        a.set_modified_recursive(false);
        b.set_modified_recursive(false);

        let report = synchronize_logbooks(&mut a, &mut b);

        assert_eq!(content(&a), content(&b));
        assert_eq!(a.entries().len(), 5);

        let modifications: BTreeMap<i64, i64> = content(&a)
            .into_iter()
            .map(|(creation, modification, _, _)| (creation, modification))
            .collect();
        assert_eq!(modifications[&2], 50);
        assert_eq!(modifications[&3], 90);

        assert_eq!(report.replaced_in_local, 1);
        assert_eq!(report.replaced_in_remote, 1);
        assert_eq!(report.copied_to_local, 3);
        assert_eq!(report.copied_to_remote, 2);
        assert_eq!(a.attachments().len(), 1);
        assert!(a.modified());
        assert!(b.modified());

        for node in a.nodes() {
            assert!(a.owned_entry_count(node) <= 2);
        }
    }

    #[test]
    fn test_same_second_entries_converge() {
        let mut a = logbook();
        let mut b = logbook();
        a.add_entry(entry(100, 200, "a1"));
        a.add_entry(entry(100, 250, "a2"));
        b.add_entry(entry(100, 300, "b"));

        synchronize_logbooks(&mut a, &mut b);

        assert_eq!(content(&a), content(&b));
        let expected: BTreeSet<(i64, i64, String, String)> = [
            (100, 300, "b".to_string(), String::new()),
            (101, 250, "a2".to_string(), String::new()),
        ]
        .into_iter()
        .collect();
        assert_eq!(content(&a), expected);
    }

    #[test]
    fn test_every_local_duplicate_is_superseded() {
        let mut a = logbook();
        let mut b = logbook();
        let root = a.root();
        let a1 = a.insert_entry(root, entry(100, 200, "a1"));
        let a2 = a.insert_entry(root, entry(100, 250, "a2"));
        b.add_entry(entry(100, 300, "b"));

        let duplicates = a.synchronize(&b);
        assert_eq!(duplicates.len(), 2);
        assert_eq!(duplicates[&a1], duplicates[&a2]);

        let report = synchronize_logbooks(&mut a, &mut b);
        assert_eq!(report.replaced_in_local, 2);
        assert_eq!(content(&a), content(&b));
        assert_eq!(a.entries().len(), 1);
        assert_eq!(a.entry(a.entries()[0]).unwrap().title, "b");
    }

    #[test]
    fn test_local_duplicates_collapse_onto_newest() {
        let mut a = logbook();
        let mut b = logbook();
        let root = a.root();
        let a1 = a.insert_entry(root, entry(100, 200, "a1"));
        let a2 = a.insert_entry(root, entry(100, 250, "a2"));
        b.add_entry(entry(100, 220, "b"));

        let duplicates = a.synchronize(&b);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[&a1], a2);

        synchronize_logbooks(&mut a, &mut b);
        assert_eq!(content(&a), content(&b));
        assert_eq!(b.entry(b.entries()[0]).unwrap().title, "a2");
    }

    #[test]
    fn test_synchronize_with_itself_copy_is_noop() {
        let mut a = logbook();
        a.add_entry(entry(1, 1, "x"));
        let b = a.clone();

        assert!(a.synchronize(&b).is_empty());
        assert_eq!(a.entries().len(), 1);
    }
}
