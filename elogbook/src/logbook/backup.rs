//! Backup lifecycle
//!
//! Backup records live on the root node. A backup is a full snapshot of the
//! tree written next to the logbook file, flagged as backup so that it never
//! asks for a backup itself.

use super::{child_filename, Logbook};
use crate::config::BACKUP_FILE_INFIX;
use crate::error::{LogbookError, Result};
use crate::model::{now, Backup, BackupList, TimeStamp};
use std::fs;
use std::path::{Path, PathBuf};

impl Logbook {
    /// True when an automatic backup is due now
    pub fn needs_backup(&self) -> bool {
        self.needs_backup_at(now())
    }

    /// True when an automatic backup is due at `time`
    ///
    /// The reference point is the last backup, or the logbook creation when
    /// no backup was ever taken. Backups themselves and logbooks without a
    /// file never need one.
    pub fn needs_backup_at(&self, time: TimeStamp) -> bool {
        let root = self.root_node();
        if !self.config.auto_backup || root.is_backup() || root.file().is_none() {
            return false;
        }

        let last = root
            .backup()
            .or_else(|| root.backups.latest().map(|backup| backup.creation))
            .unwrap_or_else(|| root.creation());

        time - last > self.config.backup_interval()
    }

    /// Name of the next backup file, derived from the root file and today's
    /// date
    ///
    /// `log.xml` gives `log_backup_20240131.xml`; when that exists a numeric
    /// suffix is appended (`log_backup_20240131_1.xml`, ...).
    pub fn backup_filename(&self) -> Result<PathBuf> {
        let file = self.file().ok_or(LogbookError::NoFile)?;
        Ok(backup_filename_at(file, now()))
    }

    /// Record a new backup taken now and mark the root modified
    pub fn add_backup(&mut self, file: impl Into<PathBuf>) {
        let creation = now();
        let root = self.root_node_mut();
        root.backups.push(Backup::new(file, creation));
        root.header.backup = Some(creation);
        root.set_modified(true);
    }

    /// Replace the whole backup list; returns whether it changed
    pub fn set_backup_files(&mut self, backups: Vec<Backup>) -> bool {
        let root = self.root_node_mut();
        if root.backups == backups {
            return false;
        }
        root.backups = backups;
        root.set_modified(true);
        true
    }

    /// Drop the backup record at `index`
    ///
    /// With `delete_files`, the snapshot file and its child files are
    /// removed from disk as well.
    pub fn remove_backup(&mut self, index: usize, delete_files: bool) -> Result<Option<Backup>> {
        if index >= self.root_node().backups.len() {
            return Ok(None);
        }

        let root = self.root_node_mut();
        let backup = root.backups.remove(index);
        root.set_modified(true);

        if delete_files {
            let removed = remove_snapshot(&backup.file)?;
            tracing::info!("Deleted backup {:?} ({} files)", backup.file, removed);
        }

        Ok(Some(backup))
    }

    pub fn backup_files(&self) -> &[Backup] {
        self.root_node().backup_files()
    }

    /// Re-stat every backup record; returns the number still valid
    pub fn check_backup_validity(&mut self) -> usize {
        let backups = &mut self.root_node_mut().backups;
        backups.check_validity();
        backups.valid_count()
    }

    /// Write a snapshot of the whole tree to [`Logbook::backup_filename`]
    /// and record it
    ///
    /// The live tree keeps its own files; only the root is marked modified
    /// by the new record.
    pub fn save_backup(&mut self) -> Result<PathBuf> {
        if self.root_node().is_backup() {
            return Err(LogbookError::Backup(
                "cannot back up a logbook that is itself a backup".to_string(),
            ));
        }

        let path = self.backup_filename()?;
        if let Some(directory) = path.parent() {
            if !directory.as_os_str().is_empty() && !directory.is_dir() {
                return Err(LogbookError::NotADirectory(directory.to_path_buf()));
            }
        }

        self.write_copy(&path, true)?;
        self.add_backup(&path);

        tracing::info!("Backup saved to {:?}", path);
        Ok(path)
    }
}

fn backup_filename_at(file: &Path, time: TimeStamp) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = file
        .extension()
        .map(|extension| format!(".{}", extension.to_string_lossy()))
        .unwrap_or_default();
    let date = time.format("%Y%m%d");

    let mut candidate = file.with_file_name(format!("{}{}{}{}", stem, BACKUP_FILE_INFIX, date, extension));
    let mut suffix = 1;
    while candidate.exists() {
        candidate = file.with_file_name(format!(
            "{}{}{}_{}{}",
            stem, BACKUP_FILE_INFIX, date, suffix, extension
        ));
        suffix += 1;
    }
    candidate
}

/// Remove a snapshot root file and, recursively, its child files
fn remove_snapshot(file: &Path) -> Result<usize> {
    let mut removed = 0;

    let mut index = 0;
    loop {
        let child = child_filename(file, index);
        if !child.exists() {
            break;
        }
        removed += remove_snapshot(&child)?;
        index += 1;
    }

    if file.exists() {
        fs::remove_file(file)?;
        removed += 1;
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogbookConfig;
    use crate::model::{from_unix, Entry};
    use chrono::Duration;
    use tempfile::TempDir;

    fn logbook_at(path: &Path, max_entries: usize) -> Logbook {
        Logbook::with_file(
            path,
            LogbookConfig {
                max_entries,
                ..LogbookConfig::default()
            },
        )
    }

    #[test]
    fn test_needs_backup_after_interval() {
        let temp_dir = TempDir::new().unwrap();
        let logbook = logbook_at(&temp_dir.path().join("log.xml"), 5);
        let created = logbook.root_node().creation();

        assert!(!logbook.needs_backup_at(created + Duration::days(29)));
        assert!(logbook.needs_backup_at(created + Duration::days(31)));
    }

    #[test]
    fn test_needs_backup_disabled_cases() {
        let later = now() + Duration::days(400);

        let no_file = Logbook::new(LogbookConfig::default());
        assert!(!no_file.needs_backup_at(later));

        let disabled = Logbook::with_file(
            "log.xml",
            LogbookConfig {
                auto_backup: false,
                ..LogbookConfig::default()
            },
        );
        assert!(!disabled.needs_backup_at(later));

        let mut backup = Logbook::with_file("log.xml", LogbookConfig::default());
        backup.root_node_mut().header.is_backup = true;
        assert!(!backup.needs_backup_at(later));
    }

    #[test]
    fn test_add_backup_resets_interval() {
        let mut logbook = Logbook::with_file("log.xml", LogbookConfig::default());
        logbook.root_node_mut().header.creation = from_unix(0);
        logbook.set_modified_recursive(false);
        assert!(logbook.needs_backup());

        logbook.add_backup("log_backup_x.xml");

        assert!(!logbook.needs_backup());
        assert_eq!(logbook.backup_files().len(), 1);
        assert!(logbook.root_node().is_modified());
    }

    #[test]
    fn test_backup_filename_avoids_collisions() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("log.xml");
        let time = from_unix(1_706_659_200); // 2024-01-31

        let first = backup_filename_at(&file, time);
        assert_eq!(first, temp_dir.path().join("log_backup_20240131.xml"));

        fs::write(&first, b"<Logbook/>").unwrap();
        let second = backup_filename_at(&file, time);
        assert_eq!(second, temp_dir.path().join("log_backup_20240131_1.xml"));
    }

    #[test]
    fn test_backup_filename_requires_file() {
        let logbook = Logbook::new(LogbookConfig::default());
        assert!(matches!(logbook.backup_filename(), Err(LogbookError::NoFile)));
    }

    #[test]
    fn test_save_backup_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.xml");
        let mut logbook = logbook_at(&path, 1);
        for creation in 1..=3 {
            logbook.add_entry(Entry::new(from_unix(creation)));
        }
        logbook.write(None).unwrap();

        let backup = logbook.save_backup().unwrap();

        assert!(backup.exists());
        assert!(child_filename(&backup, 0).exists());
        assert_eq!(logbook.file(), Some(path.as_path()));
        assert_eq!(logbook.backup_files().len(), 1);
        assert!(logbook.root_node().is_modified());
        assert!(!logbook.node(logbook.children(logbook.root())[0]).is_modified());

        let copy = Logbook::open(&backup, LogbookConfig::default()).unwrap();
        assert!(copy.root_node().is_backup());
        assert_eq!(copy.entries().len(), 3);
        assert!(!copy.needs_backup_at(now() + Duration::days(400)));
    }

    #[test]
    fn test_validity_and_removal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.xml");
        let mut logbook = logbook_at(&path, 1);
        logbook.add_entry(Entry::new(from_unix(1)));
        logbook.add_entry(Entry::new(from_unix(2)));
        logbook.write(None).unwrap();

        let kept = logbook.save_backup().unwrap();
        let missing = temp_dir.path().join("gone.xml");
        logbook.add_backup(&missing);

        assert_eq!(logbook.check_backup_validity(), 1);
        assert_eq!(logbook.backup_files().len(), 2);
        assert!(!logbook.backup_files()[1].is_valid());

        let removed = logbook.remove_backup(0, true).unwrap().unwrap();
        assert_eq!(removed.file, kept);
        assert!(!kept.exists());
        assert!(!child_filename(&kept, 0).exists());
        assert!(logbook.remove_backup(5, false).unwrap().is_none());
    }

    #[test]
    fn test_set_backup_files_reports_change() {
        let mut logbook = Logbook::with_file("log.xml", LogbookConfig::default());
        let list = vec![Backup::new("a.xml", from_unix(1))];

        assert!(logbook.set_backup_files(list.clone()));
        assert!(!logbook.set_backup_files(list));
    }
}
