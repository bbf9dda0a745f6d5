//! Backup records
//!
//! A backup record points at one snapshot file of a logbook. Records are
//! never removed automatically: a record whose file disappeared is only
//! flagged invalid.

use super::TimeStamp;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    pub file: PathBuf,
    pub creation: TimeStamp,
    #[serde(skip)]
    valid: bool,
}

impl Backup {
    pub fn new(file: impl Into<PathBuf>, creation: TimeStamp) -> Self {
        let file = file.into();
        let valid = file.exists();
        Self {
            file,
            creation,
            valid,
        }
    }

    /// True iff the snapshot file existed at the last validity check
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn check_validity(&mut self) {
        self.valid = self.file.exists();
    }
}

/// Operations on a list of backup records
pub trait BackupList {
    /// Re-stat every record, flagging the ones whose file is gone
    fn check_validity(&mut self);

    /// Number of records whose file still exists
    fn valid_count(&self) -> usize;

    /// Most recent record by creation time
    fn latest(&self) -> Option<&Backup>;
}

impl BackupList for Vec<Backup> {
    fn check_validity(&mut self) {
        for backup in self.iter_mut() {
            backup.check_validity();
            if !backup.is_valid() {
                tracing::debug!("Backup file missing: {:?}", backup.file);
            }
        }
    }

    fn valid_count(&self) -> usize {
        self.iter().filter(|backup| backup.is_valid()).count()
    }

    fn latest(&self) -> Option<&Backup> {
        self.iter().max_by_key(|backup| backup.creation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::from_unix;
    use tempfile::TempDir;

    #[test]
    fn test_check_validity_flags_deleted_files() {
        let temp_dir = TempDir::new().unwrap();
        let kept = temp_dir.path().join("kept.xml");
        let removed = temp_dir.path().join("removed.xml");
        std::fs::write(&kept, b"<Logbook/>").unwrap();
        std::fs::write(&removed, b"<Logbook/>").unwrap();

        let mut backups = vec![
            Backup::new(&kept, from_unix(100)),
            Backup::new(&removed, from_unix(200)),
        ];
        assert_eq!(backups.valid_count(), 2);

        std::fs::remove_file(&removed).unwrap();
        backups.check_validity();

        assert_eq!(backups.len(), 2);
        assert!(backups[0].is_valid());
        assert!(!backups[1].is_valid());
        assert_eq!(backups.valid_count(), 1);
    }

    #[test]
    fn test_latest() {
        let backups = vec![
            Backup::new("a.xml", from_unix(300)),
            Backup::new("b.xml", from_unix(100)),
        ];

        assert_eq!(backups.latest().map(|b| b.creation), Some(from_unix(300)));
        assert!(Vec::<Backup>::new().latest().is_none());
    }
}
