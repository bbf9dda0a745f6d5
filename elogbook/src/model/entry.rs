//! Logbook entries

use super::{now, Keyword, TimeStamp};
use serde::{Deserialize, Serialize};

/// A timestamped, titled and keyworded text record
///
/// The creation time stamp is the identity of an entry across logbook trees
/// and does not change once the entry belongs to a tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    creation: TimeStamp,
    pub modification: TimeStamp,
    pub title: String,
    pub keyword: Keyword,
    pub text: String,
    pub author: String,
    pub color: Option<String>,
    /// Set by the find bar, never persisted
    #[serde(skip)]
    pub find_selected: bool,
    /// Set by the keyword tree, never persisted
    #[serde(skip)]
    pub keyword_selected: bool,
}

impl Entry {
    /// Create an empty entry created and modified at `creation`
    pub fn new(creation: TimeStamp) -> Self {
        Self {
            creation,
            modification: creation,
            title: String::new(),
            keyword: Keyword::root(),
            text: String::new(),
            author: String::new(),
            color: None,
            find_selected: false,
            keyword_selected: false,
        }
    }

    /// Create an empty entry stamped with the current time
    pub fn now() -> Self {
        Self::new(now())
    }

    pub fn creation(&self) -> TimeStamp {
        self.creation
    }

    /// Move the creation stamp, used to keep stamps unique within a tree
    pub(crate) fn set_creation(&mut self, creation: TimeStamp) {
        self.creation = creation;
    }

    /// Record a modification at the current time
    pub fn touch(&mut self) {
        self.modification = now();
    }

    /// Case-insensitive match of `query` against title, keyword, author and text
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();

        self.title.to_lowercase().contains(&query)
            || self.keyword.as_str().to_lowercase().contains(&query)
            || self.author.to_lowercase().contains(&query)
            || self.text.to_lowercase().contains(&query)
    }

    /// Fields compared when checking that two trees hold the same content
    pub fn content_key(&self) -> (TimeStamp, TimeStamp, &str, &str, &str, &str) {
        (
            self.creation,
            self.modification,
            self.title.as_str(),
            self.keyword.as_str(),
            self.text.as_str(),
            self.author.as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::from_unix;

    #[test]
    fn test_new_entry_defaults() {
        let entry = Entry::new(from_unix(100));

        assert_eq!(entry.creation(), from_unix(100));
        assert_eq!(entry.modification, from_unix(100));
        assert!(entry.keyword.is_root());
        assert!(entry.color.is_none());
    }

    #[test]
    fn test_touch_keeps_creation() {
        let mut entry = Entry::new(from_unix(100));
        entry.touch();

        assert_eq!(entry.creation(), from_unix(100));
        assert!(entry.modification > from_unix(100));
    }

    #[test]
    fn test_matches() {
        let mut entry = Entry::new(from_unix(100));
        entry.title = "Beam Test".to_string();
        entry.keyword = Keyword::new("/Runs/2024");
        entry.text = "Magnet current stable".to_string();

        assert!(entry.matches("beam"));
        assert!(entry.matches("runs"));
        assert!(entry.matches("MAGNET"));
        assert!(!entry.matches("vacuum"));
    }
}
