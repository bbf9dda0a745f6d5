//! Hierarchical entry keywords
//!
//! Keywords are slash-delimited paths such as `/Work/Meetings`. The root
//! keyword is `/`.

use serde::{Deserialize, Serialize};
use std::fmt;

const SEPARATOR: char = '/';

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Keyword(String);

impl Default for Keyword {
    fn default() -> Self {
        Self::root()
    }
}

impl Keyword {
    /// Parse and normalize a keyword path
    pub fn new(value: &str) -> Self {
        let parts: Vec<&str> = value
            .split(SEPARATOR)
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        Self(format!("{}{}", SEPARATOR, parts.join("/")))
    }

    pub fn root() -> Self {
        Self(SEPARATOR.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path component, empty for the root
    pub fn current(&self) -> &str {
        self.0.rsplit(SEPARATOR).next().unwrap_or_default()
    }

    /// Parent keyword, the root being its own parent
    pub fn parent(&self) -> Self {
        match self.0.rfind(SEPARATOR) {
            Some(0) | None => Self::root(),
            Some(index) => Self(self.0[..index].to_string()),
        }
    }

    /// Child keyword with the given last component
    pub fn append(&self, name: &str) -> Self {
        Self::new(&format!("{}/{}", self.0, name))
    }

    /// True if `self` equals `other` or lies below it
    pub fn inherits_from(&self, other: &Keyword) -> bool {
        other.is_root()
            || self == other
            || (self.0.starts_with(&other.0) && self.0[other.0.len()..].starts_with(SEPARATOR))
    }

    /// Move this keyword from below `old` to below `new`
    ///
    /// Returns `None` when the keyword does not inherit from `old`.
    pub fn reparent(&self, old: &Keyword, new: &Keyword) -> Option<Self> {
        if !self.inherits_from(old) {
            return None;
        }

        let suffix = if old.is_root() { &self.0[..] } else { &self.0[old.0.len()..] };
        Some(Self::new(&format!("{}/{}", new.0, suffix)))
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Keyword {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(Keyword::new("Work/Meetings/").as_str(), "/Work/Meetings");
        assert_eq!(Keyword::new("//a//b").as_str(), "/a/b");
        assert_eq!(Keyword::new("").as_str(), "/");
        assert!(Keyword::new("  ").is_root());
    }

    #[test]
    fn test_parent_and_current() {
        let keyword = Keyword::new("/Work/Meetings");

        assert_eq!(keyword.current(), "Meetings");
        assert_eq!(keyword.parent(), Keyword::new("/Work"));
        assert_eq!(keyword.parent().parent(), Keyword::root());
        assert_eq!(Keyword::root().parent(), Keyword::root());
        assert_eq!(Keyword::root().current(), "");
    }

    #[test]
    fn test_inherits_from() {
        let keyword = Keyword::new("/Work/Meetings");

        assert!(keyword.inherits_from(&Keyword::new("/Work")));
        assert!(keyword.inherits_from(&keyword));
        assert!(keyword.inherits_from(&Keyword::root()));
        assert!(!keyword.inherits_from(&Keyword::new("/Wo")));
        assert!(!Keyword::new("/Work").inherits_from(&keyword));
    }

    #[test]
    fn test_reparent() {
        let keyword = Keyword::new("/Work/Meetings/Weekly");

        assert_eq!(
            keyword.reparent(&Keyword::new("/Work"), &Keyword::new("/Archive/Work")),
            Some(Keyword::new("/Archive/Work/Meetings/Weekly"))
        );
        assert_eq!(
            keyword.reparent(&Keyword::new("/Work/Meetings"), &Keyword::new("/Calls")),
            Some(Keyword::new("/Calls/Weekly"))
        );
        assert_eq!(keyword.reparent(&Keyword::new("/Home"), &Keyword::root()), None);
        assert_eq!(
            keyword.reparent(&Keyword::root(), &Keyword::new("/Old")),
            Some(Keyword::new("/Old/Work/Meetings/Weekly"))
        );
    }

    #[test]
    fn test_append() {
        assert_eq!(Keyword::root().append("Work"), Keyword::new("/Work"));
        assert_eq!(Keyword::new("/Work").append("Calls"), Keyword::new("/Work/Calls"));
    }
}
