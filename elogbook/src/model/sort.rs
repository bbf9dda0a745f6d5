//! Entry sort preferences stored in logbook headers

use super::Entry;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortMethod {
    #[default]
    Creation,
    Modification,
    Title,
    Keyword,
    Author,
    Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            SortMethod::Creation => "creation",
            SortMethod::Modification => "modification",
            SortMethod::Title => "title",
            SortMethod::Keyword => "keyword",
            SortMethod::Author => "author",
            SortMethod::Color => "color",
        }
    }

    /// Compare two entries; ties fall back to creation time
    pub fn compare(self, a: &Entry, b: &Entry) -> Ordering {
        let primary = match self {
            SortMethod::Creation => Ordering::Equal,
            SortMethod::Modification => a.modification.cmp(&b.modification),
            SortMethod::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortMethod::Keyword => a.keyword.cmp(&b.keyword),
            SortMethod::Author => a.author.cmp(&b.author),
            SortMethod::Color => a.color.cmp(&b.color),
        };
        primary.then_with(|| a.creation().cmp(&b.creation()))
    }
}

impl FromStr for SortMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "creation" => Ok(SortMethod::Creation),
            "modification" => Ok(SortMethod::Modification),
            "title" => Ok(SortMethod::Title),
            "keyword" => Ok(SortMethod::Keyword),
            "author" => Ok(SortMethod::Author),
            "color" => Ok(SortMethod::Color),
            other => Err(format!("Unknown sort method: {}", other)),
        }
    }
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ascending" => Ok(SortOrder::Ascending),
            "descending" => Ok(SortOrder::Descending),
            other => Err(format!("Unknown sort order: {}", other)),
        }
    }
}
