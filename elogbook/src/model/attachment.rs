//! File and URL attachments

use super::{from_unix, TimeStamp};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Kind of attached document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttachmentType {
    #[default]
    Unknown,
    PlainText,
    Html,
    Url,
    Postscript,
    Image,
}

impl AttachmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            AttachmentType::Unknown => "unknown",
            AttachmentType::PlainText => "plain_text",
            AttachmentType::Html => "html",
            AttachmentType::Url => "url",
            AttachmentType::Postscript => "postscript",
            AttachmentType::Image => "image",
        }
    }

    /// Guess the type of a file or URL from its name
    pub fn guess(file: &str) -> Self {
        let lower = file.to_lowercase();
        if ["http://", "https://", "ftp://", "www."]
            .iter()
            .any(|prefix| lower.starts_with(prefix))
        {
            return AttachmentType::Url;
        }

        let extension = Path::new(&lower)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();

        match extension.as_str() {
            "txt" | "log" | "cpp" | "h" | "rs" | "py" | "sh" | "md" => AttachmentType::PlainText,
            "html" | "htm" => AttachmentType::Html,
            "ps" | "eps" => AttachmentType::Postscript,
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "svg" | "tif" | "tiff" => AttachmentType::Image,
            _ => AttachmentType::Unknown,
        }
    }
}

impl FromStr for AttachmentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(AttachmentType::Unknown),
            "plain_text" => Ok(AttachmentType::PlainText),
            "html" => Ok(AttachmentType::Html),
            "url" => Ok(AttachmentType::Url),
            "postscript" => Ok(AttachmentType::Postscript),
            "image" => Ok(AttachmentType::Image),
            other => Err(format!("Unknown attachment type: {}", other)),
        }
    }
}

/// Whether the attached file was copied into the logbook directory or is
/// referenced in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Provenance {
    #[default]
    Copied,
    Linked,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Copied => "copy",
            Provenance::Linked => "link",
        }
    }
}

impl FromStr for Provenance {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "copy" => Ok(Provenance::Copied),
            "link" => Ok(Provenance::Linked),
            other => Err(format!("Unknown attachment provenance: {}", other)),
        }
    }
}

/// A reference to an external file or URL attached to one entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// File path, or the URL itself for [`AttachmentType::Url`]
    pub file: String,
    /// File the attachment was created from
    pub source_file: Option<String>,
    pub attachment_type: AttachmentType,
    pub comments: String,
    pub provenance: Provenance,
    pub size: Option<u64>,
    pub modification: Option<TimeStamp>,
    #[serde(skip)]
    pub is_valid: bool,
}

impl Attachment {
    pub fn new(file: impl Into<String>) -> Self {
        let file = file.into();
        Self {
            attachment_type: AttachmentType::guess(&file),
            file,
            source_file: None,
            comments: String::new(),
            provenance: Provenance::Copied,
            size: None,
            modification: None,
            is_valid: false,
        }
    }

    pub fn is_url(&self) -> bool {
        self.attachment_type == AttachmentType::Url
    }

    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.file)
    }

    /// Re-stat the underlying file and refresh the cached size and time
    ///
    /// Returns true if any cached value changed.
    pub fn update_time_stamps(&mut self) -> bool {
        if self.is_url() {
            let changed = !self.is_valid;
            self.is_valid = true;
            return changed;
        }

        let (valid, size, modification) = match std::fs::metadata(&self.file) {
            Ok(metadata) => {
                let modification = metadata
                    .modified()
                    .ok()
                    .and_then(|time| time.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|elapsed| from_unix(elapsed.as_secs() as i64));
                (true, Some(metadata.len()), modification)
            }
            Err(_) => (false, None, None),
        };

        let changed =
            valid != self.is_valid || size != self.size || modification != self.modification;

        self.is_valid = valid;
        self.size = size;
        self.modification = modification;
        changed
    }

    /// True if both records reference the same on-disk file (or URL)
    pub fn is_same_file(&self, other: &Attachment) -> bool {
        if self.is_url() || other.is_url() {
            return self.is_url() && other.is_url() && self.file == other.file;
        }

        if self.file == other.file {
            return true;
        }

        match (
            std::fs::canonicalize(&self.file),
            std::fs::canonicalize(&other.file),
        ) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_guess_type() {
        assert_eq!(AttachmentType::guess("https://example.org"), AttachmentType::Url);
        assert_eq!(AttachmentType::guess("/tmp/plot.PNG"), AttachmentType::Image);
        assert_eq!(AttachmentType::guess("notes.txt"), AttachmentType::PlainText);
        assert_eq!(AttachmentType::guess("page.html"), AttachmentType::Html);
        assert_eq!(AttachmentType::guess("figure.eps"), AttachmentType::Postscript);
        assert_eq!(AttachmentType::guess("archive.tar"), AttachmentType::Unknown);
    }

    #[test]
    fn test_type_names_parse_back() {
        for kind in [
            AttachmentType::Unknown,
            AttachmentType::PlainText,
            AttachmentType::Html,
            AttachmentType::Url,
            AttachmentType::Postscript,
            AttachmentType::Image,
        ] {
            assert_eq!(kind.as_str().parse::<AttachmentType>(), Ok(kind));
        }
        assert!("movie".parse::<AttachmentType>().is_err());
    }

    #[test]
    fn test_update_time_stamps() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.txt");
        std::fs::write(&path, b"12345").unwrap();

        let mut attachment = Attachment::new(path.to_string_lossy());
        assert!(attachment.update_time_stamps());
        assert!(attachment.is_valid);
        assert_eq!(attachment.size, Some(5));
        assert!(attachment.modification.is_some());

        assert!(!attachment.update_time_stamps());

        std::fs::remove_file(&path).unwrap();
        assert!(attachment.update_time_stamps());
        assert!(!attachment.is_valid);
        assert_eq!(attachment.size, None);
    }

    #[test]
    fn test_is_same_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shared.txt");
        std::fs::write(&path, b"shared").unwrap();

        let a = Attachment::new(path.to_string_lossy());
        let b = Attachment::new(temp_dir.path().join(".").join("shared.txt").to_string_lossy());
        let c = Attachment::new(temp_dir.path().join("other.txt").to_string_lossy());
        let url = Attachment::new("https://example.org/shared.txt");

        assert!(a.is_same_file(&b));
        assert!(!a.is_same_file(&c));
        assert!(!a.is_same_file(&url));
        assert!(url.is_same_file(&Attachment::new("https://example.org/shared.txt")));
    }
}
