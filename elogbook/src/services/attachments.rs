//! Attachments service
//!
//! Brings external files into a logbook: either copied into the logbook's
//! attachment directory or linked in place.

use crate::error::{LogbookError, Result};
use crate::logbook::Logbook;
use crate::model::{Attachment, AttachmentType, Provenance};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Service for creating attachment records for one logbook directory
#[derive(Clone)]
pub struct AttachmentsService {
    directory: PathBuf,
}

impl AttachmentsService {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Service storing into the logbook's configured directory, or next to
    /// its root file when none is set
    pub fn for_logbook(logbook: &Logbook) -> Result<Self> {
        if let Some(directory) = logbook.root_node().directory() {
            return Ok(Self::new(directory));
        }

        let file = logbook.file().ok_or(LogbookError::NoFile)?;
        let directory = file.parent().unwrap_or(Path::new("")).to_path_buf();
        Ok(Self::new(directory))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Create an attachment record for `source`
    ///
    /// [`Provenance::Copied`] copies the file into the attachment directory
    /// under a free name; [`Provenance::Linked`] references it where it is.
    pub async fn import_file(&self, source: &Path, provenance: Provenance) -> Result<Attachment> {
        let metadata = fs::metadata(source)
            .await
            .map_err(|e| LogbookError::Attachment(format!("Cannot read {:?}: {}", source, e)))?;
        if !metadata.is_file() {
            return Err(LogbookError::Attachment(format!("{:?} is not a file", source)));
        }

        let file = match provenance {
            Provenance::Linked => source.to_path_buf(),
            Provenance::Copied => {
                let destination = self.free_destination(source).await?;
                fs::copy(source, &destination).await?;
                tracing::info!("Copied attachment {:?} to {:?}", source, destination);
                destination
            }
        };

        let mut attachment = Attachment::new(file.to_string_lossy());
        attachment.source_file = Some(source.to_string_lossy().into_owned());
        attachment.provenance = provenance;
        attachment.update_time_stamps();

        Ok(attachment)
    }

    /// Create an attachment record for a URL
    pub fn attach_url(&self, url: &str) -> Result<Attachment> {
        let url = url.trim();
        if !url.contains("://") {
            return Err(LogbookError::Attachment(format!("Not a URL: {}", url)));
        }

        let mut attachment = Attachment::new(url);
        attachment.attachment_type = AttachmentType::Url;
        attachment.provenance = Provenance::Linked;
        attachment.is_valid = true;
        Ok(attachment)
    }

    async fn free_destination(&self, source: &Path) -> Result<PathBuf> {
        fs::create_dir_all(&self.directory).await?;

        let name = source
            .file_name()
            .map(|name| sanitize_filename(&name.to_string_lossy()))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| LogbookError::Attachment(format!("{:?} has no file name", source)))?;

        let candidate = self.directory.join(&name);
        if !candidate.exists() {
            return Ok(candidate);
        }

        let path = Path::new(&name);
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|extension| format!(".{}", extension.to_string_lossy()))
            .unwrap_or_default();

        let mut index = 1;
        loop {
            let candidate = self.directory.join(format!("{}_{}{}", stem, index, extension));
            if !candidate.exists() {
                return Ok(candidate);
            }
            index += 1;
        }
    }
}

/// Sanitize filename to prevent path traversal
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| *c != '/' && *c != '\\' && *c != '\0')
        .take(255)
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogbookConfig;
    use tempfile::TempDir;

    fn create_test_service() -> (AttachmentsService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let service = AttachmentsService::new(temp_dir.path().join("attachments"));
        (service, temp_dir)
    }

    #[tokio::test]
    async fn test_copy_gets_unique_names() {
        let (service, temp) = create_test_service();
        let source = temp.path().join("scope.png");
        std::fs::write(&source, b"png data").unwrap();

        let first = service.import_file(&source, Provenance::Copied).await.unwrap();
        let second = service.import_file(&source, Provenance::Copied).await.unwrap();

        assert_eq!(first.path(), service.directory().join("scope.png"));
        assert_eq!(second.path(), service.directory().join("scope_1.png"));
        assert_eq!(first.attachment_type, AttachmentType::Image);
        assert_eq!(first.size, Some(8));
        assert!(first.is_valid);
        assert_eq!(first.source_file.as_deref(), Some(source.to_string_lossy().as_ref()));
    }

    #[tokio::test]
    async fn test_link_keeps_file_in_place() {
        let (service, temp) = create_test_service();
        let source = temp.path().join("notes.txt");
        std::fs::write(&source, b"hello").unwrap();

        let attachment = service.import_file(&source, Provenance::Linked).await.unwrap();

        assert_eq!(attachment.path(), source);
        assert_eq!(attachment.provenance, Provenance::Linked);
        assert!(!service.directory().exists());
    }

    #[tokio::test]
    async fn test_missing_source_is_an_error() {
        let (service, temp) = create_test_service();

        let result = service
            .import_file(&temp.path().join("missing.txt"), Provenance::Copied)
            .await;

        assert!(matches!(result, Err(LogbookError::Attachment(_))));
    }

    #[test]
    fn test_attach_url() {
        let service = AttachmentsService::new("unused");

        let attachment = service.attach_url(" https://example.org/run/42 ").unwrap();
        assert!(attachment.is_url());
        assert_eq!(attachment.file, "https://example.org/run/42");

        assert!(service.attach_url("example.org").is_err());
    }

    #[test]
    fn test_for_logbook_uses_directory_or_file_parent() {
        let mut logbook = Logbook::with_file("/data/logs/log.xml", LogbookConfig::default());
        let service = AttachmentsService::for_logbook(&logbook).unwrap();
        assert_eq!(service.directory(), Path::new("/data/logs"));

        logbook.root_node_mut().set_directory("/data/attachments");
        let service = AttachmentsService::for_logbook(&logbook).unwrap();
        assert_eq!(service.directory(), Path::new("/data/attachments"));

        let detached = Logbook::new(LogbookConfig::default());
        assert!(matches!(
            AttachmentsService::for_logbook(&detached),
            Err(LogbookError::NoFile)
        ));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_filename("plot.png"), "plot.png");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
    }
}
