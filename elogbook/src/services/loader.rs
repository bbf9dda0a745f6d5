//! Background loading
//!
//! Reading a large logbook tree can take a while. The tree is built on a
//! blocking worker thread and handed back whole once reading finished; the
//! caller never sees a partially read tree.

use crate::config::LogbookConfig;
use crate::error::{LogbookError, Result};
use crate::logbook::Logbook;
use std::path::PathBuf;

/// Read the logbook at `file` on a blocking worker
pub async fn load_in_background(file: impl Into<PathBuf>, config: LogbookConfig) -> Result<Logbook> {
    let file = file.into();
    tracing::debug!("Loading logbook {:?} in background", file);

    let logbook = tokio::task::spawn_blocking(move || Logbook::open(file, config))
        .await
        .map_err(|e| LogbookError::Generic(format!("Background load failed: {}", e)))??;

    let errors = logbook.xml_errors();
    if !errors.is_empty() {
        tracing::warn!("Logbook loaded with {} errors", errors.len());
    }

    Ok(logbook)
}

/// Read the logbook at `file` for a tool that rewrites it
///
/// A tree that was not read completely is refused. With `force`, the parse
/// problems are logged and accepted, and whatever was read gets written.
pub async fn load_for_rewrite(
    file: impl Into<PathBuf>,
    config: LogbookConfig,
    force: bool,
) -> Result<Logbook> {
    let mut logbook = load_in_background(file, config).await?;

    let errors = logbook.xml_errors();
    let Some(first) = errors.first() else {
        return Ok(logbook);
    };

    for error in &errors {
        tracing::warn!("{}", error);
    }

    if !force {
        return Err(LogbookError::Incomplete(first.file.clone()));
    }

    tracing::warn!("Accepting {} errors, unreadable content will be lost", errors.len());
    logbook.clear_xml_errors();
    Ok(logbook)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{from_unix, Entry};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_in_background() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.xml");
        let config = LogbookConfig {
            max_entries: 2,
            ..LogbookConfig::default()
        };

        let mut logbook = Logbook::with_file(&path, config.clone());
        for creation in 1..=5 {
            logbook.add_entry(Entry::new(from_unix(creation)));
        }
        logbook.write(None).unwrap();

        let loaded = load_in_background(&path, config).await.unwrap();

        assert_eq!(loaded.entries().len(), 5);
        assert_eq!(loaded.children(loaded.root()).len(), 2);
        assert!(!loaded.modified());
    }

    #[tokio::test]
    async fn test_load_for_rewrite_refuses_damaged_tree() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.xml");
        let config = LogbookConfig {
            max_entries: 1,
            ..LogbookConfig::default()
        };

        let mut logbook = Logbook::with_file(&path, config.clone());
        for creation in 1..=3 {
            logbook.add_entry(Entry::new(from_unix(creation)));
        }
        logbook.write(None).unwrap();
        let child = temp_dir.path().join("log_include_0.xml");
        std::fs::write(&child, "<Logbook><Entry").unwrap();

        let refused = load_for_rewrite(&path, config.clone(), false).await;
        assert!(matches!(refused, Err(LogbookError::Incomplete(file)) if file == child));

        let mut forced = load_for_rewrite(&path, config.clone(), true).await.unwrap();
        assert!(forced.xml_errors().is_empty());
        forced.set_modified_recursive(true);
        forced.write(None).unwrap();

        let reread = load_for_rewrite(&path, config, false).await.unwrap();
        assert_eq!(reread.entries().len(), 2);
    }

    #[tokio::test]
    async fn test_load_for_rewrite_passes_clean_tree() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.xml");

        let mut logbook = Logbook::with_file(&path, LogbookConfig::default());
        logbook.add_entry(Entry::new(from_unix(1)));
        logbook.write(None).unwrap();

        let loaded = load_for_rewrite(&path, LogbookConfig::default(), false).await.unwrap();
        assert_eq!(loaded.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();

        let result = load_in_background(temp_dir.path().join("none.xml"), LogbookConfig::default()).await;

        assert!(matches!(result, Err(LogbookError::Io(_))));
    }
}
