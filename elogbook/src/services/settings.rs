//! Settings service
//!
//! Persists the logbook policy values as a JSON file.

use crate::config::LogbookConfig;
use crate::error::{LogbookError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Settings file name inside the settings directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Service for loading and saving [`LogbookConfig`]
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(settings_dir: impl AsRef<Path>) -> Self {
        Self {
            settings_path: settings_dir.as_ref().join(SETTINGS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings from disk or create default if not exists
    pub async fn load(&self) -> Result<LogbookConfig> {
        if !self.settings_path.exists() {
            tracing::info!("Settings file not found, creating default settings");
            let default = LogbookConfig::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.settings_path).await?;
        let config: LogbookConfig = serde_json::from_str(&content)
            .map_err(|e| LogbookError::Generic(format!("Failed to parse settings: {}", e)))?;

        Ok(config.validated())
    }

    /// Save settings to disk
    pub async fn save(&self, config: &LogbookConfig) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.settings_path, content).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }

    /// Update the automatic backup policy
    pub async fn update_backup_policy(&self, enabled: bool, interval_days: u32) -> Result<LogbookConfig> {
        let mut config = self.load().await?;
        config.auto_backup = enabled;
        config.backup_interval_days = interval_days;
        let config = config.validated();
        self.save(&config).await?;
        Ok(config)
    }

    /// Update the number of entries per logbook file
    pub async fn update_max_entries(&self, max_entries: usize) -> Result<LogbookConfig> {
        let mut config = self.load().await?;
        config.max_entries = max_entries;
        let config = config.validated();
        self.save(&config).await?;
        Ok(config)
    }
}
