use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use catalog_core::submission::DEFAULT_FAILURE_MESSAGE;
use catalog_core::SubmissionPolicy;
use catalog_logging::{catalog_info, catalog_warn, LogSettings};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid configuration: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] ron::Error),
}

/// Request-submission tuning as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    pub cooldown_after_attempts: u32,
    pub cooldown_ms: u64,
    pub failure_message: String,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            cooldown_after_attempts: 3,
            cooldown_ms: 5_000,
            failure_message: DEFAULT_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl WorkflowSettings {
    pub fn policy(&self) -> SubmissionPolicy {
        SubmissionPolicy {
            cooldown_after_attempts: self.cooldown_after_attempts,
            cooldown: Duration::from_millis(self.cooldown_ms),
            failure_message: self.failure_message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub workflow: WorkflowSettings,
    pub log: LogSettings,
}

impl CatalogConfig {
    /// Reads a RON file. A missing file yields the defaults; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                catalog_info!("No configuration at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        let config = ron::from_str(&content).inspect_err(|err| {
            catalog_warn!("Failed to parse configuration {:?}: {}", path, err);
        })?;
        catalog_info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Writes the configuration next to `path` and renames it into place.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new())?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(path).map_err(|e| ConfigError::Io(e.error))?;
        catalog_info!("Saved configuration to {:?}", path);
        Ok(())
    }
}
