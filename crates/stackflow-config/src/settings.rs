//! User settings (`~/.config/stackflow/settings.json`)

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MONITOR_FREQUENCY_ENV: &str = "STACKFLOW_MONITOR_FREQUENCY_MS";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Delay between status polls of a remote operation
    pub monitor_frequency_ms: u64,
    /// Give up monitoring after this long
    pub monitor_timeout_secs: u64,
    /// Extra attempts for a request that failed with a retryable error
    pub request_retries: u32,
    pub request_retry_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            monitor_frequency_ms: 5000,
            monitor_timeout_secs: 3600,
            request_retries: 4,
            request_retry_delay_ms: 5000,
        }
    }
}

impl Settings {
    /// Loads settings from the user config directory, falling back to
    /// defaults when no file exists, then applies environment overrides
    pub fn load() -> Result<Self> {
        let settings = match settings_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        Ok(settings.with_env_overrides())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var(MONITOR_FREQUENCY_ENV) {
            match value.parse() {
                Ok(ms) => self.monitor_frequency_ms = ms,
                Err(_) => tracing::warn!("Ignoring invalid {}={}", MONITOR_FREQUENCY_ENV, value),
            }
        }
        self
    }

    pub fn monitor_frequency(&self) -> Duration {
        Duration::from_millis(self.monitor_frequency_ms)
    }

    pub fn monitor_timeout(&self) -> Duration {
        Duration::from_secs(self.monitor_timeout_secs)
    }

    pub fn request_retry_delay(&self) -> Duration {
        Duration::from_millis(self.request_retry_delay_ms)
    }
}

fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("stackflow").join(SETTINGS_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&temp_dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.monitor_frequency(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "requestRetries": 2 }"#).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.request_retries, 2);
        assert_eq!(settings.monitor_timeout_secs, 3600);
    }

    #[test]
    #[serial]
    fn test_env_override() {
        temp_env::with_var(MONITOR_FREQUENCY_ENV, Some("250"), || {
            let settings = Settings::default().with_env_overrides();
            assert_eq!(settings.monitor_frequency(), Duration::from_millis(250));
        });
        temp_env::with_var(MONITOR_FREQUENCY_ENV, Some("soon"), || {
            let settings = Settings::default().with_env_overrides();
            assert_eq!(settings.monitor_frequency_ms, 5000);
        });
    }
}
