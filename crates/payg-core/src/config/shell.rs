//! TOML-based shell configuration.
//!
//! Tunables for the PAYG shell component:
//! - Reminder thresholds
//! - Unlock dialog behaviour (code length, rate-limit wording, timeouts)
//! - Wall-clock jump detection
//!
//! Configuration is read from `~/.config/payg-shell/config.toml`. A missing
//! file means defaults; nothing is written back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config_dir;
use crate::error::ConfigError;
use crate::scheduler::{validate_thresholds, DEFAULT_THRESHOLDS_SECS};

/// Reminder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemindersConfig {
    /// Seconds before expiry to remind at, strictly descending.
    #[serde(default = "default_thresholds")]
    pub thresholds_secs: Vec<u32>,
}

/// Unlock dialog configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockConfig {
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    /// Rate-limit windows at or below this are shown as "a few seconds".
    #[serde(default = "default_few_seconds_threshold")]
    pub few_seconds_threshold_secs: u64,
    /// Idle time before the dialog gives up and returns to the lock screen.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_add_code_timeout")]
    pub add_code_timeout_secs: u64,
    /// Replaces the first help line under the code entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions_line1: Option<String>,
    /// Replaces the whole second help line, contact details included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions_line2: Option<String>,
    /// Sales contact named in the second help line. Needs `contact_number`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
}

/// Wall-clock jump detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_jump_tolerance")]
    pub jump_tolerance_secs: u64,
}

/// Shell configuration.
///
/// Serialized to/from TOML at `~/.config/payg-shell/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default)]
    pub reminders: RemindersConfig,
    #[serde(default)]
    pub unlock: UnlockConfig,
    #[serde(default)]
    pub clock: ClockConfig,
}

// Default functions
fn default_thresholds() -> Vec<u32> {
    DEFAULT_THRESHOLDS_SECS.to_vec()
}
fn default_code_length() -> usize {
    8
}
fn default_few_seconds_threshold() -> u64 {
    30
}
fn default_idle_timeout() -> u64 {
    2 * 60
}
fn default_add_code_timeout() -> u64 {
    25
}
fn default_poll_interval() -> u64 {
    60
}
fn default_jump_tolerance() -> u64 {
    5
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            thresholds_secs: default_thresholds(),
        }
    }
}

impl Default for UnlockConfig {
    fn default() -> Self {
        Self {
            code_length: default_code_length(),
            few_seconds_threshold_secs: default_few_seconds_threshold(),
            idle_timeout_secs: default_idle_timeout(),
            add_code_timeout_secs: default_add_code_timeout(),
            instructions_line1: None,
            instructions_line2: None,
            contact_name: None,
            contact_number: None,
        }
    }
}

impl UnlockConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn add_code_timeout(&self) -> Duration {
        Duration::from_secs(self.add_code_timeout_secs)
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            jump_tolerance_secs: default_jump_tolerance(),
        }
    }
}

impl ClockConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn jump_tolerance(&self) -> Duration {
        Duration::from_secs(self.jump_tolerance_secs)
    }
}

impl ShellConfig {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Load from the default location, or defaults if there is no file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read, parsed
    /// or validated.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path())
    }

    /// Load from `path`, or defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// validated.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };

        let cfg: ShellConfig = toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from disk, returning defaults on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default shell configuration");
            Self::default()
        })
    }

    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_thresholds(&self.reminders.thresholds_secs)?;
        if self.unlock.code_length == 0 {
            return Err(ConfigError::InvalidValue {
                key: "unlock.code_length".into(),
                message: "code length must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}
