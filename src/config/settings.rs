//! Daemon settings and configuration types.
//!
//! Settings are read from `~/.config/inbox-relay/settings.json` (or XDG
//! equivalent), or from an explicit path given as the first command-line
//! argument. They are loaded once at startup and immutable for the life of
//! the process.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ForwardRule, KeywordSet, RuleError, RuleSet};

/// Errors that can occur while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// No platform configuration directory could be determined.
    #[error("cannot locate a configuration directory")]
    NoConfigDir,

    /// The settings file cannot be read.
    #[error("settings file {path} is not readable: {source}")]
    Unreadable {
        /// Path that failed.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },

    /// The settings file is not valid JSON for the expected shape.
    #[error("settings file {path} is invalid: {source}")]
    Invalid {
        /// Path that failed.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The forwarding rules fail validation.
    #[error("invalid forwarding rules: {0}")]
    Rules(#[from] RuleError),

    /// A keyword entry is empty.
    #[error("keyword entries must not be empty")]
    EmptyKeyword,

    /// The polling interval is zero.
    #[error("poll_interval_secs must be greater than zero")]
    ZeroInterval,
}

/// Top-level daemon settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Ordered redirection rules. Order is significant when several sources
    /// are substrings of the same recipient value: the first match wins.
    pub rules: Vec<ForwardRule>,
    /// Subject trigger phrases; a message qualifies when its subject
    /// contains any of them, case-insensitively.
    pub keywords: Vec<String>,
    /// Directory holding one OAuth credential record per account.
    pub tokens_dir: PathBuf,
    /// Seconds between polling ticks.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_poll_interval() -> u64 {
    60
}

fn default_http_timeout() -> u64 {
    30
}

impl Settings {
    /// Loads and validates settings from the given path, or from the
    /// default location when no path is supplied.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        let contents = fs::read_to_string(&path).map_err(|source| SettingsError::Unreadable {
            path: path.clone(),
            source,
        })?;

        let settings: Settings =
            serde_json::from_str(&contents).map_err(|source| SettingsError::Invalid {
                path: path.clone(),
                source,
            })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Returns the default settings path in the platform config directory.
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        let dirs = ProjectDirs::from("", "", "inbox-relay").ok_or(SettingsError::NoConfigDir)?;
        Ok(dirs.config_dir().join("settings.json"))
    }

    /// Validates rule and keyword entries.
    fn validate(&self) -> Result<(), SettingsError> {
        RuleSet::new(self.rules.clone())?;
        if self.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(SettingsError::EmptyKeyword);
        }
        if self.poll_interval_secs == 0 {
            return Err(SettingsError::ZeroInterval);
        }
        Ok(())
    }

    /// Builds the validated rule set.
    pub fn rule_set(&self) -> Result<RuleSet, RuleError> {
        RuleSet::new(self.rules.clone())
    }

    /// Builds the keyword set.
    pub fn keyword_set(&self) -> KeywordSet {
        KeywordSet::new(self.keywords.clone())
    }

    /// Interval between polling ticks.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Per-request HTTP timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
