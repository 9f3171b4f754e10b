//! Configuration management for qmlview

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::live::{WatchOptions, DEFAULT_MAX_CONSECUTIVE_FAILURES};
use crate::wrap::{Layout, WrapOptions};

/// Categories of disk errors for user-friendly messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskErrorKind {
    /// Disk is full or quota exceeded
    DiskFull,
    /// Permission denied (read or write)
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// Other IO error
    Other,
}

impl DiskErrorKind {
    /// Get a user-friendly message for this error kind
    pub fn user_message(&self) -> &'static str {
        match self {
            DiskErrorKind::DiskFull => "disk full, free space is needed to write generated files",
            DiskErrorKind::PermissionDenied => "permission denied in the source directory",
            DiskErrorKind::NotFound => "file or directory not found",
            DiskErrorKind::Other => "failed to access file",
        }
    }
}

/// Categorize an IO error into a user-friendly category
pub fn categorize_io_error(e: &std::io::Error) -> DiskErrorKind {
    use std::io::ErrorKind;

    match e.kind() {
        ErrorKind::StorageFull | ErrorKind::WriteZero => DiskErrorKind::DiskFull,
        ErrorKind::PermissionDenied => DiskErrorKind::PermissionDenied,
        ErrorKind::NotFound => DiskErrorKind::NotFound,
        _ => {
            #[cfg(unix)]
            {
                if let Some(os_error) = e.raw_os_error() {
                    // ENOSPC = 28, EDQUOT = 122 (Linux) / 69 (macOS)
                    if os_error == 28 || os_error == 122 || os_error == 69 {
                        return DiskErrorKind::DiskFull;
                    }
                    // EACCES
                    if os_error == 13 {
                        return DiskErrorKind::PermissionDenied;
                    }
                }
            }
            DiskErrorKind::Other
        }
    }
}

/// Create a user-friendly error message from an IO error
pub fn friendly_io_error_message(e: &std::io::Error, context: &str) -> String {
    let kind = categorize_io_error(e);
    match kind {
        DiskErrorKind::Other => format!("{}: {}", context, e),
        _ => format!("{}: {}", context, kind.user_message()),
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Live-reload poll interval in milliseconds (default: 300)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Consecutive transient live-reload failures before a warning is logged (default: 3)
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// QML runtime executable used to display documents (default: "qml")
    #[serde(default = "default_engine_command")]
    pub engine_command: String,

    /// How long a restarted runtime must stay up before it replaces the
    /// running one, in milliseconds (default: 400)
    #[serde(default = "default_reload_settle_ms")]
    pub reload_settle_ms: u64,

    /// Width of the synthesized window for rootless documents
    #[serde(default = "default_window_width")]
    pub window_width: u32,

    /// Height of the synthesized window for rootless documents
    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Log retention in days (default: 7)
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u64,
}

fn default_poll_interval_ms() -> u64 {
    300
}

fn default_max_consecutive_failures() -> u32 {
    DEFAULT_MAX_CONSECUTIVE_FAILURES
}

fn default_engine_command() -> String {
    "qml".to_string()
}

fn default_reload_settle_ms() -> u64 {
    400
}

fn default_window_width() -> u32 {
    640
}

fn default_window_height() -> u32 {
    480
}

fn default_log_retention_days() -> u64 {
    7
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_consecutive_failures: default_max_consecutive_failures(),
            engine_command: default_engine_command(),
            reload_settle_ms: default_reload_settle_ms(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            log_retention_days: default_log_retention_days(),
        }
    }
}

impl Config {
    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        let path = config_file_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Poll interval, never shorter than 10ms
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }

    /// Settle window for engine restarts
    pub fn reload_settle(&self) -> Duration {
        Duration::from_millis(self.reload_settle_ms)
    }

    /// Options for synthesized windows
    pub fn wrap_options(&self) -> WrapOptions {
        WrapOptions {
            window_width: self.window_width,
            window_height: self.window_height,
        }
    }

    /// Options for the live-reload watcher
    pub fn watch_options(&self, layout: Layout) -> WatchOptions {
        WatchOptions {
            layout,
            wrap: self.wrap_options(),
            max_consecutive_failures: self.max_consecutive_failures.max(1),
        }
    }
}

/// Get the base configuration directory (~/.qmlview)
/// Falls back to ./.qmlview if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".qmlview")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".qmlview"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the path to the logs directory
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}

/// Ensure all required directories exist
pub fn ensure_directories() -> Result<()> {
    std::fs::create_dir_all(config_dir()).context("Failed to create config directory")?;
    std::fs::create_dir_all(logs_dir()).context("Failed to create logs directory")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.poll_interval_ms, 300);
        assert_eq!(config.max_consecutive_failures, 3);
        assert_eq!(config.engine_command, "qml");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.poll_interval_ms, parsed.poll_interval_ms);
        assert_eq!(config.engine_command, parsed.engine_command);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("engine_command = \"/opt/qt/bin/qml\"").unwrap();
        assert_eq!(parsed.engine_command, "/opt/qt/bin/qml");
        assert_eq!(parsed.poll_interval_ms, 300);
        assert_eq!(parsed.window_width, 640);
        assert_eq!(parsed.reload_settle(), Duration::from_millis(400));
    }

    #[test]
    fn test_poll_interval_floor() {
        let config = Config {
            poll_interval_ms: 0,
            ..Config::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(10));
    }

    #[test]
    fn test_watch_options_from_config() {
        let config = Config {
            window_width: 1024,
            max_consecutive_failures: 5,
            ..Config::default()
        };
        let options = config.watch_options(Layout::Phone);
        assert_eq!(options.layout, Layout::Phone);
        assert_eq!(options.wrap.window_width, 1024);
        assert_eq!(options.max_consecutive_failures, 5);
    }

    #[test]
    fn test_config_dir_does_not_panic() {
        let dir = config_dir();
        assert!(dir.ends_with(".qmlview"));
    }

    #[test]
    fn test_friendly_io_error_message() {
        let e = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(
            friendly_io_error_message(&e, "Failed to write side file"),
            "Failed to write side file: permission denied in the source directory"
        );
        let e = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert_eq!(friendly_io_error_message(&e, "ctx"), "ctx: boom");
    }
}
