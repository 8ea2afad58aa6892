//! Runtime tuning for app stores.
//!
//! # Responsibility
//! - Hold the timing knobs shared by store, notifier and search projections.
//! - Load overrides from a JSON document; missing keys keep defaults.
//!
//! # Invariants
//! - `change_debounce_ms <= max_notify_delay_ms`.
//! - All durations are strictly positive.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CHANGE_DEBOUNCE_MS: u64 = 150;
pub const DEFAULT_MAX_NOTIFY_DELAY_MS: u64 = 1000;
pub const DEFAULT_SEARCH_DELAY_MS: u64 = 300;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Store timing configuration.
///
/// ```json
/// { "change_debounce_ms": 150, "search_delay_ms": 300 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Quiet window collapsing a burst of commits into one change signal.
    pub change_debounce_ms: u64,
    /// Upper bound between the first commit of a burst and its signal.
    pub max_notify_delay_ms: u64,
    /// Delay between the last keystroke and the executed search.
    pub search_delay_ms: u64,
    /// SQLite busy timeout for the shared connection.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            change_debounce_ms: DEFAULT_CHANGE_DEBOUNCE_MS,
            max_notify_delay_ms: DEFAULT_MAX_NOTIFY_DELAY_MS,
            search_delay_ms: DEFAULT_SEARCH_DELAY_MS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        let config: StoreConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON config file.
    ///
    /// # Errors
    /// - `Io` when the file cannot be read.
    /// - `Parse`/`Invalid` when the document is malformed.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for (name, value) in [
            ("change_debounce_ms", self.change_debounce_ms),
            ("max_notify_delay_ms", self.max_notify_delay_ms),
            ("search_delay_ms", self.search_delay_ms),
            ("busy_timeout_ms", self.busy_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be > 0")));
            }
        }
        if self.change_debounce_ms > self.max_notify_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "change_debounce_ms ({}) exceeds max_notify_delay_ms ({})",
                self.change_debounce_ms, self.max_notify_delay_ms
            )));
        }
        Ok(())
    }

    pub fn change_debounce(&self) -> Duration {
        Duration::from_millis(self.change_debounce_ms)
    }

    pub fn max_notify_delay(&self) -> Duration {
        Duration::from_millis(self.max_notify_delay_ms)
    }

    pub fn search_delay(&self) -> Duration {
        Duration::from_millis(self.search_delay_ms)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, StoreConfig};
    use std::io::Write;

    #[test]
    fn empty_document_keeps_defaults() {
        let config = StoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.change_debounce().as_millis(), 150);
        assert_eq!(config.search_delay().as_millis(), 300);
    }

    #[test]
    fn partial_document_overrides_selected_fields() {
        let config =
            StoreConfig::from_json_str(r#"{"change_debounce_ms": 40, "search_delay_ms": 80}"#)
                .unwrap();
        assert_eq!(config.change_debounce_ms, 40);
        assert_eq!(config.search_delay_ms, 80);
        assert_eq!(config.busy_timeout_ms, 5000);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = StoreConfig::from_json_str(r#"{"debounce": 10}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn debounce_longer_than_cap_is_invalid() {
        let err = StoreConfig::from_json_str(
            r#"{"change_debounce_ms": 500, "max_notify_delay_ms": 100}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_durations_are_invalid() {
        let err = StoreConfig::from_json_str(r#"{"search_delay_ms": 0}"#).unwrap_err();
        assert!(err.to_string().contains("search_delay_ms"));
    }

    #[test]
    fn load_reads_file_and_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(br#"{"busy_timeout_ms": 250}"#).unwrap();

        let config = StoreConfig::load(&path).unwrap();
        assert_eq!(config.busy_timeout().as_millis(), 250);

        let err = StoreConfig::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
