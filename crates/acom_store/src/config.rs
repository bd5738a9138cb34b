//! Store configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for opening the backing store.
///
/// Loading this from a file is left to the caller; the struct derives
/// `Deserialize` so any serde format works:
///
/// ```rust,ignore
/// let config: Config = toml::from_str("path = \"/var/lib/acom/acom.db\"")?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file. `None` opens an in-memory store.
    pub path: Option<PathBuf>,

    /// Isolated store used after entering test mode. Derived from `path`
    /// when unset.
    pub test_path: Option<PathBuf>,

    /// How long a statement waits on a locked database file, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Whether to create the database file if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: None,
            test_path: None,
            busy_timeout_ms: 5_000,
            create_if_missing: true,
        }
    }
}

impl Config {
    /// Creates a configuration for a file-backed store.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Creates a configuration for an in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Sets the isolated test store location.
    #[must_use]
    pub fn test_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.test_path = Some(path.into());
        self
    }

    /// Sets the busy timeout.
    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets whether to create the database file if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Busy timeout as a `Duration`.
    #[must_use]
    pub fn busy_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Location of the isolated test store.
    ///
    /// `/data/acom.db` maps to `/data/acom_test.db`. Returns `None` for
    /// in-memory configurations, whose test store is a fresh in-memory
    /// database.
    #[must_use]
    pub fn test_store_path(&self) -> Option<PathBuf> {
        if let Some(explicit) = &self.test_path {
            return Some(explicit.clone());
        }
        self.path.as_deref().map(derive_test_path)
    }
}

fn derive_test_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_test.{}", ext.to_string_lossy()),
        None => format!("{stem}_test"),
    };
    path.with_file_name(name)
}
