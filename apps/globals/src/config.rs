//! # Configuration
//!
//! Optional TOML file supplying defaults for the global CLI flags.
//!
//! ```toml
//! database = "data/hospital.redb"
//! backend = "redb"
//! lock_timeout_ms = 2500
//! ```
//!
//! Every key is optional. Resolution order for each setting is: command-line
//! flag, then config file, then the built-in default.

use globals_core::GlobalsError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// DEFAULTS
// =============================================================================

pub const DEFAULT_DATABASE: &str = "globals.redb";
pub const DEFAULT_BACKEND: &str = "redb";
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Config files larger than this are rejected before parsing.
pub const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

// =============================================================================
// FILE FORMAT
// =============================================================================

/// Contents of a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Path to the database file.
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Storage backend: "redb" or "memory".
    #[serde(default)]
    pub backend: Option<String>,

    /// Lock timeout for writing commands, in milliseconds.
    #[serde(default)]
    pub lock_timeout_ms: Option<u64>,
}

impl FileConfig {
    /// Load a config file from disk.
    pub fn load(path: &Path) -> Result<Self, GlobalsError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            GlobalsError::IoError(format!("cannot read '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(GlobalsError::IoError(format!(
                "config file '{}' is {} bytes (maximum {})",
                path.display(),
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            GlobalsError::IoError(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse a config file from a TOML string.
    pub fn parse(content: &str) -> Result<Self, GlobalsError> {
        toml::from_str(content)
            .map_err(|e| GlobalsError::ParseError(format!("invalid config file: {}", e)))
    }
}

// =============================================================================
// RESOLVED SETTINGS
// =============================================================================

/// Settings after merging flags, file and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database: PathBuf,
    pub backend: String,
    pub lock_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            backend: DEFAULT_BACKEND.to_string(),
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
        }
    }
}

impl Settings {
    /// Merge: flag > file > default.
    pub fn resolve(
        database: Option<PathBuf>,
        backend: Option<String>,
        lock_timeout_ms: Option<u64>,
        file: &FileConfig,
    ) -> Self {
        let defaults = Self::default();
        Self {
            database: database
                .or_else(|| file.database.clone())
                .unwrap_or(defaults.database),
            backend: backend
                .or_else(|| file.backend.clone())
                .unwrap_or(defaults.backend),
            lock_timeout: lock_timeout_ms
                .or(file.lock_timeout_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.lock_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let cfg = FileConfig::parse(
            r#"
database = "data/hospital.redb"
backend = "memory"
lock_timeout_ms = 250
"#,
        )
        .expect("parse");
        assert_eq!(cfg.database, Some(PathBuf::from("data/hospital.redb")));
        assert_eq!(cfg.backend.as_deref(), Some("memory"));
        assert_eq!(cfg.lock_timeout_ms, Some(250));
    }

    #[test]
    fn parse_empty_config() {
        assert_eq!(FileConfig::parse("").expect("parse"), FileConfig::default());
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert!(matches!(
            FileConfig::parse("databse = \"typo.redb\""),
            Err(GlobalsError::ParseError(_))
        ));
    }

    #[test]
    fn flag_beats_file_beats_default() {
        let file = FileConfig {
            database: Some(PathBuf::from("file.redb")),
            backend: None,
            lock_timeout_ms: Some(10),
        };

        let settings = Settings::resolve(Some(PathBuf::from("flag.redb")), None, None, &file);
        assert_eq!(settings.database, PathBuf::from("flag.redb"));
        assert_eq!(settings.backend, DEFAULT_BACKEND);
        assert_eq!(settings.lock_timeout, Duration::from_millis(10));

        let settings = Settings::resolve(None, None, Some(99), &FileConfig::default());
        assert_eq!(settings.database, PathBuf::from(DEFAULT_DATABASE));
        assert_eq!(settings.lock_timeout, Duration::from_millis(99));
    }
}
