//! Settings shared by the review client and the sweep binary.
//!
//! Loaded from an optional TOML file; every key has a default so a missing
//! file is the same as an empty one.
//!
//! ```toml
//! database_path = "db.sqlite3"
//! default_level_cap = 7
//! session_size = 10
//! ```

use crate::error::SchedulerError;
use crate::models::LevelCap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] SchedulerError),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_path: PathBuf,
    /// Level cap given to users created from the review client.
    pub default_level_cap: i64,
    /// Cards per review session in the review client.
    pub session_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("db.sqlite3"),
            default_level_cap: 7,
            session_size: 10,
        }
    }
}

impl Settings {
    /// Reads settings from `path`, falling back to defaults if it doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(contents)?;
        settings.level_cap()?;
        Ok(settings)
    }

    pub fn level_cap(&self) -> Result<LevelCap, SchedulerError> {
        LevelCap::new(self.default_level_cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings = Settings::load(Path::new("does_not_exist_settings.toml")).unwrap();
        assert_eq!(settings.database_path, PathBuf::from("db.sqlite3"));
        assert_eq!(settings.default_level_cap, 7);
        assert_eq!(settings.session_size, 10);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let settings = Settings::parse("session_size = 4\n").unwrap();
        assert_eq!(settings.session_size, 4);
        assert_eq!(settings.default_level_cap, 7);
    }

    #[test]
    fn test_invalid_level_cap_rejected() {
        let err = Settings::parse("default_level_cap = 9\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(SchedulerError::InvalidLevelCap(9))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "database_path = \"reviews.db\"\ndefault_level_cap = 3\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.database_path, PathBuf::from("reviews.db"));
        assert_eq!(settings.level_cap().unwrap().get(), 3);
    }
}
