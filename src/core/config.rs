// src/core/config.rs

use crate::core::common::error::DbError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Engine configuration.
///
/// Supports loading from a TOML file and provides sensible defaults; every
/// field is optional in the file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The path of the snapshot file the engine loads at startup and
    /// rewrites on every commit.
    /// Default: `"database.json"`
    #[serde(default = "default_database_file_path")]
    pub database_file_path: String,
}

fn default_database_file_path() -> String {
    "database.json".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config { database_file_path: default_database_file_path() }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the default configuration; an unreadable or
    /// unparsable file is an error.
    pub fn load_from_file(path: &Path) -> Result<Self, DbError> {
        match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(|e| {
                DbError::Configuration(format!(
                    "failed to parse config file '{}': {e}",
                    path.display()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(DbError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_database_json() {
        assert_eq!(Config::default().database_file_path, "database.json");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.database_file_path, "database.json");
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ferrobase.toml");
        fs::write(&path, "database_file_path = \"custom.json\"\n").unwrap();
        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.database_file_path, "custom.json");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ferrobase.toml");
        fs::write(&path, "wal_enabled = true\n").unwrap();
        assert!(matches!(
            Config::load_from_file(&path),
            Err(DbError::Configuration(_))
        ));
    }
}
