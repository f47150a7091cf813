//! Runtime configuration.
//!
//! Resolution order, highest first: command-line flag, environment variable,
//! TOML file, built-in default. This module owns the file and default layers;
//! the CLI applies the first two through `ConfigOverrides`.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DB_FILE_NAME: &str = "rollcall.sqlite3";

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

/// Effective application settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Directory holding the SQLite database.
    pub data_dir: PathBuf,
    /// Root of `student_photos/` and `classroom_photos/`.
    pub uploads_dir: PathBuf,
    pub log_level: String,
    /// Absolute directory for rolling log files; logging is off when unset.
    pub log_dir: Option<PathBuf>,
    /// Fixes the simulated recognizer's picks when set.
    pub recognition_seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            uploads_dir: PathBuf::from("uploads"),
            log_level: default_log_level().to_string(),
            log_dir: None,
            recognition_seed: None,
        }
    }
}

/// Values supplied by flags or environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub uploads_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub recognition_seed: Option<u64>,
}

impl AppConfig {
    /// Loads the TOML layer; `None` yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Applies flag/env values on top of this configuration.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(data_dir) = overrides.data_dir {
            self.data_dir = data_dir;
        }
        if let Some(uploads_dir) = overrides.uploads_dir {
            self.uploads_dir = uploads_dir;
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = log_level;
        }
        if overrides.log_dir.is_some() {
            self.log_dir = overrides.log_dir;
        }
        if overrides.recognition_seed.is_some() {
            self.recognition_seed = overrides.recognition_seed;
        }
        self
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, ConfigOverrides};
    use std::path::PathBuf;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = AppConfig::from_toml_str("uploads_dir = \"/srv/uploads\"\n").unwrap();
        assert_eq!(config.uploads_dir, PathBuf::from("/srv/uploads"));
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(AppConfig::from_toml_str("data_directory = \"x\"\n").is_err());
    }

    #[test]
    fn overrides_win_over_file_values() {
        let config = AppConfig::from_toml_str("data_dir = \"/a\"\nrecognition_seed = 1\n")
            .unwrap()
            .with_overrides(ConfigOverrides {
                data_dir: Some(PathBuf::from("/b")),
                ..ConfigOverrides::default()
            });
        assert_eq!(config.data_dir, PathBuf::from("/b"));
        assert_eq!(config.recognition_seed, Some(1));
        assert_eq!(config.database_path(), PathBuf::from("/b/rollcall.sqlite3"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = AppConfig::load(Some(PathBuf::from("/no/such/rollcall.toml").as_path()))
            .expect_err("missing file should fail");
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
