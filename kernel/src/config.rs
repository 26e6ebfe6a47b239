// Application Configuration
//
// Where loan records go and how the form behaves. Loaded from JSON;
// every field has a built-in default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_TABLE_PATH: &str = "loaners.csv";
pub const DEFAULT_SHEET_NAME: &str = "Loaners";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub table_path: PathBuf,
    pub remote: Option<RemoteConfig>,
    pub prefill_today: bool,
}

/// Remote sheet target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub credentials_path: PathBuf,
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
}

fn default_sheet_name() -> String {
    DEFAULT_SHEET_NAME.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl AppConfig {
    /// Built-in configuration (used if no config file is provided).
    pub fn default_config() -> Self {
        Self {
            table_path: PathBuf::from(DEFAULT_TABLE_PATH),
            remote: None,
            prefill_today: false,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default_config());
    }

    #[test]
    fn remote_sheet_name_defaults() {
        let json = r#"
        {
          "table_path": "data/loans.csv",
          "remote": { "credentials_path": "service.json" },
          "prefill_today": true
        }
        "#;

        let config: AppConfig = serde_json::from_str(json).unwrap();
        let remote = config.remote.unwrap();

        assert_eq!(config.table_path, PathBuf::from("data/loans.csv"));
        assert_eq!(remote.sheet_name, DEFAULT_SHEET_NAME);
        assert!(config.prefill_today);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = AppConfig::from_file(Path::new("/nonexistent/loaner.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
