use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::query::MonthFilter;

/// Data file used when neither the command line nor the config names one.
pub const DEFAULT_DATA_FILE: &str = "tasks.json";

/// User settings, read from `~/.taskdash/config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Task snapshot to load.
    pub data_file: Option<PathBuf>,
    /// Month scope used when none is given, `all` or `YYYY-MM`.
    pub default_month: Option<String>,
}

impl Config {
    /// Default location of the config file.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::home_dir()
            .ok_or_else(|| Error::Config("cannot determine home directory".into()))?
            .join(".taskdash");
        Ok(dir.join("config.json"))
    }

    /// Load from the default location. A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Load from the given path. A missing file yields the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(month) = &self.default_month {
            MonthFilter::parse(month)
                .map_err(|e| Error::Config(format!("default_month: {e}")))?;
        }
        Ok(())
    }

    /// Resolve the data file: explicit flag, then config, then `./tasks.json`.
    pub fn data_file(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.data_file.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE))
    }

    /// Resolve the month scope: explicit flag, then config, then `fallback`.
    pub fn month(&self, flag: Option<&str>, fallback: MonthFilter) -> Result<MonthFilter> {
        match flag.or(self.default_month.as_deref()) {
            Some(s) => MonthFilter::parse(s),
            None => Ok(fallback),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"data_file": "/data/tasks.json", "default_month": "2025-03"}"#,
        )
        .unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.data_file, Some(PathBuf::from("/data/tasks.json")));
        assert_eq!(config.default_month.as_deref(), Some("2025-03"));
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));

        std::fs::write(&path, r#"{"default_month": "March"}"#).unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_data_file_resolution() {
        let config = Config {
            data_file: Some(PathBuf::from("from-config.json")),
            ..Config::default()
        };
        assert_eq!(
            config.data_file(Some(Path::new("flag.json"))),
            PathBuf::from("flag.json")
        );
        assert_eq!(config.data_file(None), PathBuf::from("from-config.json"));
        let fallback = Config::default().data_file(None);
        assert_eq!(fallback, PathBuf::from(DEFAULT_DATA_FILE));
    }

    #[test]
    fn test_month_resolution() {
        let config = Config {
            default_month: Some("2025-01".to_string()),
            ..Config::default()
        };
        let fallback = MonthFilter::Month(2025, 3);
        let month = |flag: Option<&str>| config.month(flag, fallback).unwrap();
        assert_eq!(month(Some("all")), MonthFilter::All);
        assert_eq!(month(None), MonthFilter::Month(2025, 1));
        assert_eq!(Config::default().month(None, fallback).unwrap(), fallback);
        assert!(config.month(Some("bogus"), fallback).is_err());
    }
}
