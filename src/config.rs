//! TOML-backed engine configuration stored in the `.enginml` app directory.
//!
//! Every key is optional; missing keys fall back to defaults and out-of-range
//! values are clamped on load.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;
use crate::report::ReportSettings;

/// Default filename of the configuration inside the app root.
pub const CONFIG_FILE_NAME: &str = "enginml.toml";

/// Errors that may occur while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to create the config directory.
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to write a config file.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to serialize config to TOML.
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    /// No usable config directory found.
    #[error("No suitable config directory found")]
    NoConfigDir,
}

/// Top-level configuration.
///
/// Config sections: `[fit]`, `[report]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub fit: FitSettings,
    #[serde(default)]
    pub report: ReportSettings,
}

/// Training defaults.
///
/// Config keys: `seed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitSettings {
    /// Seed for every randomized backend unless a call overrides it.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            seed: default_seed(),
        }
    }
}

fn default_seed() -> u64 {
    42
}

impl EngineConfig {
    pub(crate) fn normalized(mut self) -> Self {
        self.report = self.report.normalized();
        self
    }
}

/// Resolve the configuration file path, ensuring the app root exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load `enginml.toml` from the app root, returning defaults if missing.
pub fn load_or_default() -> Result<EngineConfig, ConfigError> {
    load_from(&config_path()?)
}

/// Load configuration from `path`; a missing file yields defaults.
pub fn load_from(path: &Path) -> Result<EngineConfig, ConfigError> {
    if !path.exists() {
        return Ok(EngineConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<EngineConfig>(&text)
        .map(EngineConfig::normalized)
        .map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
}

/// Save configuration to `path`, creating parent directories as needed.
pub fn save_to(path: &Path, config: &EngineConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, data).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.fit.seed, 42);
        assert_eq!(config.report.title, "EnginML Report");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        std::fs::write(&path, "[report]\ntitle = \"Nightly\"\n").unwrap();
        let config = load_from(&path).unwrap();
        assert_eq!(config.report.title, "Nightly");
        assert_eq!(config.report.plot_width, 640);
        assert_eq!(config.fit.seed, 42);
    }

    #[test]
    fn clamps_plot_settings_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        let data = r#"
[report]
plot_width = 10
plot_height = 50
histogram_bins = 500
max_plot_points = 1
"#;
        std::fs::write(&path, data).unwrap();
        let report = load_from(&path).unwrap().report;
        assert_eq!(report.plot_width, 200);
        assert_eq!(report.plot_height, 200);
        assert_eq!(report.histogram_bins, 100);
        assert_eq!(report.max_plot_points, 10);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let mut config = EngineConfig::default();
        config.fit.seed = 7;
        config.report.include_timestamp = true;
        save_to(&path, &config).unwrap();
        assert_eq!(load_from(&path).unwrap(), config);
    }

    #[test]
    fn invalid_toml_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        std::fs::write(&path, "[fit\nseed = 1").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains("cfg.toml"));
    }
}
