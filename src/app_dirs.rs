//! Application directory helpers anchored to a single `.enginml` folder.
//!
//! Config and log files live under `<OS config dir>/.enginml` unless the
//! `ENGINML_HOME` environment variable names a root directly.

use std::{
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory that lives under the OS config root.
pub const APP_DIR_NAME: &str = ".enginml";
/// Environment variable that replaces the whole app root.
pub const HOME_ENV_VAR: &str = "ENGINML_HOME";

static APP_ROOT_OVERRIDE: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

/// Errors that can occur while resolving or preparing application directories.
#[derive(Debug, Error)]
pub enum AppDirError {
    /// No suitable base config directory could be resolved.
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    /// Failed to create the application directory.
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Return the app root directory, creating it if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let path = resolve_root().ok_or(AppDirError::NoBaseDir)?;
    create_dir(path)
}

/// Return the logs directory inside the app root, creating it if needed.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    create_dir(app_root_dir()?.join("logs"))
}

fn create_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn resolve_root() -> Option<PathBuf> {
    if let Some(path) = APP_ROOT_OVERRIDE
        .lock()
        .ok()
        .and_then(|guard| guard.clone())
    {
        return Some(path);
    }
    if let Some(path) = std::env::var_os(HOME_ENV_VAR).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(path));
    }
    BaseDirs::new().map(|dirs| dirs.config_dir().join(APP_DIR_NAME))
}

#[cfg(test)]
fn set_app_root_override(path: Option<PathBuf>) {
    let mut guard = APP_ROOT_OVERRIDE
        .lock()
        .expect("app root override mutex poisoned");
    *guard = path;
}
