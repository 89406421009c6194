use std::path::{Path, PathBuf};
use std::time::Duration;

use screenwatch_shared::path;
use serde::{Deserialize, Serialize};

use crate::AppError;

pub const ENV_CONFIG: &str = "SCREENWATCH_CONFIG";
pub const CONFIG_FILE: &str = "collector.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Store file shared with the viewer. Defaults to the platform data dir.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    /// Identity written by the child login flow.
    #[serde(default)]
    pub identity_path: Option<PathBuf>,
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Length of the usage window queried each cycle.
    #[serde(default = "default_window")]
    pub window_secs: u64,
    /// Command printing a JSON object of app id -> seconds.
    /// `{start}` and `{end}` are replaced with Unix timestamps. Example:
    /// ["usage-report", "--from", "{start}", "--to", "{end}"]
    #[serde(default)]
    pub usage_cmd: Option<Vec<String>>,
    /// Also write every sent report to this file.
    #[serde(default)]
    pub debug_dump_path: Option<PathBuf>,
    /// Log to daily files in this directory instead of stderr.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_interval() -> u64 {
    300
}

fn default_window() -> u64 {
    600
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            identity_path: None,
            interval_secs: default_interval(),
            window_secs: default_window(),
            usage_cmd: None,
            debug_dump_path: None,
            log_dir: None,
        }
    }
}

impl CollectorConfig {
    /// Resolve and load the config. An explicitly named file must exist; a
    /// missing platform default falls back to built-in defaults.
    pub fn find_and_load(cli_value: Option<PathBuf>) -> Result<(PathBuf, Self), AppError> {
        let explicit = cli_value.is_some() || std::env::var_os(ENV_CONFIG).is_some();
        let path = resolve_config_path(cli_value)?;
        if !explicit && !path.exists() {
            return Ok((path, Self::default()));
        }
        let cfg = load_config(&path)?;
        Ok((path, cfg))
    }

    pub fn store_path(&self) -> Result<PathBuf, AppError> {
        self.store_path
            .clone()
            .or_else(path::default_store_path)
            .ok_or_else(|| AppError::Config("could not determine store path".into()))
    }

    pub fn identity_path(&self) -> Result<PathBuf, AppError> {
        self.identity_path
            .clone()
            .or_else(path::default_identity_path)
            .ok_or_else(|| AppError::Config("could not determine identity path".into()))
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs.max(1))
    }
}

pub fn resolve_config_path(cli_value: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(p) = cli_value {
        return Ok(p);
    }
    if let Ok(p) = std::env::var(ENV_CONFIG) {
        return Ok(PathBuf::from(p));
    }
    default_config_path().ok_or_else(|| AppError::Config("could not determine config dir".into()))
}

pub fn default_config_path() -> Option<PathBuf> {
    path::default_config_file(CONFIG_FILE)
}

pub fn load_config(path: &Path) -> Result<CollectorConfig, AppError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("read {} failed: {e}", path.display())))?;
    let cfg: CollectorConfig = serde_yaml::from_str(&data)
        .map_err(|e| AppError::Config(format!("parse {} failed: {e}", path.display())))?;
    Ok(cfg)
}

pub fn save_config(path: &Path, cfg: &CollectorConfig) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let data = serde_yaml::to_string(cfg)
        .map_err(|e| AppError::Config(format!("serialize config failed: {e}")))?;
    std::fs::write(path, data)
        .map_err(|e| AppError::Config(format!("write {} failed: {e}", path.display())))
}
