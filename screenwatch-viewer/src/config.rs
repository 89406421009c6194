use std::path::{Path, PathBuf};
use std::{env, fs};

use screenwatch_shared::path;
use serde::{Deserialize, Serialize};

pub const ENV_CONFIG: &str = "SCREENWATCH_VIEWER_CONFIG";
pub const CONFIG_FILE: &str = "viewer.yaml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    /// Where the child flow writes the collector's identity.
    #[serde(default)]
    pub identity_path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("could not determine {0}")]
    NoDefault(&'static str),
}

impl ViewerConfig {
    /// `--config`, then `$SCREENWATCH_VIEWER_CONFIG`, then the platform file
    /// if it exists, then defaults.
    pub fn load(cli_value: Option<PathBuf>) -> Result<Self, ConfigError> {
        if let Some(p) = cli_value {
            return Self::load_from_path(p);
        }
        if let Ok(p) = env::var(ENV_CONFIG) {
            return Self::load_from_path(p);
        }
        match path::default_config_file(CONFIG_FILE) {
            Some(p) if p.exists() => Self::load_from_path(p),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(&path)?;
        let cfg: ViewerConfig = serde_yaml::from_str(&text)?;
        Ok(cfg)
    }

    pub fn store_path(&self) -> Result<PathBuf, ConfigError> {
        self.store_path
            .clone()
            .or_else(path::default_store_path)
            .ok_or(ConfigError::NoDefault("store path"))
    }

    pub fn identity_path(&self) -> Result<PathBuf, ConfigError> {
        self.identity_path
            .clone()
            .or_else(path::default_identity_path)
            .ok_or(ConfigError::NoDefault("identity path"))
    }
}
