use std::path::PathBuf;

use directories::ProjectDirs;

/// Overrides the store location for both the collector and the viewer.
pub const ENV_STORE: &str = "SCREENWATCH_STORE";

pub const STORE_FILE: &str = "screenwatch.json";
pub const IDENTITY_FILE: &str = "child_identity.json";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "screenwatch", "screenwatch")
}

/// Store path: `$SCREENWATCH_STORE`, else `<data dir>/screenwatch.json`.
pub fn default_store_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(ENV_STORE)
        && !p.trim().is_empty()
    {
        return Some(PathBuf::from(p));
    }
    Some(project_dirs()?.data_dir().join(STORE_FILE))
}

/// Where the child login flow leaves the identity for the collector.
pub fn default_identity_path() -> Option<PathBuf> {
    Some(project_dirs()?.config_dir().join(IDENTITY_FILE))
}

pub fn default_config_file(name: &str) -> Option<PathBuf> {
    Some(project_dirs()?.config_dir().join(name))
}
