//! Location of the local storage file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;

/// Environment variable that overrides the storage file location.
pub const STORAGE_ENV: &str = "APPDESK_STORAGE";

/// Storage key holding the refresh cookie between runs.
pub const REFRESH_COOKIE_KEY: &str = "refresh_cookie";

/// Get the storage file path.
pub fn storage_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(STORAGE_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let dirs =
        ProjectDirs::from("", "", "appdesk").context("Could not determine data directory")?;
    Ok(dirs.data_dir().join("storage.json"))
}
