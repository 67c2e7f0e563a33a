//! Resolution of the client home directory.
//!
//! The home directory holds the persisted session file and log files. When the
//! user does not configure one, a platform default is used:
//! Windows: `%APPDATA%/<subdir>`, Unix/macOS: `$HOME/<subdir>`.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HomeDirError {
    #[error("platform home directory is unknown (environment variable {0} is not set)")]
    NoPlatformHome(&'static str),

    #[error("home directory must be absolute after expansion: '{0}'")]
    NotAbsolute(String),

    #[error("failed to create home directory '{path}': {source}")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(target_os = "windows")]
const PLATFORM_HOME_VAR: &str = "APPDATA";
#[cfg(not(target_os = "windows"))]
const PLATFORM_HOME_VAR: &str = "HOME";

fn platform_home() -> Result<PathBuf, HomeDirError> {
    std::env::var_os(PLATFORM_HOME_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or(HomeDirError::NoPlatformHome(PLATFORM_HOME_VAR))
}

/// Expand a leading `~` against the platform home.
fn expand_tilde(raw: &str) -> Result<PathBuf, HomeDirError> {
    if raw == "~" {
        return platform_home();
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        return Ok(platform_home()?.join(rest));
    }
    Ok(PathBuf::from(raw))
}

/// Resolve the home directory into an absolute path.
///
/// - `configured`: user-provided path (may start with `~`), `None` for the platform default
/// - `default_subdir`: directory created under the platform home when nothing is configured
/// - `create`: create the directory (and parents) if it does not exist
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let path = match configured {
        Some(raw) => expand_tilde(raw.trim())?,
        None => platform_home()?.join(default_subdir),
    };

    if !path.is_absolute() {
        return Err(HomeDirError::NotAbsolute(path.to_string_lossy().to_string()));
    }

    if create {
        ensure_dir(&path)?;
    }
    Ok(path)
}

fn ensure_dir(path: &Path) -> Result<(), HomeDirError> {
    std::fs::create_dir_all(path).map_err(|source| HomeDirError::Create {
        path: path.to_string_lossy().to_string(),
        source,
    })
}
