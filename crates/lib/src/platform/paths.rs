use crate::consts::{APP_NAME, BUILD_DIR_ENV};
use std::path::{Path, PathBuf};

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var("USERPROFILE")
    .map(PathBuf::from)
    .unwrap_or_else(|_| std::env::temp_dir())
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var("HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| std::env::temp_dir())
}

/// Returns the directory for cache files for the application
#[cfg(windows)]
pub fn cache_dir() -> PathBuf {
  std::env::var("LOCALAPPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir())
    .join(APP_NAME)
    .join("Cache")
}

/// Returns the directory for cache files for the application
#[cfg(not(windows))]
pub fn cache_dir() -> PathBuf {
  let cache_home = std::env::var("XDG_CACHE_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".cache"));
  cache_home.join(APP_NAME)
}

/// Returns the root under which per-project build directories live.
///
/// `BUILDLINE_BUILD_DIR` takes precedence over the cache directory.
pub fn builds_root() -> PathBuf {
  if let Ok(path) = std::env::var(BUILD_DIR_ENV) {
    return PathBuf::from(path);
  }
  cache_dir().join("builds")
}

/// Returns the default build directory for the project rooted at `project_dir`.
pub fn project_build_dir(project_dir: &Path) -> PathBuf {
  let name = project_dir
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| "project".to_string());
  builds_root().join(name)
}
