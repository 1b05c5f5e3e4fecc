//! Runtimes: the environment stage commands are executed in.
//!
//! Addins consult the active runtime to verify that the tools they need are
//! available before attaching stages that depend on them.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// A toolchain/runtime that pipeline commands run inside.
pub trait Runtime: Send + Sync + fmt::Debug {
  /// Stable identifier, e.g. `"host"`.
  fn id(&self) -> &str;

  /// Returns true if `program` can be found on this runtime's `PATH`.
  fn contains_program_in_path(&self, program: &str) -> bool;
}

/// The machine buildline itself runs on.
#[derive(Debug, Clone)]
pub struct HostRuntime {
  path: Option<OsString>,
}

impl HostRuntime {
  /// Captures the current process `PATH`.
  pub fn new() -> Self {
    Self {
      path: std::env::var_os("PATH"),
    }
  }

  /// Uses an explicit search path instead of the process `PATH`.
  pub fn with_path(path: impl Into<OsString>) -> Self {
    Self {
      path: Some(path.into()),
    }
  }

  /// Resolves `program` against the search path.
  pub fn find_program(&self, program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
      return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let path = self.path.as_ref()?;
    std::env::split_paths(path)
      .flat_map(|dir| executable_names(program).into_iter().map(move |name| dir.join(name)))
      .find(|full| is_executable(full))
  }
}

impl Default for HostRuntime {
  fn default() -> Self {
    Self::new()
  }
}

impl Runtime for HostRuntime {
  fn id(&self) -> &str {
    "host"
  }

  fn contains_program_in_path(&self, program: &str) -> bool {
    self.find_program(program).is_some()
  }
}

#[cfg(windows)]
fn executable_names(program: &str) -> Vec<String> {
  vec![program.to_string(), format!("{}.exe", program)]
}

#[cfg(not(windows))]
fn executable_names(program: &str) -> Vec<String> {
  vec![program.to_string()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
  use std::os::unix::fs::PermissionsExt;

  path
    .metadata()
    .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
    .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
  path.is_file()
}
