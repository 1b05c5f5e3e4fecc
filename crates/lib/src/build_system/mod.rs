//! Build system identity and resolution.
//!
//! A [`ProjectContext`] starts unresolved. The first call to
//! [`ProjectContext::resolve`] scans the project for marker files using a
//! [`BuildSystemRegistry`] and pins the winning [`BuildSystem`] for the rest
//! of the context's lifetime.

pub mod registry;

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use thiserror::Error;
use tracing::{debug, info};

pub use registry::{BuildSystemRegistry, MarkerPattern, ResolveError};

/// Returned when a build system's run prefix is written a second time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("run prefix for build system '{0}' is already set")]
pub struct RunPrefixAlreadySet(pub String);

/// The resolved kind of project being built.
///
/// Shared read-mostly as `Arc<BuildSystem>`. The only mutable field is the run
/// prefix, written once by the matching addin while it loads.
#[derive(Debug)]
pub struct BuildSystem {
  id: String,
  display_name: String,
  priority: i32,
  project_file: PathBuf,
  run_prefix: OnceLock<Vec<String>>,
}

impl BuildSystem {
  pub fn new(
    id: impl Into<String>,
    display_name: impl Into<String>,
    priority: i32,
    project_file: impl Into<PathBuf>,
  ) -> Self {
    Self {
      id: id.into(),
      display_name: display_name.into(),
      priority,
      project_file: project_file.into(),
      run_prefix: OnceLock::new(),
    }
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn display_name(&self) -> &str {
    &self.display_name
  }

  pub fn priority(&self) -> i32 {
    self.priority
  }

  /// The marker file (or directory) the build system was resolved from.
  pub fn project_file(&self) -> &Path {
    &self.project_file
  }

  /// Directory containing the project: the project file itself when it is a
  /// directory, otherwise its parent.
  pub fn project_dir(&self) -> PathBuf {
    if self.project_file.is_dir() {
      return self.project_file.clone();
    }
    self
      .project_file
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_else(|| self.project_file.clone())
  }

  /// Argument vector prefix that runs a built target once its name is appended.
  pub fn run_prefix(&self) -> Option<&[String]> {
    self.run_prefix.get().map(Vec::as_slice)
  }

  /// Record the run prefix. Only the first write wins.
  pub fn set_run_prefix(&self, prefix: Vec<String>) -> Result<(), RunPrefixAlreadySet> {
    self
      .run_prefix
      .set(prefix)
      .map_err(|_| RunPrefixAlreadySet(self.id.clone()))?;
    debug!(build_system = %self.id, prefix = ?self.run_prefix(), "run prefix recorded");
    Ok(())
  }
}

/// A project whose build system is resolved at most once.
#[derive(Debug)]
pub struct ProjectContext {
  root: PathBuf,
  build_system: OnceLock<Arc<BuildSystem>>,
}

impl ProjectContext {
  /// Create an unresolved context for the project at `root`.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    let root = root.into();
    let root = dunce::canonicalize(&root).unwrap_or(root);
    Self {
      root,
      build_system: OnceLock::new(),
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn is_resolved(&self) -> bool {
    self.build_system.get().is_some()
  }

  /// The resolved build system, if [`ProjectContext::resolve`] has succeeded.
  pub fn build_system(&self) -> Option<Arc<BuildSystem>> {
    self.build_system.get().cloned()
  }

  /// Resolve the build system, or return the one already resolved.
  pub fn resolve(&self, registry: &BuildSystemRegistry) -> Result<Arc<BuildSystem>, ResolveError> {
    if let Some(resolved) = self.build_system.get() {
      return Ok(resolved.clone());
    }

    let detected = Arc::new(registry.detect(&self.root)?);
    let resolved = self.build_system.get_or_init(|| detected);

    info!(
      build_system = %resolved.id(),
      project = %resolved.project_file().display(),
      "resolved build system"
    );
    Ok(resolved.clone())
  }
}
