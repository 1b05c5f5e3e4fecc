//! Pipeline configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::platform::paths::project_build_dir;
use crate::platform::{HostRuntime, Runtime};

/// Configuration shared by every stage of one pipeline.
///
/// One pipeline exists per (source tree, build directory, runtime) combination.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
  /// Project source directory; stages run here.
  pub srcdir: PathBuf,

  /// Build output directory handed to the build tool.
  pub builddir: PathBuf,

  /// Extra environment for every launcher created by the pipeline.
  pub env: BTreeMap<String, String>,

  /// Runtime the stages execute in.
  pub runtime: Arc<dyn Runtime>,
}

impl PipelineConfig {
  pub fn new(srcdir: impl Into<PathBuf>, builddir: impl Into<PathBuf>) -> Self {
    Self {
      srcdir: srcdir.into(),
      builddir: builddir.into(),
      env: BTreeMap::new(),
      runtime: Arc::new(HostRuntime::new()),
    }
  }

  /// Configuration for `project_dir` using the default per-user build directory.
  pub fn for_project(project_dir: &Path) -> Self {
    Self::new(project_dir, project_build_dir(project_dir))
  }

  pub fn with_runtime(mut self, runtime: Arc<dyn Runtime>) -> Self {
    self.runtime = runtime;
    self
  }

  pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }
}
