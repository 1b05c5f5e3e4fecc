//! Build targets and their asynchronous discovery.
//!
//! A [`TargetProvider`] owns no targets. Each call to
//! [`TargetProvider::discover`] asks the build tool which units the project
//! declares and maps them to [`BuildTarget`]s, preserving the tool's order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::build_system::BuildSystem;
use crate::execute::{Cancellation, LaunchError};

/// A runnable artifact declared by the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildTarget {
  name: String,
  language: String,
  working_directory: PathBuf,
  argv: Vec<String>,
  install_directory: Option<PathBuf>,
}

impl BuildTarget {
  pub fn new(
    name: impl Into<String>,
    language: impl Into<String>,
    working_directory: impl Into<PathBuf>,
    argv: Vec<String>,
    install_directory: Option<PathBuf>,
  ) -> Self {
    Self {
      name: name.into(),
      language: language.into(),
      working_directory: working_directory.into(),
      argv,
      install_directory,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn language(&self) -> &str {
    &self.language
  }

  pub fn working_directory(&self) -> &Path {
    &self.working_directory
  }

  /// Full argument vector that runs this target.
  pub fn argv(&self) -> &[String] {
    &self.argv
  }

  pub fn install_directory(&self) -> Option<&Path> {
    self.install_directory.as_deref()
  }
}

/// Errors that can occur during target discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
  /// The provider does not handle the active build system.
  #[error("build system '{actual}' is not supported by the {expected} target provider")]
  UnsupportedKind { expected: String, actual: String },

  /// The introspection command could not be launched.
  #[error("failed to launch target discovery: {0}")]
  Launch(#[source] LaunchError),

  /// The introspection command exited with a non-zero status.
  #[error("target discovery exited with code {code:?}: {stderr}")]
  Failed { code: Option<i32>, stderr: String },

  /// The introspection output was not in the expected format.
  #[error("failed to parse target dump: {0}")]
  Parse(#[from] serde_json::Error),

  /// Targets cannot be run before an addin has recorded the run prefix.
  #[error("run prefix for build system '{0}' is not set; load the pipeline first")]
  RunPrefixUnset(String),

  /// The cancellation token fired; the child process was killed.
  #[error("target discovery was cancelled")]
  Cancelled,

  /// The spawned discovery task panicked or was aborted.
  #[error("target discovery task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

impl From<LaunchError> for DiscoveryError {
  fn from(err: LaunchError) -> Self {
    match err {
      LaunchError::Cancelled { .. } => DiscoveryError::Cancelled,
      LaunchError::Failed { code, stderr, .. } => DiscoveryError::Failed {
        code,
        stderr: stderr.trim().to_string(),
      },
      other => DiscoveryError::Launch(other),
    }
  }
}

/// Enumerates runnable targets for one build-system kind.
#[async_trait]
pub trait TargetProvider: Send + Sync {
  /// Build-system id this provider handles.
  fn kind(&self) -> &str;

  /// Discover the project's targets without blocking the caller.
  ///
  /// A mismatched build system resolves immediately with
  /// [`DiscoveryError::UnsupportedKind`]. Cancelling `cancel` kills any
  /// process the provider spawned and resolves with
  /// [`DiscoveryError::Cancelled`].
  async fn discover(
    &self,
    build_system: &BuildSystem,
    cancel: &Cancellation,
  ) -> Result<Vec<BuildTarget>, DiscoveryError>;
}

/// Run discovery as a background task and hand back its result channel.
///
/// Used to list targets while a pipeline is executing.
pub fn spawn_discovery(
  provider: Arc<dyn TargetProvider>,
  build_system: Arc<BuildSystem>,
  cancel: Cancellation,
) -> JoinHandle<Result<Vec<BuildTarget>, DiscoveryError>> {
  debug!(kind = %provider.kind(), "spawning target discovery");
  tokio::spawn(async move {
    let targets = provider.discover(&build_system, &cancel).await?;
    info!(count = targets.len(), "discovered targets");
    Ok(targets)
  })
}

/// Registered target providers.
#[derive(Default)]
pub struct TargetProviders {
  providers: Vec<Arc<dyn TargetProvider>>,
}

impl TargetProviders {
  pub fn new() -> Self {
    Self::default()
  }

  /// Every provider shipped in this crate, running tools with the extra
  /// environment `env`.
  pub fn with_defaults(env: &BTreeMap<String, String>) -> Self {
    let mut providers = Self::new();
    providers.register(Arc::new(crate::swift::SwiftTargetProvider::new().with_env(env)));
    providers
  }

  pub fn register(&mut self, provider: Arc<dyn TargetProvider>) {
    self.providers.push(provider);
  }

  /// The first provider whose kind matches `build_system`.
  pub fn for_build_system(&self, build_system: &BuildSystem) -> Option<Arc<dyn TargetProvider>> {
    self
      .providers
      .iter()
      .find(|provider| provider.kind() == build_system.id())
      .cloned()
  }
}
