//! Build session orchestration.
//!
//! [`BuildSession::open`] wires the pieces together for one project:
//!
//! 1. Resolve the build system from marker files
//! 2. Create the pipeline configuration (source dir, build dir, environment)
//! 3. Offer the pipeline to every registered addin
//!
//! The session then drives builds and target discovery for callers such as the
//! CLI.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::addin::{Addins, ConfigError};
use crate::build_system::{BuildSystem, BuildSystemRegistry, ProjectContext, ResolveError};
use crate::execute::Cancellation;
use crate::pipeline::{Phase, Pipeline, PipelineConfig, StageError};
use crate::platform::Runtime;
use crate::targets::{BuildTarget, DiscoveryError, TargetProviders, spawn_discovery};

/// Errors that can occur while opening or driving a session.
#[derive(Debug, Error)]
pub enum SessionError {
  /// No build system could be resolved for the project.
  #[error("resolve error: {0}")]
  Resolve(#[from] ResolveError),

  /// An addin matching the build system failed to configure the pipeline.
  #[error("failed to configure {kind} pipeline: {source}")]
  Addin {
    kind: String,
    #[source]
    source: ConfigError,
  },

  /// A stage failed during build, clean or rebuild.
  #[error(transparent)]
  Stage(#[from] StageError),

  /// Target discovery failed.
  #[error(transparent)]
  Discovery(#[from] DiscoveryError),

  /// No target provider handles the build system.
  #[error("no target provider for build system '{0}'")]
  NoTargetProvider(String),

  /// The requested target is not declared by the project.
  #[error("target '{0}' not found")]
  TargetNotFound(String),
}

/// Options for opening a session.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
  /// Project directory or marker file.
  pub project: PathBuf,

  /// Build directory; defaults to the per-user cache location.
  pub builddir: Option<PathBuf>,

  /// Extra environment for every stage.
  pub env: BTreeMap<String, String>,

  /// Runtime to build in; defaults to the host.
  pub runtime: Option<Arc<dyn Runtime>>,
}

/// A resolved project with its loaded pipeline.
pub struct BuildSession {
  context: ProjectContext,
  build_system: Arc<BuildSystem>,
  pipeline: Pipeline,
  addins: Addins,
  providers: TargetProviders,
}

impl BuildSession {
  /// Resolve the project and load its pipeline using the built-in addins.
  pub fn open(options: SessionOptions) -> Result<Self, SessionError> {
    let providers = TargetProviders::with_defaults(&options.env);
    Self::open_with(
      options,
      &BuildSystemRegistry::with_defaults(),
      Addins::with_defaults(),
      providers,
    )
  }

  /// Like [`BuildSession::open`] with explicit registries.
  pub fn open_with(
    options: SessionOptions,
    registry: &BuildSystemRegistry,
    mut addins: Addins,
    providers: TargetProviders,
  ) -> Result<Self, SessionError> {
    let context = ProjectContext::new(&options.project);
    let build_system = context.resolve(registry)?;

    let srcdir = build_system.project_dir();
    let mut config = match options.builddir {
      Some(builddir) => PipelineConfig::new(&srcdir, builddir),
      None => PipelineConfig::for_project(&srcdir),
    };
    config.env = options.env;
    if let Some(runtime) = options.runtime {
      config = config.with_runtime(runtime);
    }

    info!(
      project = %srcdir.display(),
      builddir = %config.builddir.display(),
      runtime = %config.runtime.id(),
      "opening build session"
    );

    let mut pipeline = Pipeline::new(config);
    let report = addins.load_all(&mut pipeline, &build_system);

    let mut failures = report.failed.into_iter();
    if let Some((kind, source)) = failures.next() {
      for (other, error) in failures {
        warn!(kind = %other, error = %error, "additional addin failure");
      }
      return Err(SessionError::Addin { kind, source });
    }

    Ok(Self {
      context,
      build_system,
      pipeline,
      addins,
      providers,
    })
  }

  pub fn context(&self) -> &ProjectContext {
    &self.context
  }

  pub fn build_system(&self) -> &Arc<BuildSystem> {
    &self.build_system
  }

  pub fn pipeline(&self) -> &Pipeline {
    &self.pipeline
  }

  pub fn pipeline_mut(&mut self) -> &mut Pipeline {
    &mut self.pipeline
  }

  pub fn addins(&self) -> &Addins {
    &self.addins
  }

  pub async fn build(&mut self, phase: Phase) -> Result<(), SessionError> {
    Ok(self.pipeline.execute(phase).await?)
  }

  pub async fn clean(&mut self, phase: Phase) -> Result<(), SessionError> {
    Ok(self.pipeline.clean(phase).await?)
  }

  pub async fn rebuild(&mut self, phase: Phase) -> Result<(), SessionError> {
    Ok(self.pipeline.rebuild(phase).await?)
  }

  /// Discover the project's targets on a background task.
  pub async fn discover(&self, cancel: &Cancellation) -> Result<Vec<BuildTarget>, SessionError> {
    let provider = self
      .providers
      .for_build_system(&self.build_system)
      .ok_or_else(|| SessionError::NoTargetProvider(self.build_system.id().to_string()))?;

    let handle = spawn_discovery(provider, self.build_system.clone(), cancel.clone());
    let targets = handle.await.map_err(DiscoveryError::from)??;
    Ok(targets)
  }

  /// Discover targets and return the one named `name`.
  pub async fn find_target(&self, name: &str, cancel: &Cancellation) -> Result<BuildTarget, SessionError> {
    self
      .discover(cancel)
      .await?
      .into_iter()
      .find(|target| target.name() == name)
      .ok_or_else(|| SessionError::TargetNotFound(name.to_string()))
  }
}
