//! Swift Package Manager integration.
//!
//! Projects are recognised by a `Package.swift` manifest. The addin resolves
//! dependencies and builds with `swift`, passing the pipeline's build
//! directory through `--build-path`. Targets are listed from
//! `swift package dump-package` and run through `swift run`.

mod dump;
mod provider;

use tracing::debug;

use crate::addin::{ConfigError, PipelineAddin};
use crate::build_system::{BuildSystem, MarkerPattern};
use crate::pipeline::{EntryId, Phase, Pipeline, Stage};

pub use dump::{PackageDump, TargetDecl};
pub use provider::SwiftTargetProvider;

/// Build-system id for Swift packages.
pub const SWIFT_KIND: &str = "swift";
pub const DISPLAY_NAME: &str = "Swift Package Manager";
pub const MARKER_GLOB: &str = "Package.swift";
pub const SWIFT_PROGRAM: &str = "swift";
pub const LANGUAGE: &str = "Swift";

/// Marker used to detect Swift packages.
pub fn marker() -> MarkerPattern {
  MarkerPattern::new(SWIFT_KIND, DISPLAY_NAME, MARKER_GLOB, 0)
}

/// Argument vector prefix that runs a target built into `builddir`.
pub fn run_prefix(builddir: &str) -> Vec<String> {
  [SWIFT_PROGRAM, "run", "--build-path", builddir]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Attaches the dependency and build stages for Swift packages.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwiftPipelineAddin;

impl PipelineAddin for SwiftPipelineAddin {
  fn kind(&self) -> &str {
    SWIFT_KIND
  }

  fn load(&self, pipeline: &mut Pipeline, build_system: &BuildSystem) -> Result<Vec<EntryId>, ConfigError> {
    if !self.applies(build_system) {
      return Ok(Vec::new());
    }

    let runtime = &pipeline.config().runtime;
    if !runtime.contains_program_in_path(SWIFT_PROGRAM) {
      return Err(ConfigError::MissingProgram {
        kind: LANGUAGE.to_string(),
        program: SWIFT_PROGRAM.to_string(),
        runtime: runtime.id().to_string(),
      });
    }

    let builddir = pipeline.config().builddir.to_string_lossy().into_owned();

    // Reloading after an unload writes the same prefix again.
    let prefix = run_prefix(&builddir);
    if build_system.run_prefix() != Some(prefix.as_slice()) {
      build_system.set_run_prefix(prefix)?;
    }

    let resolve = pipeline
      .create_launcher(SWIFT_PROGRAM)
      .args(["package", "--build-path", &builddir, "resolve"]);
    let build = pipeline
      .create_launcher(SWIFT_PROGRAM)
      .args(["build", "--build-path", &builddir]);
    let clean = pipeline
      .create_launcher(SWIFT_PROGRAM)
      .args(["package", "--build-path", &builddir, "clean"]);

    let deps_stage = pipeline.attach(
      Phase::Dependencies,
      0,
      Stage::new("Resolving dependencies", resolve).always_pending(),
    );
    let build_stage = pipeline.attach(
      Phase::Build,
      0,
      Stage::new("Building project", build)
        .with_clean(clean)
        .always_pending(),
    );

    debug!(builddir = %builddir, "attached swift stages");
    Ok(vec![deps_stage, build_stage])
  }
}
