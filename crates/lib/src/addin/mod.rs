//! Pipeline addins.
//!
//! An addin contributes the stages for one build-system kind. Every registered
//! addin is offered every pipeline; addins whose kind does not match the active
//! build system attach nothing. [`Addins`] remembers which entries each addin
//! attached so they can be detached again when the addin is unloaded.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::build_system::{BuildSystem, RunPrefixAlreadySet};
use crate::pipeline::{EntryId, Pipeline};

/// Errors raised while an addin configures a pipeline.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The active runtime lacks a tool the addin's stages need.
  #[error("the {runtime} runtime must contain {program} to build {kind} projects")]
  MissingProgram {
    kind: String,
    program: String,
    runtime: String,
  },

  /// The build system's run prefix was already recorded.
  #[error(transparent)]
  RunPrefix(#[from] RunPrefixAlreadySet),
}

/// Returned when an addin for the same kind is already registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("an addin for '{0}' is already registered")]
pub struct DuplicateAddin(pub String);

/// Contributes stages for one build-system kind.
pub trait PipelineAddin: Send + Sync {
  /// Build-system id this addin handles.
  fn kind(&self) -> &str;

  fn applies(&self, build_system: &BuildSystem) -> bool {
    build_system.id() == self.kind()
  }

  /// Attach this addin's stages to `pipeline`.
  ///
  /// A mismatched build system is not an error: return no entries. Required
  /// tools must be checked before anything is attached.
  fn load(&self, pipeline: &mut Pipeline, build_system: &BuildSystem) -> Result<Vec<EntryId>, ConfigError>;
}

/// Outcome of offering a pipeline to every registered addin.
#[derive(Debug, Default)]
pub struct LoadReport {
  /// Kinds whose addin applied and loaded.
  pub loaded: Vec<String>,
  /// Kinds whose addin did not apply.
  pub skipped: Vec<String>,
  /// Addins that failed, with their error.
  pub failed: Vec<(String, ConfigError)>,
}

impl LoadReport {
  pub fn is_success(&self) -> bool {
    self.failed.is_empty()
  }
}

/// The set of registered addins and the entries each one owns.
///
/// At most one addin is registered per kind, so entries are tracked by kind.
#[derive(Default)]
pub struct Addins {
  addins: Vec<Arc<dyn PipelineAddin>>,
  tracked: HashMap<String, Vec<EntryId>>,
}

impl Addins {
  pub fn new() -> Self {
    Self::default()
  }

  /// Every addin shipped in this crate.
  pub fn with_defaults() -> Self {
    let mut addins = Self::new();
    if let Err(e) = addins.register(Arc::new(crate::swift::SwiftPipelineAddin)) {
      warn!(error = %e, "skipping built-in addin");
    }
    addins
  }

  /// Register `addin`, rejecting a second addin for a kind already present.
  pub fn register(&mut self, addin: Arc<dyn PipelineAddin>) -> Result<(), DuplicateAddin> {
    if self.addins.iter().any(|existing| existing.kind() == addin.kind()) {
      return Err(DuplicateAddin(addin.kind().to_string()));
    }
    debug!(kind = %addin.kind(), "registering pipeline addin");
    self.addins.push(addin);
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.addins.len()
  }

  pub fn is_empty(&self) -> bool {
    self.addins.is_empty()
  }

  /// Offer `pipeline` to every addin.
  ///
  /// A failing addin is recorded in the report and does not prevent the
  /// remaining addins from loading.
  pub fn load_all(&mut self, pipeline: &mut Pipeline, build_system: &BuildSystem) -> LoadReport {
    let mut report = LoadReport::default();

    for addin in &self.addins {
      let kind = addin.kind().to_string();
      let applies = addin.applies(build_system);

      match addin.load(pipeline, build_system) {
        Ok(entries) => {
          if applies {
            info!(kind = %kind, entries = entries.len(), "addin loaded");
            report.loaded.push(kind.clone());
          } else {
            report.skipped.push(kind.clone());
          }
          if !entries.is_empty() {
            self.tracked.entry(kind).or_default().extend(entries);
          }
        }
        Err(e) => {
          warn!(kind = %kind, error = %e, "addin failed to load");
          report.failed.push((kind, e));
        }
      }
    }

    report
  }

  /// Entries attached by the addin for `kind`.
  pub fn entries_for(&self, kind: &str) -> &[EntryId] {
    self.tracked.get(kind).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Detach every entry the addin for `kind` attached. Returns how many were removed.
  pub fn unload(&mut self, pipeline: &mut Pipeline, kind: &str) -> usize {
    let Some(entries) = self.tracked.remove(kind) else {
      return 0;
    };
    let removed = entries
      .into_iter()
      .filter_map(|id| pipeline.detach(id))
      .count();
    info!(kind = %kind, removed, "addin unloaded");
    removed
  }
}
