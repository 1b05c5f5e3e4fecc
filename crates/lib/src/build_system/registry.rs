//! Marker-file based build system detection.

use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use thiserror::Error;
use tracing::{debug, warn};

use super::BuildSystem;

/// Errors that can occur while resolving a project's build system.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// No registered marker matched the project.
  #[error("no known build system found in {}", path.display())]
  NoMatch { path: PathBuf },

  /// A marker's glob pattern is invalid.
  #[error("invalid marker pattern '{pattern}': {source}")]
  InvalidPattern {
    pattern: String,
    #[source]
    source: glob::PatternError,
  },

  /// The project directory could not be read.
  #[error("failed to read {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// A filename pattern identifying one build-system kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPattern {
  pub kind: String,
  pub display_name: String,
  /// Glob matched against file names in the project root, e.g. `Package.swift`.
  pub glob: String,
  /// Higher wins when several markers match.
  pub priority: i32,
}

impl MarkerPattern {
  pub fn new(
    kind: impl Into<String>,
    display_name: impl Into<String>,
    glob: impl Into<String>,
    priority: i32,
  ) -> Self {
    Self {
      kind: kind.into(),
      display_name: display_name.into(),
      glob: glob.into(),
      priority,
    }
  }
}

/// Registry of known build-system markers.
#[derive(Debug, Default)]
pub struct BuildSystemRegistry {
  markers: Vec<(MarkerPattern, Pattern)>,
}

impl BuildSystemRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registry with every build system shipped in this crate.
  pub fn with_defaults() -> Self {
    let mut registry = Self::new();
    if let Err(e) = registry.register(crate::swift::marker()) {
      warn!(error = %e, "skipping built-in marker");
    }
    registry
  }

  pub fn register(&mut self, marker: MarkerPattern) -> Result<(), ResolveError> {
    let pattern = Pattern::new(&marker.glob).map_err(|source| ResolveError::InvalidPattern {
      pattern: marker.glob.clone(),
      source,
    })?;
    self.markers.push((marker, pattern));
    Ok(())
  }

  /// Detect the build system for `path`.
  ///
  /// `path` may be the project directory, whose immediate entries are matched,
  /// or a project file, which is matched directly. The highest-priority
  /// marker wins; ties go to the marker registered first.
  pub fn detect(&self, path: &Path) -> Result<BuildSystem, ResolveError> {
    let candidates = candidates(path)?;

    let mut best: Option<(&MarkerPattern, &PathBuf)> = None;
    for (marker, pattern) in &self.markers {
      let Some(found) = candidates.iter().find(|candidate| {
        candidate
          .file_name()
          .and_then(|name| name.to_str())
          .is_some_and(|name| pattern.matches(name))
      }) else {
        continue;
      };

      debug!(kind = %marker.kind, file = %found.display(), priority = marker.priority, "marker matched");

      if best.is_none_or(|(current, _)| marker.priority > current.priority) {
        best = Some((marker, found));
      }
    }

    let (marker, found) = best.ok_or_else(|| ResolveError::NoMatch {
      path: path.to_path_buf(),
    })?;

    Ok(BuildSystem::new(
      marker.kind.clone(),
      marker.display_name.clone(),
      marker.priority,
      found.clone(),
    ))
  }
}

/// Files considered for matching, sorted for deterministic results.
fn candidates(path: &Path) -> Result<Vec<PathBuf>, ResolveError> {
  if !path.is_dir() {
    return Ok(vec![path.to_path_buf()]);
  }

  let io_err = |source| ResolveError::Io {
    path: path.to_path_buf(),
    source,
  };

  let mut entries = Vec::new();
  for entry in std::fs::read_dir(path).map_err(io_err)? {
    entries.push(entry.map_err(io_err)?.path());
  }
  entries.sort();
  Ok(entries)
}
