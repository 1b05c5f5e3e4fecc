//! Types for pipeline execution.

use std::fmt;

use thiserror::Error;

use super::phase::Phase;
use crate::execute::LaunchError;

/// Handle to an entry attached to a [`Pipeline`](super::Pipeline).
///
/// Handles are unique per pipeline and increase with insertion order, which
/// is what breaks ties between entries of equal phase and priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(pub(crate) u64);

impl fmt::Display for EntryId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "entry:{}", self.0)
  }
}

/// Which of a stage's commands was running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOp {
  Run,
  Clean,
}

impl fmt::Display for StageOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StageOp::Run => f.write_str("run"),
      StageOp::Clean => f.write_str("clean"),
    }
  }
}

/// A stage's command failed during `execute` or `clean`.
#[derive(Debug, Error)]
#[error("stage '{stage}' ({phase}) failed to {op}: {source}")]
pub struct StageError {
  pub stage: String,
  pub phase: Phase,
  pub op: StageOp,
  #[source]
  pub source: LaunchError,
}

impl StageError {
  /// Captured output of the failing command, stderr first.
  pub fn output(&self) -> Option<&str> {
    match &self.source {
      LaunchError::Failed { stdout, stderr, .. } => {
        if !stderr.trim().is_empty() {
          Some(stderr)
        } else if !stdout.trim().is_empty() {
          Some(stdout)
        } else {
          None
        }
      }
      _ => None,
    }
  }
}
