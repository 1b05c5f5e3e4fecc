//! Types for launching external processes.

use std::fmt;
use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur while launching an external process.
#[derive(Debug, Error)]
pub enum LaunchError {
  /// The launcher was run without a program in its argument vector.
  #[error("no program to launch: argument vector is empty")]
  EmptyArgv,

  /// The process could not be spawned (missing binary, bad cwd, ...).
  #[error("failed to spawn {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  /// Waiting on the spawned process failed.
  #[error("failed to wait for {program}: {source}")]
  Wait {
    program: String,
    #[source]
    source: io::Error,
  },

  /// The process exited with a non-zero status.
  #[error("{program} failed with exit code {code:?}")]
  Failed {
    program: String,
    code: Option<i32>,
    stdout: String,
    stderr: String,
  },

  /// The process was killed because its cancellation token fired.
  #[error("{program} was cancelled")]
  Cancelled { program: String },
}

/// The child stream a line of output was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
  Stdout,
  Stderr,
}

impl OutputStream {
  pub fn as_str(&self) -> &'static str {
    match self {
      OutputStream::Stdout => "stdout",
      OutputStream::Stderr => "stderr",
    }
  }
}

impl fmt::Display for OutputStream {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Receives each line of child output while the process is still running.
///
/// The line is passed without its trailing newline. Lines from stdout and
/// stderr are read concurrently, so the sink may be called from two tasks.
pub type OutputSink = Arc<dyn Fn(OutputStream, &str) + Send + Sync>;

/// Output of a process that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOutput {
  /// Exit code, `None` if the process was terminated by a signal.
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl LaunchOutput {
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }
}
