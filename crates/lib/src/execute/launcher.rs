//! Process launcher.
//!
//! A [`Launcher`] describes one external command: its argument vector, working
//! directory and extra environment. Running it spawns the process with tokio,
//! streams stdout/stderr line by line while it runs, and turns a non-zero exit
//! into [`LaunchError::Failed`] carrying everything that was printed.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, trace, warn};

use super::cancel::Cancellation;
use super::types::{LaunchError, LaunchOutput, OutputSink, OutputStream};

/// Describes a single external command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Launcher {
  argv: Vec<String>,
  cwd: Option<PathBuf>,
  env: BTreeMap<String, String>,
}

impl Launcher {
  /// Create a launcher whose argument vector starts with `program`.
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      argv: vec![program.into()],
      ..Default::default()
    }
  }

  /// Create a launcher from a full argument vector.
  pub fn from_argv<I, S>(argv: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      argv: argv.into_iter().map(Into::into).collect(),
      ..Default::default()
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.argv.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.argv.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
    self.cwd = Some(cwd.into());
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
    self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
    self
  }

  pub fn argv(&self) -> &[String] {
    &self.argv
  }

  pub fn working_dir(&self) -> Option<&Path> {
    self.cwd.as_deref()
  }

  pub fn environment(&self) -> &BTreeMap<String, String> {
    &self.env
  }

  /// Run to completion.
  ///
  /// # Returns
  ///
  /// The captured output when the process exits with status 0, otherwise
  /// [`LaunchError::Failed`] carrying the exit code and captured output.
  pub async fn run(&self) -> Result<LaunchOutput, LaunchError> {
    self.spawn_and_wait(None, None).await
  }

  /// Run to completion, handing every output line to `sink` as it is read.
  ///
  /// The returned output (or [`LaunchError::Failed`]) still carries the full
  /// captured text.
  pub async fn run_with_output(&self, sink: &OutputSink) -> Result<LaunchOutput, LaunchError> {
    self.spawn_and_wait(None, Some(sink)).await
  }

  /// Run to completion unless `cancel` fires first.
  ///
  /// On unix the child leads its own process group. On cancellation the whole
  /// group is killed and the child reaped before [`LaunchError::Cancelled`] is
  /// returned, so helpers the tool forked die with it.
  pub async fn run_cancellable(&self, cancel: &Cancellation) -> Result<LaunchOutput, LaunchError> {
    self.spawn_and_wait(Some(cancel), None).await
  }

  async fn spawn_and_wait(
    &self,
    cancel: Option<&Cancellation>,
    sink: Option<&OutputSink>,
  ) -> Result<LaunchOutput, LaunchError> {
    let (program, args) = self.argv.split_first().ok_or(LaunchError::EmptyArgv)?;

    if cancel.is_some_and(Cancellation::is_cancelled) {
      return Err(LaunchError::Cancelled {
        program: program.clone(),
      });
    }

    info!(command = %self, "launching process");

    let mut command = Command::new(program);
    command
      .args(args)
      .envs(&self.env)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);
    if let Some(cwd) = &self.cwd {
      command.current_dir(cwd);
    }
    // Only cancellable launches leave the foreground process group.
    #[cfg(unix)]
    {
      if cancel.is_some() {
        command.process_group(0);
      }
    }

    debug!(working_dir = ?self.cwd, "spawning process");

    let mut child = command.spawn().map_err(|source| LaunchError::Spawn {
      program: program.clone(),
      source,
    })?;

    let stdout_task = tokio::spawn(forward_lines(
      child.stdout.take(),
      OutputStream::Stdout,
      sink.cloned(),
    ));
    let stderr_task = tokio::spawn(forward_lines(
      child.stderr.take(),
      OutputStream::Stderr,
      sink.cloned(),
    ));

    let waited = match cancel {
      Some(cancel) => tokio::select! {
        status = child.wait() => Some(status),
        _ = cancel.cancelled() => None,
      },
      None => Some(child.wait().await),
    };

    let Some(status) = waited else {
      warn!(program = %program, pid = ?child.id(), "cancelling process");
      terminate(&mut child, program).await;
      stdout_task.abort();
      stderr_task.abort();
      return Err(LaunchError::Cancelled {
        program: program.clone(),
      });
    };

    let status = status.map_err(|source| LaunchError::Wait {
      program: program.clone(),
      source,
    })?;

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();

    if !status.success() {
      debug!(program = %program, code = ?status.code(), "process exited unsuccessfully");
      return Err(LaunchError::Failed {
        program: program.clone(),
        code: status.code(),
        stdout,
        stderr,
      });
    }

    if !stdout.is_empty() {
      debug!(bytes = stdout.len(), "command output");
    }

    Ok(LaunchOutput {
      code: status.code(),
      stdout,
      stderr,
    })
  }
}

impl fmt::Display for Launcher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.argv.join(" "))
  }
}

/// Kill a cancelled child and reap it.
#[cfg(unix)]
async fn terminate(child: &mut Child, program: &str) {
  use rustix::process::{Pid, Signal, kill_process_group};

  // The child was spawned with process_group(0), so its pid is the group id.
  let group = child.id().and_then(|id| i32::try_from(id).ok()).and_then(Pid::from_raw);
  let Some(group) = group else {
    kill_child(child, program).await;
    return;
  };

  match kill_process_group(group, Signal::KILL) {
    Ok(()) => {
      if let Err(e) = child.wait().await {
        warn!(program = %program, error = %e, "failed to reap cancelled process");
      }
    }
    Err(e) => {
      warn!(program = %program, error = %e, "failed to kill process group");
      kill_child(child, program).await;
    }
  }
}

#[cfg(not(unix))]
async fn terminate(child: &mut Child, program: &str) {
  kill_child(child, program).await;
}

async fn kill_child(child: &mut Child, program: &str) {
  // kill() also reaps the child.
  if let Err(e) = child.kill().await {
    warn!(program = %program, error = %e, "failed to kill cancelled process");
  }
}

/// Read `reader` line by line until EOF, passing each line to `sink` and
/// returning everything read.
async fn forward_lines<R: AsyncRead + Unpin>(
  reader: Option<R>,
  stream: OutputStream,
  sink: Option<OutputSink>,
) -> String {
  let mut captured = String::new();
  let Some(reader) = reader else {
    return captured;
  };

  let mut reader = BufReader::new(reader);
  let mut buf = Vec::new();
  loop {
    buf.clear();
    match reader.read_until(b'\n', &mut buf).await {
      Ok(0) => break,
      Ok(_) => {
        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_end_matches(['\n', '\r']);
        trace!(%stream, line, "process output");
        if let Some(sink) = &sink {
          sink(stream, line);
        }
        captured.push_str(&text);
      }
      Err(e) => {
        debug!(%stream, error = %e, "stopped reading process output");
        break;
      }
    }
  }
  captured
}
