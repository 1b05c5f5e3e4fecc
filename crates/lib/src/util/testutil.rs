//! Test utilities for buildline-lib.
//!
//! Helpers for tests that spawn real processes through `/bin/sh`, plus a
//! runtime whose available programs are fixed up front.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::execute::Launcher;
use crate::platform::Runtime;

/// A runtime that claims to contain exactly the listed programs.
#[derive(Debug, Clone, Default)]
pub struct FakeRuntime {
  programs: Vec<String>,
}

impl FakeRuntime {
  pub fn with_programs(programs: &[&str]) -> Self {
    Self {
      programs: programs.iter().map(|p| p.to_string()).collect(),
    }
  }
}

impl Runtime for FakeRuntime {
  fn id(&self) -> &str {
    "fake"
  }

  fn contains_program_in_path(&self, program: &str) -> bool {
    self.programs.iter().any(|p| p == program)
  }
}

/// Returns a launcher that runs `script` with `/bin/sh -c`.
pub fn sh(script: &str) -> Launcher {
  Launcher::new("/bin/sh").args(["-c", script])
}

/// Returns a launcher that appends `line` to `log`.
///
/// Pipeline tests use this to observe the order in which stages ran.
pub fn append_line(log: &Path, line: &str) -> Launcher {
  sh(&format!("echo '{}' >> '{}'", line, log.display()))
}

/// Reads the lines recorded by [`append_line`]; a missing log reads as empty.
pub fn read_lines(log: &Path) -> Vec<String> {
  std::fs::read_to_string(log)
    .map(|content| content.lines().map(str::to_string).collect())
    .unwrap_or_default()
}

/// Writes a shell script standing in for an external tool.
///
/// The script is run as `/bin/sh <path> <args...>`, so it needs no exec bit.
pub fn write_tool_script(dir: &Path, name: &str, body: &str) -> PathBuf {
  let path = dir.join(name);
  std::fs::write(&path, body).unwrap();
  path
}

/// Polls until `path` contains a pid, then returns it.
pub async fn wait_for_file(path: &Path) -> i32 {
  for _ in 0..500 {
    if let Ok(content) = std::fs::read_to_string(path)
      && let Ok(pid) = content.trim().parse()
    {
      return pid;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  panic!("timed out waiting for {}", path.display());
}

/// Returns true if a process with `pid` is still running.
///
/// A zombie waiting to be reaped by its new parent counts as gone.
#[cfg(unix)]
pub fn process_exists(pid: i32) -> bool {
  let alive = match rustix::process::Pid::from_raw(pid) {
    Some(pid) => rustix::process::test_kill_process(pid).is_ok(),
    None => false,
  };
  alive && !is_zombie(pid)
}

#[cfg(target_os = "linux")]
fn is_zombie(pid: i32) -> bool {
  std::fs::read_to_string(format!("/proc/{pid}/stat"))
    .ok()
    .and_then(|stat| {
      let (_, rest) = stat.rsplit_once(')')?;
      rest.split_whitespace().next().map(|state| state == "Z")
    })
    .unwrap_or(false)
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_zombie(_pid: i32) -> bool {
  false
}

/// Polls until `pid` is gone, giving up after a few seconds.
///
/// Orphans are reaped by init asynchronously, so a killed grandchild can
/// linger briefly.
#[cfg(unix)]
pub async fn wait_for_exit(pid: i32) -> bool {
  for _ in 0..500 {
    if !process_exists(pid) {
      return true;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  false
}
