//! Build pipeline.
//!
//! A [`Pipeline`] owns an ordered set of entries, each a [`Stage`] attached at
//! a [`Phase`] with an integer priority. Entries are kept sorted by
//! (phase, priority, insertion order) and executed strictly one at a time:
//! stage N+1 is not started until stage N's process has exited.
//!
//! - `execute` runs pending entries up to a phase and halts on first failure
//! - `clean` runs clean actions in reverse order down to a phase
//! - `query` refreshes an entry's completion flag from its predicate

pub mod config;
pub mod phase;
pub mod stage;
pub mod types;

use tracing::{debug, error, info};

use crate::execute::{LaunchError, LaunchOutput, Launcher, OutputSink};

pub use config::PipelineConfig;
pub use phase::{Phase, UnknownPhase};
pub use stage::{QueryFn, Stage};
pub use types::{EntryId, StageError, StageOp};

struct Entry {
  id: EntryId,
  phase: Phase,
  priority: i32,
  stage: Stage,
  completed: bool,
}

impl Entry {
  fn key(&self) -> (Phase, i32, EntryId) {
    (self.phase, self.priority, self.id)
  }

  /// Refresh the completion flag from the predicate, if the stage has one.
  fn query(&mut self) -> bool {
    if let Some(completed) = self.stage.evaluate_query() {
      self.completed = completed;
    }
    self.completed
  }
}

/// Read-only view of an attached entry.
#[derive(Debug, Clone, Copy)]
pub struct EntryInfo<'a> {
  pub id: EntryId,
  pub phase: Phase,
  pub priority: i32,
  pub stage: &'a Stage,
  pub completed: bool,
}

/// An ordered, phase-based sequence of stages.
pub struct Pipeline {
  config: PipelineConfig,
  entries: Vec<Entry>,
  next_id: u64,
  output: Option<OutputSink>,
}

impl Pipeline {
  pub fn new(config: PipelineConfig) -> Self {
    Self {
      config,
      entries: Vec::new(),
      next_id: 0,
      output: None,
    }
  }

  /// Forward every line stage commands print to `sink` while they run.
  pub fn set_output_sink(&mut self, sink: OutputSink) {
    self.output = Some(sink);
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  /// Create a launcher running `program` in the source directory with the
  /// pipeline's environment.
  pub fn create_launcher(&self, program: impl Into<String>) -> Launcher {
    Launcher::new(program)
      .cwd(&self.config.srcdir)
      .envs(&self.config.env)
  }

  /// Attach `stage` at `phase` with `priority`.
  ///
  /// Lower priorities run first within a phase; equal priorities run in
  /// insertion order.
  pub fn attach(&mut self, phase: Phase, priority: i32, stage: Stage) -> EntryId {
    let id = EntryId(self.next_id);
    self.next_id += 1;

    let key = (phase, priority, id);
    let position = self.entries.partition_point(|entry| entry.key() < key);

    debug!(stage = %stage.name(), %phase, priority, %id, "attaching stage");

    self.entries.insert(
      position,
      Entry {
        id,
        phase,
        priority,
        stage,
        completed: false,
      },
    );
    id
  }

  /// Remove an entry, returning its stage if it was attached.
  pub fn detach(&mut self, id: EntryId) -> Option<Stage> {
    let position = self.entries.iter().position(|entry| entry.id == id)?;
    let entry = self.entries.remove(position);
    debug!(stage = %entry.stage.name(), %id, "detached stage");
    Some(entry.stage)
  }

  /// Run every pending entry with phase <= `up_to`, in order.
  ///
  /// Each entry is queried first; completed entries are skipped. The first
  /// failing stage halts execution. Entries that already succeeded stay
  /// completed and entries after the failure stay pending.
  pub async fn execute(&mut self, up_to: Phase) -> Result<(), StageError> {
    info!(phase = %up_to, entries = self.entries.len(), "executing pipeline");

    let mut ran = 0usize;
    let mut skipped = 0usize;

    for entry in self.entries.iter_mut().take_while(|entry| entry.phase <= up_to) {
      if entry.query() {
        debug!(stage = %entry.stage.name(), "stage completed, skipping");
        skipped += 1;
        continue;
      }

      info!(stage = %entry.stage.name(), phase = %entry.phase, "running stage");

      if let Err(source) = launch(entry.stage.action(), self.output.as_ref()).await {
        let err = StageError {
          stage: entry.stage.name().to_string(),
          phase: entry.phase,
          op: StageOp::Run,
          source,
        };
        error!(stage = %err.stage, error = %err.source, output = err.output(), "stage failed");
        return Err(err);
      }

      entry.completed = true;
      ran += 1;
    }

    info!(ran, skipped, "pipeline execution complete");
    Ok(())
  }

  /// Run clean actions for every entry with phase >= `from`, last entry first.
  ///
  /// Each visited entry is marked pending once its clean action (if any)
  /// succeeds. A failing clean action halts the operation and leaves the
  /// entries not yet visited untouched.
  pub async fn clean(&mut self, from: Phase) -> Result<(), StageError> {
    info!(phase = %from, "cleaning pipeline");

    for entry in self.entries.iter_mut().rev().take_while(|entry| entry.phase >= from) {
      if let Some(clean) = entry.stage.clean_action() {
        info!(stage = %entry.stage.name(), "cleaning stage");

        if let Err(source) = launch(clean, self.output.as_ref()).await {
          let err = StageError {
            stage: entry.stage.name().to_string(),
            phase: entry.phase,
            op: StageOp::Clean,
            source,
          };
          error!(stage = %err.stage, error = %err.source, output = err.output(), "clean failed");
          return Err(err);
        }
      }
      entry.completed = false;
    }

    Ok(())
  }

  /// Clean from `phase`, then execute up to it.
  pub async fn rebuild(&mut self, phase: Phase) -> Result<(), StageError> {
    self.clean(phase).await?;
    self.execute(phase).await
  }

  /// Refresh and return an entry's completion flag.
  ///
  /// Unknown entries report `false`.
  pub fn query(&mut self, id: EntryId) -> bool {
    self
      .entries
      .iter_mut()
      .find(|entry| entry.id == id)
      .map(Entry::query)
      .unwrap_or(false)
  }

  /// Cached completion flag of an entry, without consulting its predicate.
  pub fn is_completed(&self, id: EntryId) -> Option<bool> {
    self.find(id).map(|entry| entry.completed)
  }

  pub fn stage(&self, id: EntryId) -> Option<&Stage> {
    self.find(id).map(|entry| &entry.stage)
  }

  /// Entries in execution order.
  pub fn entries(&self) -> impl Iterator<Item = EntryInfo<'_>> {
    self.entries.iter().map(|entry| EntryInfo {
      id: entry.id,
      phase: entry.phase,
      priority: entry.priority,
      stage: &entry.stage,
      completed: entry.completed,
    })
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  fn find(&self, id: EntryId) -> Option<&Entry> {
    self.entries.iter().find(|entry| entry.id == id)
  }
}

async fn launch(launcher: &Launcher, sink: Option<&OutputSink>) -> Result<LaunchOutput, LaunchError> {
  match sink {
    Some(sink) => launcher.run_with_output(sink).await,
    None => launcher.run().await,
  }
}

#[cfg(all(test, unix))]
mod tests {
  use std::path::Path;
  use std::sync::Arc;
  use std::sync::atomic::{AtomicBool, Ordering};

  use super::*;
  use crate::execute::OutputStream;
  use crate::util::testutil::{append_line, read_lines, sh};
  use tempfile::TempDir;

  fn pipeline(dir: &Path) -> Pipeline {
    Pipeline::new(PipelineConfig::new(dir, dir.join("build")))
  }

  fn stage(log: &Path, name: &str) -> Stage {
    Stage::new(name, append_line(log, name))
  }

  fn cleanable(log: &Path, name: &str) -> Stage {
    stage(log, name).with_clean(append_line(log, &format!("clean {}", name)))
  }

  #[tokio::test]
  async fn execute_orders_by_phase_priority_and_insertion() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("log");
    let mut pipeline = pipeline(temp.path());

    pipeline.attach(Phase::Build, 10, stage(&log, "build-late"));
    pipeline.attach(Phase::Dependencies, 0, stage(&log, "deps"));
    pipeline.attach(Phase::Build, 0, stage(&log, "build-a"));
    pipeline.attach(Phase::Configure, 5, stage(&log, "configure"));
    pipeline.attach(Phase::Build, 0, stage(&log, "build-b"));
    pipeline.attach(Phase::Build, -1, stage(&log, "build-early"));
    pipeline.attach(Phase::Install, 0, stage(&log, "install"));

    pipeline.execute(Phase::Final).await.unwrap();

    assert_eq!(
      read_lines(&log),
      ["configure", "deps", "build-early", "build-a", "build-b", "build-late", "install"]
    );
  }

  #[tokio::test]
  async fn equal_phase_and_priority_run_in_insertion_order() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("log");
    let mut pipeline = pipeline(temp.path());

    pipeline.attach(Phase::Build, 0, stage(&log, "A"));
    pipeline.attach(Phase::Build, 0, stage(&log, "B"));

    pipeline.execute(Phase::Build).await.unwrap();

    assert_eq!(read_lines(&log), ["A", "B"]);
  }

  #[tokio::test]
  async fn execute_never_runs_past_target_phase() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("log");
    let mut pipeline = pipeline(temp.path());

    let deps = pipeline.attach(Phase::Dependencies, 0, stage(&log, "deps"));
    let build = pipeline.attach(Phase::Build, 0, stage(&log, "build"));
    let install = pipeline.attach(Phase::Install, 0, stage(&log, "install"));

    pipeline.execute(Phase::Build).await.unwrap();

    assert_eq!(read_lines(&log), ["deps", "build"]);
    assert_eq!(pipeline.is_completed(deps), Some(true));
    assert_eq!(pipeline.is_completed(build), Some(true));
    assert_eq!(pipeline.is_completed(install), Some(false));
  }

  #[tokio::test]
  async fn second_execute_only_reruns_pending_stages() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("log");
    let mut pipeline = pipeline(temp.path());

    pipeline.attach(Phase::Dependencies, 0, stage(&log, "once"));
    pipeline.attach(Phase::Build, 0, stage(&log, "always").always_pending());

    pipeline.execute(Phase::Build).await.unwrap();
    pipeline.execute(Phase::Build).await.unwrap();

    assert_eq!(read_lines(&log), ["once", "always", "always"]);
  }

  #[tokio::test]
  async fn predicate_reporting_completed_skips_stage() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("log");
    let mut pipeline = pipeline(temp.path());

    let id = pipeline.attach(Phase::Build, 0, stage(&log, "up-to-date").with_query(|_| true));

    pipeline.execute(Phase::Build).await.unwrap();

    assert!(read_lines(&log).is_empty());
    assert_eq!(pipeline.is_completed(id), Some(true));
  }

  #[tokio::test]
  async fn failure_halts_and_leaves_later_entries_pending() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("log");
    let mut pipeline = pipeline(temp.path());

    let first = pipeline.attach(Phase::Dependencies, 0, stage(&log, "first"));
    let broken = pipeline.attach(
      Phase::Build,
      0,
      Stage::new("broken", sh("echo 'error: missing module' >&2; exit 2")),
    );
    let last = pipeline.attach(Phase::Build, 1, stage(&log, "last"));

    let err = pipeline.execute(Phase::Final).await.unwrap_err();

    assert_eq!(err.stage, "broken");
    assert_eq!(err.phase, Phase::Build);
    assert_eq!(err.op, StageOp::Run);
    assert!(matches!(err.source, LaunchError::Failed { code: Some(2), .. }));
    assert_eq!(err.output().map(str::trim), Some("error: missing module"));

    assert_eq!(read_lines(&log), ["first"]);
    assert_eq!(pipeline.is_completed(first), Some(true));
    assert_eq!(pipeline.is_completed(broken), Some(false));
    assert_eq!(pipeline.is_completed(last), Some(false));
  }

  #[tokio::test]
  async fn stage_output_reaches_sink_in_order() {
    let temp = TempDir::new().unwrap();
    let mut pipeline = pipeline(temp.path());

    let lines = Arc::new(std::sync::Mutex::new(Vec::new()));
    pipeline.set_output_sink({
      let lines = Arc::clone(&lines);
      Arc::new(move |stream: OutputStream, line: &str| {
        lines.lock().unwrap().push(format!("{stream}: {line}"));
      })
    });

    pipeline.attach(Phase::Dependencies, 0, Stage::new("resolve", sh("echo Fetching")));
    pipeline.attach(
      Phase::Build,
      0,
      Stage::new("build", sh("echo Compiling; echo 'error: oops' >&2; exit 1")),
    );

    let err = pipeline.execute(Phase::Final).await.unwrap_err();

    assert_eq!(err.stage, "build");
    let lines = lines.lock().unwrap();
    assert_eq!(lines[0], "stdout: Fetching");
    assert!(lines.contains(&"stdout: Compiling".to_string()));
    assert!(lines.contains(&"stderr: error: oops".to_string()));
    assert_eq!(lines.len(), 3);
  }

  #[tokio::test]
  async fn launch_failure_is_stage_error() {
    let temp = TempDir::new().unwrap();
    let mut pipeline = pipeline(temp.path());

    let launcher = pipeline.create_launcher("/no/such/tool");
    pipeline.attach(Phase::Build, 0, Stage::new("missing tool", launcher));

    let err = pipeline.execute(Phase::Build).await.unwrap_err();

    assert_eq!(err.stage, "missing tool");
    assert!(matches!(err.source, LaunchError::Spawn { .. }));
  }

  #[tokio::test]
  async fn clean_runs_in_reverse_from_floor_and_skips_missing_actions() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("log");
    let mut pipeline = pipeline(temp.path());

    pipeline.attach(Phase::Dependencies, 0, cleanable(&log, "deps"));
    pipeline.attach(Phase::Build, 0, cleanable(&log, "build-a"));
    pipeline.attach(Phase::Build, 0, stage(&log, "no-clean"));
    pipeline.attach(Phase::Build, 1, cleanable(&log, "build-b"));
    pipeline.attach(Phase::Install, 0, cleanable(&log, "install"));

    pipeline.clean(Phase::Build).await.unwrap();

    assert_eq!(read_lines(&log), ["clean install", "clean build-b", "clean build-a"]);
  }

  #[tokio::test]
  async fn clean_marks_entries_pending_for_next_execute() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("log");
    let mut pipeline = pipeline(temp.path());

    let deps = pipeline.attach(Phase::Dependencies, 0, stage(&log, "deps"));
    let build = pipeline.attach(Phase::Build, 0, cleanable(&log, "build"));

    pipeline.execute(Phase::Build).await.unwrap();
    pipeline.clean(Phase::Build).await.unwrap();

    assert_eq!(pipeline.is_completed(deps), Some(true));
    assert_eq!(pipeline.is_completed(build), Some(false));

    pipeline.execute(Phase::Build).await.unwrap();

    assert_eq!(read_lines(&log), ["deps", "build", "clean build", "build"]);
  }

  #[tokio::test]
  async fn failing_clean_halts_and_keeps_unvisited_flags() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("log");
    let mut pipeline = pipeline(temp.path());

    let early = pipeline.attach(Phase::Build, 0, cleanable(&log, "early"));
    let broken = pipeline.attach(
      Phase::Build,
      1,
      stage(&log, "broken").with_clean(sh("exit 1")),
    );
    let late = pipeline.attach(Phase::Install, 0, cleanable(&log, "late"));

    pipeline.execute(Phase::Install).await.unwrap();
    let err = pipeline.clean(Phase::Build).await.unwrap_err();

    assert_eq!(err.stage, "broken");
    assert_eq!(err.op, StageOp::Clean);
    assert_eq!(pipeline.is_completed(late), Some(false));
    assert_eq!(pipeline.is_completed(broken), Some(true));
    assert_eq!(pipeline.is_completed(early), Some(true));
    assert_eq!(read_lines(&log), ["early", "broken", "late", "clean late"]);
  }

  #[tokio::test]
  async fn rebuild_cleans_then_executes() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("log");
    let mut pipeline = pipeline(temp.path());

    pipeline.attach(Phase::Dependencies, 0, stage(&log, "deps"));
    pipeline.attach(Phase::Build, 0, cleanable(&log, "build"));

    pipeline.execute(Phase::Build).await.unwrap();
    pipeline.rebuild(Phase::Build).await.unwrap();

    assert_eq!(read_lines(&log), ["deps", "build", "clean build", "build"]);
  }

  #[tokio::test]
  async fn query_updates_cached_flag() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("log");
    let mut pipeline = pipeline(temp.path());

    let stale = Arc::new(AtomicBool::new(false));
    let flag = stale.clone();
    let id = pipeline.attach(
      Phase::Build,
      0,
      stage(&log, "build").with_query(move |_| !flag.load(Ordering::SeqCst)),
    );

    assert!(pipeline.query(id));
    assert_eq!(pipeline.is_completed(id), Some(true));

    stale.store(true, Ordering::SeqCst);
    assert!(!pipeline.query(id));
    assert_eq!(pipeline.is_completed(id), Some(false));

    pipeline.execute(Phase::Build).await.unwrap();
    assert_eq!(read_lines(&log), ["build"]);
  }

  #[test]
  fn query_without_predicate_reports_cached_flag() {
    let temp = TempDir::new().unwrap();
    let mut pipeline = pipeline(temp.path());
    let id = pipeline.attach(Phase::Build, 0, Stage::new("build", sh("true")));

    assert!(!pipeline.query(id));
    pipeline.detach(id);
    assert!(!pipeline.query(id));
  }

  #[test]
  fn detach_removes_entry() {
    let temp = TempDir::new().unwrap();
    let mut pipeline = pipeline(temp.path());
    let a = pipeline.attach(Phase::Build, 0, Stage::new("a", sh("true")));
    let b = pipeline.attach(Phase::Build, 0, Stage::new("b", sh("true")));

    let removed = pipeline.detach(a).unwrap();

    assert_eq!(removed.name(), "a");
    assert_eq!(pipeline.len(), 1);
    assert!(pipeline.stage(a).is_none());
    assert_eq!(pipeline.stage(b).map(Stage::name), Some("b"));
    assert!(pipeline.detach(a).is_none());
  }

  #[test]
  fn entries_reports_execution_order() {
    let temp = TempDir::new().unwrap();
    let mut pipeline = pipeline(temp.path());
    pipeline.attach(Phase::Install, 0, Stage::new("install", sh("true")));
    pipeline.attach(Phase::Dependencies, 3, Stage::new("deps", sh("true")));

    let order: Vec<_> = pipeline
      .entries()
      .map(|entry| (entry.phase, entry.priority, entry.stage.name().to_string()))
      .collect();

    assert_eq!(
      order,
      [
        (Phase::Dependencies, 3, "deps".to_string()),
        (Phase::Install, 0, "install".to_string()),
      ]
    );
  }

  #[test]
  fn create_launcher_uses_srcdir_and_env() {
    let config = PipelineConfig::new("/src/pkg", "/build/pkg").with_env("CC", "clang");
    let pipeline = Pipeline::new(config);

    let launcher = pipeline.create_launcher("swift").arg("build");

    assert_eq!(launcher.argv(), ["swift", "build"]);
    assert_eq!(launcher.working_dir(), Some(Path::new("/src/pkg")));
    assert_eq!(launcher.environment()["CC"], "clang");
    assert!(pipeline.is_empty());
  }
}
