//! Implementation of the `buildline build`, `clean` and `rebuild` commands.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};

use buildline_lib::execute::OutputStream;
use buildline_lib::pipeline::Phase;
use buildline_lib::session::{BuildSession, SessionError};

use super::{GlobalArgs, runtime};
use crate::output::{format_duration, print_stat, print_success};

#[derive(Debug, Clone, Copy)]
enum Operation {
  Build,
  Clean,
  Rebuild,
}

impl Operation {
  fn done(self) -> &'static str {
    match self {
      Operation::Build => "Build complete",
      Operation::Clean => "Clean complete",
      Operation::Rebuild => "Rebuild complete",
    }
  }
}

pub fn cmd_build(global: &GlobalArgs, phase: Phase) -> Result<()> {
  drive(global, Operation::Build, phase)
}

pub fn cmd_clean(global: &GlobalArgs, phase: Phase) -> Result<()> {
  drive(global, Operation::Clean, phase)
}

pub fn cmd_rebuild(global: &GlobalArgs, phase: Phase) -> Result<()> {
  drive(global, Operation::Rebuild, phase)
}

fn drive(global: &GlobalArgs, operation: Operation, phase: Phase) -> Result<()> {
  let start = Instant::now();
  let mut session = global.open_session()?;
  stream_tool_output(&mut session);

  let rt = runtime()?;
  rt.block_on(run_operation(&mut session, operation, phase))?;

  print_success(operation.done());
  print_stat("Project", &session.build_system().project_dir().display().to_string());
  print_stat("Phase", phase.as_str());
  print_stat(
    "Build dir",
    &session.pipeline().config().builddir.display().to_string(),
  );
  print_stat("Duration", &format_duration(start.elapsed()));
  Ok(())
}

async fn run_operation(session: &mut BuildSession, operation: Operation, phase: Phase) -> Result<(), SessionError> {
  match operation {
    Operation::Build => session.build(phase).await,
    Operation::Clean => session.clean(phase).await,
    Operation::Rebuild => session.rebuild(phase).await,
  }
}

/// Echo every line the stage tools print while they run.
///
/// Tool output goes to stderr so stdout keeps only buildline's own report.
pub(super) fn stream_tool_output(session: &mut BuildSession) {
  session
    .pipeline_mut()
    .set_output_sink(Arc::new(|_: OutputStream, line: &str| {
      eprintln!("  {}", line.if_supports_color(Stream::Stderr, |s| s.dimmed()));
    }));
}
