//! Implementation of the `buildline run` command.

use anyhow::{Context, Result, bail};
use owo_colors::{OwoColorize, Stream};
use tokio::process::Command;
use tracing::info;

use buildline_lib::pipeline::Phase;

use super::build::stream_tool_output;
use super::targets::discover;
use super::{GlobalArgs, runtime};
use crate::output::symbols;

/// Build the project (unless `build` is false), then run `target` with `args`.
///
/// The target inherits stdio. A non-zero exit is passed through as this
/// process's exit code.
pub fn cmd_run(global: &GlobalArgs, target: &str, build: bool, args: &[String]) -> Result<()> {
  let mut session = global.open_session()?;
  if build {
    stream_tool_output(&mut session);
  }
  let rt = runtime()?;

  let status = rt.block_on(async {
    if build {
      session
        .build(Phase::Build)
        .await
        .context("Build failed")?;
    }

    let targets = discover(&session, None).await?;
    let Some(found) = targets.into_iter().find(|t| t.name() == target) else {
      bail!("Target '{}' not found", target);
    };

    let Some((program, prefix)) = found.argv().split_first() else {
      bail!("Target '{}' has no command", target);
    };

    eprintln!(
      "{} {} {}",
      symbols::ARROW.if_supports_color(Stream::Stderr, |s| s.cyan()),
      found.argv().join(" "),
      args.join(" ")
    );
    info!(target = %found.name(), cwd = %found.working_directory().display(), "running target");

    let status = Command::new(program)
      .args(prefix)
      .args(args)
      .current_dir(found.working_directory())
      .envs(&session.pipeline().config().env)
      .status()
      .await
      .with_context(|| format!("Failed to launch {}", program))?;
    Ok::<_, anyhow::Error>(status)
  })?;

  if !status.success() {
    std::process::exit(status.code().unwrap_or(1));
  }
  Ok(())
}
