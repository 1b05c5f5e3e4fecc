//! Implementation of the `buildline targets` command.
//!
//! Discovery runs on a background task; Ctrl-C or `--timeout` cancels it and
//! kills the build tool's introspection process.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use owo_colors::{OwoColorize, Stream};
use tracing::debug;

use buildline_lib::execute::Cancellation;
use buildline_lib::session::BuildSession;
use buildline_lib::targets::BuildTarget;

use super::{GlobalArgs, runtime};
use crate::output::{OutputFormat, print_info, print_json, symbols};

pub fn cmd_targets(global: &GlobalArgs, format: OutputFormat, timeout: Option<Duration>) -> Result<()> {
  let session = global.open_session()?;
  let rt = runtime()?;
  let targets = rt.block_on(discover(&session, timeout))?;

  if format.is_json() {
    return print_json(&targets);
  }

  if targets.is_empty() {
    print_info("No targets declared.");
    return Ok(());
  }

  for target in &targets {
    println!(
      "{} {} {}",
      symbols::INFO,
      target.name().if_supports_color(Stream::Stdout, |s| s.cyan()),
      format!("({})", target.language()).if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  }
  Ok(())
}

enum Interrupt {
  CtrlC,
  Timeout(Duration),
}

/// Discover targets, cancelling on Ctrl-C or when `timeout` elapses.
pub(super) async fn discover(session: &BuildSession, timeout: Option<Duration>) -> Result<Vec<BuildTarget>> {
  let cancel = Cancellation::new();
  let watcher = cancel.clone();

  let interrupt = tokio::spawn(async move {
    let deadline = async {
      match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending::<()>().await,
      }
    };
    let reason = tokio::select! {
      Ok(()) = tokio::signal::ctrl_c() => Interrupt::CtrlC,
      _ = deadline => Interrupt::Timeout(timeout.unwrap_or_default()),
    };
    watcher.cancel();
    reason
  });

  let result = session.discover(&cancel).await;

  if result.is_ok() || !cancel.is_cancelled() {
    interrupt.abort();
    return result.context("Failed to discover targets");
  }

  match interrupt.await {
    Ok(Interrupt::Timeout(after)) => bail!("Target discovery timed out after {}", humantime::format_duration(after)),
    Ok(Interrupt::CtrlC) => {
      debug!("discovery interrupted");
      bail!("Target discovery cancelled")
    }
    Err(e) => Err(e).context("Target discovery watcher failed"),
  }
}
