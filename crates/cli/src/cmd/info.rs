//! Implementation of the `buildline info` command.

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};

use buildline_lib::session::BuildSession;

use super::GlobalArgs;
use crate::output::{OutputFormat, print_json, print_stat, print_success, symbols};

pub fn cmd_info(global: &GlobalArgs, format: OutputFormat) -> Result<()> {
  let session = global.open_session()?;

  if format.is_json() {
    return print_json(&info_json(&session));
  }

  let build_system = session.build_system();
  let config = session.pipeline().config();

  print_success(&format!("{} project", build_system.display_name()));
  print_stat("Kind", build_system.id());
  print_stat("Project file", &build_system.project_file().display().to_string());
  print_stat("Build dir", &config.builddir.display().to_string());
  print_stat("Runtime", config.runtime.id());
  if let Some(prefix) = build_system.run_prefix() {
    print_stat("Run prefix", &prefix.join(" "));
  }

  println!();
  println!("Stages:");
  for entry in session.pipeline().entries() {
    println!(
      "  {} {} {}",
      symbols::INFO,
      format!("{:<13}", entry.phase.as_str()).if_supports_color(Stream::Stdout, |s| s.cyan()),
      entry.stage.name()
    );
    println!(
      "      {}",
      entry.stage.action().to_string().if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  }

  Ok(())
}

fn info_json(session: &BuildSession) -> serde_json::Value {
  let build_system = session.build_system();
  let config = session.pipeline().config();

  let stages: Vec<_> = session
    .pipeline()
    .entries()
    .map(|entry| {
      serde_json::json!({
        "name": entry.stage.name(),
        "phase": entry.phase,
        "priority": entry.priority,
        "command": entry.stage.action().argv(),
        "clean": entry.stage.clean_action().map(|clean| clean.argv()),
        "has_query": entry.stage.has_query(),
      })
    })
    .collect();

  serde_json::json!({
    "build_system": {
      "id": build_system.id(),
      "display_name": build_system.display_name(),
      "project_file": build_system.project_file(),
      "run_prefix": build_system.run_prefix(),
    },
    "build_dir": config.builddir,
    "runtime": config.runtime.id(),
    "stages": stages,
  })
}
