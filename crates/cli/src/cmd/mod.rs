mod build;
mod info;
mod run;
mod targets;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use buildline_lib::session::{BuildSession, SessionOptions};

pub use build::{cmd_build, cmd_clean, cmd_rebuild};
pub use info::cmd_info;
pub use run::cmd_run;
pub use targets::cmd_targets;

/// Options shared by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  pub verbose: bool,

  /// Project directory or manifest
  #[arg(short = 'C', long, global = true, default_value = ".")]
  pub project: PathBuf,

  /// Build directory (default: per-user cache, or $BUILDLINE_BUILD_DIR)
  #[arg(long, global = true)]
  pub build_dir: Option<PathBuf>,

  /// Extra environment for every stage, as KEY=VALUE (repeatable)
  #[arg(short, long = "env", global = true, value_parser = parse_env_pair)]
  pub env: Vec<(String, String)>,
}

impl GlobalArgs {
  fn session_options(&self) -> SessionOptions {
    SessionOptions {
      project: self.project.clone(),
      builddir: self.build_dir.clone(),
      env: self.env.iter().cloned().collect::<BTreeMap<_, _>>(),
      runtime: None,
    }
  }

  /// Resolve the project and load its pipeline.
  pub fn open_session(&self) -> Result<BuildSession> {
    BuildSession::open(self.session_options())
      .with_context(|| format!("Failed to open project {}", self.project.display()))
  }
}

fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
  match raw.split_once('=') {
    Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
    _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
  }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Runtime::new().context("Failed to create async runtime")
}
