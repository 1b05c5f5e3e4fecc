mod cmd;
mod output;

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use buildline_lib::pipeline::Phase;

use crate::cmd::GlobalArgs;
use crate::output::{OutputFormat, print_error};

/// buildline - run a project's build tool as a phase-ordered pipeline
#[derive(Parser)]
#[command(name = "buildline")]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(flatten)]
  global: GlobalArgs,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run pending stages up to a phase
  Build {
    /// Last phase to run (inclusive)
    #[arg(short, long, default_value = "build")]
    phase: Phase,
  },

  /// Run clean actions from the last stage back to a phase
  Clean {
    /// Lowest phase to clean (inclusive)
    #[arg(short, long, default_value = "build")]
    phase: Phase,
  },

  /// Clean from a phase, then build up to it
  Rebuild {
    #[arg(short, long, default_value = "build")]
    phase: Phase,
  },

  /// List the targets the project declares
  Targets {
    /// Output format
    #[arg(short = 'o', long = "format", value_enum, default_value = "text")]
    format: OutputFormat,

    /// Give up on discovery after this long (e.g., "30s", "2m")
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,
  },

  /// Build, then run a target
  Run {
    /// Target name
    target: String,

    /// Skip building before running
    #[arg(long)]
    no_build: bool,

    /// Arguments passed to the target
    #[arg(last = true)]
    args: Vec<String>,
  },

  /// Show the resolved build system and attached stages
  Info {
    /// Output format
    #[arg(short = 'o', long = "format", value_enum, default_value = "text")]
    format: OutputFormat,
  },
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.global.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result: Result<()> = match cli.command {
    Commands::Build { phase } => cmd::cmd_build(&cli.global, phase),
    Commands::Clean { phase } => cmd::cmd_clean(&cli.global, phase),
    Commands::Rebuild { phase } => cmd::cmd_rebuild(&cli.global, phase),
    Commands::Targets { format, timeout } => cmd::cmd_targets(&cli.global, format, timeout),
    Commands::Run {
      target,
      no_build,
      args,
    } => cmd::cmd_run(&cli.global, &target, !no_build, &args),
    Commands::Info { format } => cmd::cmd_info(&cli.global, format),
  };

  if let Err(e) = result {
    print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}
