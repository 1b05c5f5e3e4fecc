//! Pipeline phases.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coarse, totally ordered category of pipeline work.
///
/// Declaration order is execution order: the derived `Ord` is what the
/// pipeline sorts entries by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
  Prepare,
  Downloads,
  Configure,
  Autogen,
  /// Second configure pass, for work that needs the autogen output.
  Configure2,
  Dependencies,
  Build,
  Install,
  Commit,
  Export,
  Final,
}

impl Phase {
  pub const ALL: [Phase; 11] = [
    Phase::Prepare,
    Phase::Downloads,
    Phase::Configure,
    Phase::Autogen,
    Phase::Configure2,
    Phase::Dependencies,
    Phase::Build,
    Phase::Install,
    Phase::Commit,
    Phase::Export,
    Phase::Final,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Phase::Prepare => "prepare",
      Phase::Downloads => "downloads",
      Phase::Configure => "configure",
      Phase::Autogen => "autogen",
      Phase::Configure2 => "configure2",
      Phase::Dependencies => "dependencies",
      Phase::Build => "build",
      Phase::Install => "install",
      Phase::Commit => "commit",
      Phase::Export => "export",
      Phase::Final => "final",
    }
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Error returned when parsing an unknown phase name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown phase: {0}")]
pub struct UnknownPhase(pub String);

impl FromStr for Phase {
  type Err = UnknownPhase;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Phase::ALL
      .into_iter()
      .find(|phase| phase.as_str().eq_ignore_ascii_case(s))
      .ok_or_else(|| UnknownPhase(s.to_string()))
  }
}
