//! The subset of `swift package dump-package` output needed to list targets.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PackageDump {
  #[serde(default)]
  pub name: Option<String>,
  pub targets: Vec<TargetDecl>,
}

#[derive(Debug, Deserialize)]
pub struct TargetDecl {
  pub name: String,
  /// `regular`, `executable`, `test`, ...
  #[serde(default, rename = "type")]
  pub kind: Option<String>,
}

impl PackageDump {
  pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(json)
  }

  /// Target names in declaration order.
  pub fn target_names(&self) -> impl Iterator<Item = &str> {
    self.targets.iter().map(|target| target.name.as_str())
  }
}
