use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, info};

use super::dump::PackageDump;
use super::{LANGUAGE, SWIFT_KIND, SWIFT_PROGRAM};
use crate::build_system::BuildSystem;
use crate::execute::{Cancellation, Launcher};
use crate::targets::{BuildTarget, DiscoveryError, TargetProvider};

/// Lists the targets a Swift package declares.
#[derive(Debug, Clone)]
pub struct SwiftTargetProvider {
  command: Vec<String>,
  env: BTreeMap<String, String>,
}

impl SwiftTargetProvider {
  pub fn new() -> Self {
    Self::with_command([SWIFT_PROGRAM])
  }

  /// Use `command` in place of `swift`; `package dump-package` is appended.
  pub fn with_command<I, S>(command: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      command: command.into_iter().map(Into::into).collect(),
      env: BTreeMap::new(),
    }
  }

  /// Extra environment for the introspection command.
  pub fn with_env(mut self, env: &BTreeMap<String, String>) -> Self {
    self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
    self
  }
}

impl Default for SwiftTargetProvider {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl TargetProvider for SwiftTargetProvider {
  fn kind(&self) -> &str {
    SWIFT_KIND
  }

  async fn discover(
    &self,
    build_system: &BuildSystem,
    cancel: &Cancellation,
  ) -> Result<Vec<BuildTarget>, DiscoveryError> {
    if build_system.id() != SWIFT_KIND {
      return Err(DiscoveryError::UnsupportedKind {
        expected: SWIFT_KIND.to_string(),
        actual: build_system.id().to_string(),
      });
    }

    let prefix = build_system
      .run_prefix()
      .ok_or_else(|| DiscoveryError::RunPrefixUnset(build_system.id().to_string()))?;

    let project_dir = build_system.project_dir();
    let launcher = Launcher::from_argv(&self.command)
      .args(["package", "dump-package"])
      .cwd(&project_dir)
      .envs(&self.env);

    debug!(project = %project_dir.display(), "dumping swift package");
    let output = launcher.run_cancellable(cancel).await?;
    let dump = PackageDump::parse(&output.stdout)?;

    let targets: Vec<_> = dump
      .target_names()
      .map(|name| {
        let mut argv = prefix.to_vec();
        argv.push(name.to_string());
        BuildTarget::new(name, LANGUAGE, &project_dir, argv, None)
      })
      .collect();

    info!(package = ?dump.name, count = targets.len(), "listed swift targets");
    Ok(targets)
  }
}
