use std::path::{Path, PathBuf};
use std::sync::Arc;

use buildline_lib::platform::HostRuntime;
use buildline_lib::session::SessionOptions;
use tempfile::TempDir;

/// Records each invocation to `$SWIFT_LOG` and answers `package dump-package`.
const FAKE_SWIFT: &str = r#"#!/bin/sh
echo "$*" >> "$SWIFT_LOG"
if [ "$1 $2" = "package dump-package" ]; then
  echo '{"targets":[{"name":"lib"},{"name":"exe"}]}'
fi
"#;

/// A Swift package and a private PATH holding a fake `swift`.
pub struct SwiftFixture {
  pub temp: TempDir,
}

impl SwiftFixture {
  pub fn new() -> Self {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let project = temp.path().join("Hello");
    std::fs::create_dir(&project).unwrap();
    std::fs::write(project.join("Package.swift"), "// swift-tools-version:5.9\n").unwrap();

    let bin = temp.path().join("bin");
    std::fs::create_dir(&bin).unwrap();
    let swift = bin.join("swift");
    std::fs::write(&swift, FAKE_SWIFT).unwrap();
    std::fs::set_permissions(&swift, std::fs::Permissions::from_mode(0o755)).unwrap();

    Self { temp }
  }

  pub fn project(&self) -> PathBuf {
    self.temp.path().join("Hello")
  }

  pub fn build_dir(&self) -> PathBuf {
    self.temp.path().join("out")
  }

  pub fn log(&self) -> PathBuf {
    self.temp.path().join("swift.log")
  }

  fn search_path(&self) -> String {
    format!("{}:/usr/bin:/bin", self.temp.path().join("bin").display())
  }

  /// Session options whose runtime and stage environment see the fake `swift`.
  pub fn options(&self) -> SessionOptions {
    let path = self.search_path();
    SessionOptions {
      project: self.project(),
      builddir: Some(self.build_dir()),
      env: [
        ("PATH".to_string(), path.clone()),
        ("SWIFT_LOG".to_string(), self.log().display().to_string()),
      ]
      .into_iter()
      .collect(),
      runtime: Some(Arc::new(HostRuntime::with_path(path))),
    }
  }

  pub fn invocations(&self) -> Vec<String> {
    read_lines(&self.log())
  }
}

pub fn read_lines(path: &Path) -> Vec<String> {
  std::fs::read_to_string(path)
    .map(|content| content.lines().map(str::to_string).collect())
    .unwrap_or_default()
}
