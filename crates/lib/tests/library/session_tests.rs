use buildline_lib::execute::Cancellation;
use buildline_lib::pipeline::Phase;
use buildline_lib::session::{BuildSession, SessionError};
use serial_test::serial;

use super::common::SwiftFixture;

#[tokio::test]
#[serial]
async fn build_then_clean_runs_swift_commands_in_order() {
  let fixture = SwiftFixture::new();
  let out = fixture.build_dir().display().to_string();
  let mut session = BuildSession::open(fixture.options()).unwrap();

  session.build(Phase::Build).await.unwrap();
  session.clean(Phase::Build).await.unwrap();

  assert_eq!(
    fixture.invocations(),
    [
      format!("package --build-path {} resolve", out),
      format!("build --build-path {}", out),
      format!("package --build-path {} clean", out),
    ]
  );
}

#[tokio::test]
#[serial]
async fn build_twice_reruns_always_pending_stages() {
  let fixture = SwiftFixture::new();
  let mut session = BuildSession::open(fixture.options()).unwrap();

  session.build(Phase::Build).await.unwrap();
  session.build(Phase::Build).await.unwrap();

  assert_eq!(fixture.invocations().len(), 4);
}

#[tokio::test]
#[serial]
async fn targets_run_through_swift_run() {
  let fixture = SwiftFixture::new();
  let out = fixture.build_dir().display().to_string();
  let session = BuildSession::open(fixture.options()).unwrap();

  let targets = session.discover(&Cancellation::new()).await.unwrap();

  let names: Vec<_> = targets.iter().map(|t| t.name()).collect();
  assert_eq!(names, ["lib", "exe"]);
  assert_eq!(targets[1].argv(), ["swift", "run", "--build-path", out.as_str(), "exe"]);
  assert_eq!(fixture.invocations(), ["package dump-package"]);
}

#[tokio::test]
#[serial]
async fn unknown_target_is_reported() {
  let fixture = SwiftFixture::new();
  let session = BuildSession::open(fixture.options()).unwrap();

  let result = session.find_target("missing", &Cancellation::new()).await;

  assert!(matches!(result, Err(SessionError::TargetNotFound(ref name)) if name == "missing"));
}
