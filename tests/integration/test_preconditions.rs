//! A failed precondition stops the release before anything is touched

use crate::helpers::{RunResult, TestPackage, run_release, set_var, unset_var};
use anyhow::Result;
use wiremock::MockServer;

/// Snapshot of everything a release would change
struct Untouched {
  commits: usize,
  manifest: String,
}

impl Untouched {
  fn capture(pkg: &TestPackage) -> Result<Self> {
    Ok(Self {
      commits: pkg.commit_count()?,
      manifest: pkg.read_file("package.json")?,
    })
  }

  fn assert_same(&self, pkg: &TestPackage) -> Result<()> {
    assert_eq!(pkg.commit_count()?, self.commits, "no commit may be created");
    assert_eq!(pkg.read_file("package.json")?, self.manifest, "manifest must be unchanged");
    assert!(pkg.head_tags()?.is_empty(), "no tag may be created");
    assert!(!pkg.file_exists("CHANGELOG.md"), "changelog must not be written");
    assert_eq!(pkg.remote_ref("refs/tags/v1.0.0")?, None);
    Ok(())
  }
}

fn assert_precondition_failure(result: &RunResult, code: &str, message: &str) {
  assert_eq!(result.status, Some(3), "{}", result.dump());
  assert!(result.stderr.contains(code), "{}", result.dump());
  assert!(result.stderr.contains(message), "{}", result.dump());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_token_fails_with_enoapmtoken() -> Result<()> {
  let server = MockServer::start().await;
  let pkg = TestPackage::new()?;
  pkg.commit_empty("feat: new feature")?;
  let before = Untouched::capture(&pkg)?;

  let mut env = pkg.release_env(&server.uri())?;
  unset_var(&mut env, "ATOM_ACCESS_TOKEN");

  let result = run_release(&pkg.path, &["run"], &env)?;

  assert_precondition_failure(
    &result,
    "ENOAPMTOKEN",
    "The environment variable ATOM_ACCESS_TOKEN is required.",
  );
  before.assert_same(&pkg)?;
  assert!(server.received_requests().await.unwrap_or_default().is_empty());
  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_token_fails_with_enoapmtoken() -> Result<()> {
  let server = MockServer::start().await;
  let pkg = TestPackage::new()?;
  pkg.commit_empty("feat: new feature")?;
  let before = Untouched::capture(&pkg)?;

  let mut env = pkg.release_env(&server.uri())?;
  set_var(&mut env, "ATOM_ACCESS_TOKEN", "");

  let result = run_release(&pkg.path, &["run"], &env)?;

  assert_precondition_failure(
    &result,
    "ENOAPMTOKEN",
    "The environment variable ATOM_ACCESS_TOKEN is required.",
  );
  before.assert_same(&pkg)?;
  assert!(server.received_requests().await.unwrap_or_default().is_empty());
  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_apm_fails_with_enoapmcli() -> Result<()> {
  let server = MockServer::start().await;
  let pkg = TestPackage::new()?;
  pkg.commit_empty("feat: new feature")?;
  pkg.remove_apm()?;
  let before = Untouched::capture(&pkg)?;

  let env = pkg.release_env(&server.uri())?;
  let result = run_release(&pkg.path, &["run"], &env)?;

  assert_precondition_failure(&result, "ENOAPMCLI", "The apm CLI must be installed.");
  before.assert_same(&pkg)?;
  assert!(server.received_requests().await.unwrap_or_default().is_empty());
  Ok(())
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_non_executable_apm_fails_with_enoapmcli() -> Result<()> {
  let server = MockServer::start().await;
  let pkg = TestPackage::new()?;
  pkg.commit_empty("feat: new feature")?;
  pkg.make_apm_non_executable()?;
  let before = Untouched::capture(&pkg)?;

  let env = pkg.release_env(&server.uri())?;
  let result = run_release(&pkg.path, &["run"], &env)?;

  assert_precondition_failure(&result, "ENOAPMCLI", "The apm CLI must be installed.");
  before.assert_same(&pkg)?;
  assert!(pkg.apm_calls()?.is_empty(), "apm must never have run");
  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tool_check_runs_before_token_check() -> Result<()> {
  let server = MockServer::start().await;
  let pkg = TestPackage::new()?;
  pkg.remove_apm()?;

  let mut env = pkg.release_env(&server.uri())?;
  unset_var(&mut env, "ATOM_ACCESS_TOKEN");

  let result = run_release(&pkg.path, &["run"], &env)?;

  assert_precondition_failure(&result, "ENOAPMCLI", "The apm CLI must be installed.");
  assert!(!result.stderr.contains("ENOAPMTOKEN"), "{}", result.dump());
  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_preconditions_run_before_the_manifest_is_read() -> Result<()> {
  let server = MockServer::start().await;
  let pkg = TestPackage::new()?;
  pkg.remove_file("package.json")?;
  pkg.remove_apm()?;

  let env = pkg.release_env(&server.uri())?;
  for command in ["run", "verify"] {
    let result = run_release(&pkg.path, &[command], &env)?;
    assert_precondition_failure(&result, "ENOAPMCLI", "The apm CLI must be installed.");
    assert!(!result.stderr.contains("package.json"), "{}", result.dump());
  }
  assert!(server.received_requests().await.unwrap_or_default().is_empty());
  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_verify_command_reports_missing_token() -> Result<()> {
  let server = MockServer::start().await;
  let pkg = TestPackage::new()?;

  let mut env = pkg.release_env(&server.uri())?;
  unset_var(&mut env, "ATOM_ACCESS_TOKEN");

  let result = run_release(&pkg.path, &["verify"], &env)?;

  assert_precondition_failure(
    &result,
    "ENOAPMTOKEN",
    "The environment variable ATOM_ACCESS_TOKEN is required.",
  );
  assert!(server.received_requests().await.unwrap_or_default().is_empty());
  Ok(())
}
