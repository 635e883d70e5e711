//! End-to-end releases against a local bare remote and a mocked GitHub API

use crate::helpers::{GH_TOKEN, OWNER, PACKAGE_NAME, TestPackage, git, run_release, search_query, set_var};
use anyhow::Result;
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn repo_path() -> String {
  format!("/repos/{}/{}", OWNER, PACKAGE_NAME)
}

const FAIL_TITLE: &str = "The automated release is failing 🚨";

/// Searches that find nothing; mount after any search mock meant to match first
async fn mount_empty_search(server: &MockServer) {
  Mock::given(method("GET"))
    .and(path("/search/issues"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "total_count": 0, "items": [] })))
    .mount(server)
    .await;
}

/// Access check allowed, release creation for `version` answered with `release-url/<version>`
async fn mount_github(server: &MockServer, version: &str) {
  mount_empty_search(server).await;

  Mock::given(method("GET"))
    .and(path(repo_path()))
    .and(header("authorization", format!("token {}", GH_TOKEN).as_str()))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "permissions": { "push": true } })))
    .expect(1)
    .mount(server)
    .await;

  Mock::given(method("POST"))
    .and(path(format!("{}/releases", repo_path())))
    .and(header("authorization", format!("token {}", GH_TOKEN).as_str()))
    .and(body_partial_json(json!({
      "tag_name": format!("v{}", version),
      "target_commitish": "master",
      "name": format!("v{}", version),
    })))
    .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "html_url": format!("release-url/{}", version) })))
    .expect(1)
    .mount(server)
    .await;
}

fn assert_released(pkg: &TestPackage, stdout: &str, stderr: &str, version: &str) -> Result<()> {
  let tag = format!("v{}", version);

  assert!(
    stderr.contains(&format!("Publishing {}@{}", PACKAGE_NAME, tag)),
    "stderr:\n{}",
    stderr
  );
  assert!(
    stdout.contains(&format!("Published GitHub release: release-url/{}", version)),
    "stdout:\n{}",
    stdout
  );

  assert_eq!(pkg.manifest_version()?, version);
  assert_eq!(pkg.head_files()?, vec!["CHANGELOG.md".to_string(), "package.json".to_string()]);
  assert_eq!(pkg.head_subject()?, format!("chore(release): {} [skip ci]", version));
  assert_eq!(pkg.head_tags()?, vec![tag.clone()]);

  let head = pkg.head()?;
  assert_eq!(pkg.remote_ref(&format!("refs/tags/{}", tag))?, Some(head.clone()));
  assert_eq!(pkg.remote_ref("refs/heads/master")?, Some(head));

  let publishes: Vec<String> = pkg
    .apm_calls()?
    .into_iter()
    .filter(|call| call.starts_with("publish"))
    .collect();
  assert_eq!(publishes.last(), Some(&format!("publish --tag {}", tag)));
  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_initial_and_subsequent_release() -> Result<()> {
  let server = MockServer::start().await;
  let pkg = TestPackage::new()?;
  let env = pkg.release_env(&server.uri())?;

  // First release
  pkg.commit_empty("feat: new feature")?;
  mount_github(&server, "1.0.0").await;

  let result = run_release(&pkg.path, &["run"], &env)?;
  assert!(result.success(), "{}", result.dump());
  assert_released(&pkg, &result.stdout, &result.stderr, "1.0.0")?;

  let changelog = pkg.read_file("CHANGELOG.md")?;
  assert!(changelog.starts_with("# Changelog\n"));
  assert!(changelog.contains("## [1.0.0] - "));
  assert!(changelog.contains("### Features\n\n- new feature\n"));

  server.verify().await;
  server.reset().await;

  // Second release builds on the first tag and announces the pull request it ships
  let feature = pkg.commit_empty("feat: other feature")?;
  Mock::given(method("GET"))
    .and(path("/search/issues"))
    .and(search_query("type:pr"))
    .and(search_query(&feature))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "items": [{ "number": 1, "title": "Other feature", "pull_request": {} }]
    })))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path(format!("{}/pulls/1/commits", repo_path())))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "sha": feature }])))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path(format!("{}/issues/1/comments", repo_path())))
    .and(body_string_contains("This PR is included in version 1.1.0"))
    .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
    .expect(1)
    .mount(&server)
    .await;
  mount_github(&server, "1.1.0").await;

  let result = run_release(&pkg.path, &["run"], &env)?;
  assert!(result.success(), "{}", result.dump());
  assert_released(&pkg, &result.stdout, &result.stderr, "1.1.0")?;
  assert!(result.stdout.contains("Last release: v1.0.0"), "{}", result.dump());
  assert!(result.stdout.contains("Commented on pull request #1"), "{}", result.dump());

  let changelog = pkg.read_file("CHANGELOG.md")?;
  let newer = changelog.find("## [1.1.0]").unwrap_or(usize::MAX);
  let older = changelog.find("## [1.0.0]").unwrap_or(0);
  assert!(newer < older, "newest entry must come first:\n{}", changelog);
  assert!(changelog.contains("- other feature\n"));

  let publishes = pkg
    .apm_calls()?
    .into_iter()
    .filter(|call| call.starts_with("publish"))
    .count();
  assert_eq!(publishes, 2);

  server.verify().await;
  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_breaking_change_bumps_major() -> Result<()> {
  let server = MockServer::start().await;
  let pkg = TestPackage::new()?;
  let env = pkg.release_env(&server.uri())?;

  pkg.commit_empty("feat: new feature")?;
  mount_github(&server, "1.0.0").await;
  let result = run_release(&pkg.path, &["run"], &env)?;
  assert!(result.success(), "{}", result.dump());
  server.reset().await;

  pkg.commit_empty("fix: small fix")?;
  pkg.commit_empty("feat!: drop the old API")?;
  mount_github(&server, "2.0.0").await;

  let result = run_release(&pkg.path, &["run"], &env)?;
  assert!(result.success(), "{}", result.dump());
  assert_released(&pkg, &result.stdout, &result.stderr, "2.0.0")?;

  server.verify().await;
  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_relevant_commits_publishes_nothing() -> Result<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(repo_path()))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "permissions": { "push": true } })))
    .mount(&server)
    .await;

  let pkg = TestPackage::new()?;
  pkg.commit_empty("docs: explain the settings")?;
  let head = pkg.head()?;

  let result = run_release(&pkg.path, &["run"], &pkg.release_env(&server.uri())?)?;

  assert!(result.success(), "{}", result.dump());
  assert!(result.stdout.contains("no new version is released"), "{}", result.dump());
  assert_eq!(pkg.head()?, head);
  assert!(pkg.head_tags()?.is_empty());
  assert!(!pkg.file_exists("CHANGELOG.md"));
  assert_eq!(pkg.manifest_version()?, "0.0.0-dev");

  let requests = server.received_requests().await.unwrap_or_default();
  assert!(requests.iter().all(|r| r.method.as_str() == "GET"));
  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dry_run_has_no_side_effects() -> Result<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(repo_path()))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "permissions": { "push": true } })))
    .expect(1)
    .mount(&server)
    .await;

  let pkg = TestPackage::new()?;
  pkg.commit_empty("feat: new feature")?;
  let head = pkg.head()?;

  let result = run_release(&pkg.path, &["run", "--dry-run"], &pkg.release_env(&server.uri())?)?;

  assert!(result.success(), "{}", result.dump());
  assert!(result.stdout.contains("Next release: 1.0.0"), "{}", result.dump());
  assert!(result.stdout.contains("- new feature"), "{}", result.dump());
  assert!(result.stdout.contains("Dry-run"), "{}", result.dump());

  assert_eq!(pkg.head()?, head);
  assert!(pkg.head_tags()?.is_empty());
  assert!(!pkg.file_exists("CHANGELOG.md"));
  assert_eq!(pkg.remote_ref("refs/tags/v1.0.0")?, None);
  assert!(pkg.apm_calls()?.iter().all(|call| !call.starts_with("publish")));

  server.verify().await;
  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_other_branch_is_skipped() -> Result<()> {
  let server = MockServer::start().await;
  let pkg = TestPackage::new()?;
  git(&pkg.path, &["checkout", "-b", "feature"])?;
  pkg.commit_empty("feat: new feature")?;

  let result = run_release(&pkg.path, &["run"], &pkg.release_env(&server.uri())?)?;

  assert!(result.success(), "{}", result.dump());
  assert!(result.stdout.contains("triggered on branch 'feature'"), "{}", result.dump());
  assert!(pkg.head_tags()?.is_empty());
  assert!(pkg.apm_calls()?.is_empty(), "preconditions must not run off the release branch");
  assert!(server.received_requests().await.unwrap_or_default().is_empty());
  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_github_without_push_permission_fails_verify() -> Result<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(repo_path()))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "permissions": { "push": false } })))
    .mount(&server)
    .await;

  // The failure lands on the already open issue named by release.failTitle
  let pkg = TestPackage::new()?;
  let mut manifest: serde_json::Value = serde_json::from_str(&pkg.read_file("package.json")?)?;
  manifest["release"] = json!({ "failTitle": "Release is broken" });
  pkg.write_file("package.json", &format!("{}\n", serde_json::to_string_pretty(&manifest)?))?;
  pkg.commit_all("chore: name the failure issue")?;
  pkg.commit_empty("feat: new feature")?;
  let head = pkg.head()?;

  Mock::given(method("GET"))
    .and(path("/search/issues"))
    .and(search_query("type:issue"))
    .and(search_query("Release is broken"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "items": [{ "number": 7, "title": "Release is broken" }]
    })))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path(format!("{}/issues/7/comments", repo_path())))
    .and(body_string_contains("doesn't allow to push"))
    .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path(format!("{}/issues", repo_path())))
    .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "number": 8 })))
    .expect(0)
    .mount(&server)
    .await;

  let result = run_release(&pkg.path, &["run"], &pkg.release_env(&server.uri())?)?;

  assert_eq!(result.status, Some(2), "{}", result.dump());
  assert!(result.stderr.contains("doesn't allow to push"), "{}", result.dump());
  assert!(result.stdout.contains("Reported the failure on issue #7"), "{}", result.dump());
  assert_eq!(pkg.head()?, head);
  assert!(pkg.head_tags()?.is_empty());

  server.verify().await;
  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_apm_publish_keeps_pushed_release_and_opens_issue() -> Result<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(repo_path()))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "permissions": { "push": true } })))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path(format!("{}/releases", repo_path())))
    .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "html_url": "release-url" })))
    .expect(0)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path(format!("{}/issues", repo_path())))
    .and(body_partial_json(json!({ "title": FAIL_TITLE, "labels": ["apm-release"] })))
    .and(body_string_contains("apm publish --tag v1.0.0"))
    .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "number": 3 })))
    .expect(1)
    .mount(&server)
    .await;
  mount_empty_search(&server).await;

  let pkg = TestPackage::new()?;
  pkg.write_fake_apm_with(0, 1)?;
  pkg.commit_empty("feat: new feature")?;

  let result = run_release(&pkg.path, &["run"], &pkg.release_env(&server.uri())?)?;

  assert_eq!(result.status, Some(2), "{}", result.dump());
  assert!(result.stderr.contains("apm publish --tag v1.0.0"), "{}", result.dump());
  assert!(result.stdout.contains(&format!("Opened issue \"{}\"", FAIL_TITLE)), "{}", result.dump());

  // Nothing already done is rolled back
  let head = pkg.head()?;
  assert_eq!(pkg.manifest_version()?, "1.0.0");
  assert_eq!(pkg.head_subject()?, "chore(release): 1.0.0 [skip ci]");
  assert_eq!(pkg.head_tags()?, vec!["v1.0.0".to_string()]);
  assert_eq!(pkg.remote_ref("refs/tags/v1.0.0")?, Some(head.clone()));
  assert_eq!(pkg.remote_ref("refs/heads/master")?, Some(head));
  assert!(pkg.apm_calls()?.contains(&"publish --tag v1.0.0".to_string()));

  server.verify().await;
  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_release_closes_open_failure_issue() -> Result<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/search/issues"))
    .and(search_query("type:issue"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "items": [
        { "number": 5, "title": FAIL_TITLE },
        { "number": 6, "title": "Unrelated issue mentioning the release" }
      ]
    })))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path(format!("{}/issues/5/comments", repo_path())))
    .and(body_string_contains("resolved in version 1.0.0"))
    .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("PATCH"))
    .and(path(format!("{}/issues/5", repo_path())))
    .and(body_partial_json(json!({ "state": "closed" })))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "number": 5 })))
    .expect(1)
    .mount(&server)
    .await;
  mount_github(&server, "1.0.0").await;

  let pkg = TestPackage::new()?;
  pkg.commit_empty("fix: repair the release")?;

  let result = run_release(&pkg.path, &["run"], &pkg.release_env(&server.uri())?)?;

  assert!(result.success(), "{}", result.dump());
  assert_released(&pkg, &result.stdout, &result.stderr, "1.0.0")?;
  assert!(result.stdout.contains("Closed failure issue #5"), "{}", result.dump());
  assert!(!result.stdout.contains("#6"), "{}", result.dump());

  server.verify().await;
  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_detached_head_uses_ci_branch() -> Result<()> {
  let server = MockServer::start().await;
  mount_github(&server, "1.0.0").await;

  let pkg = TestPackage::new()?;
  let feature = pkg.commit_empty("feat: new feature")?;
  git(&pkg.path, &["checkout", "--detach", &feature])?;

  let mut env = pkg.release_env(&server.uri())?;
  set_var(&mut env, "TRAVIS", "true");
  set_var(&mut env, "TRAVIS_BRANCH", "master");
  set_var(&mut env, "TRAVIS_PULL_REQUEST", "false");

  let result = run_release(&pkg.path, &["run"], &env)?;

  assert!(result.success(), "{}", result.dump());
  assert_released(&pkg, &result.stdout, &result.stderr, "1.0.0")?;

  server.verify().await;
  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pull_request_build_is_skipped() -> Result<()> {
  let server = MockServer::start().await;
  let pkg = TestPackage::new()?;
  pkg.commit_empty("feat: new feature")?;

  let mut env = pkg.release_env(&server.uri())?;
  set_var(&mut env, "TRAVIS", "true");
  set_var(&mut env, "TRAVIS_BRANCH", "master");
  set_var(&mut env, "TRAVIS_PULL_REQUEST", "12");

  let result = run_release(&pkg.path, &["run"], &env)?;

  assert!(result.success(), "{}", result.dump());
  assert!(result.stdout.contains("triggered by a pull request"), "{}", result.dump());
  assert!(pkg.head_tags()?.is_empty());
  assert!(pkg.apm_calls()?.is_empty(), "preconditions must not run for pull requests");
  assert!(server.received_requests().await.unwrap_or_default().is_empty());
  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_commit_identity_from_environment() -> Result<()> {
  let server = MockServer::start().await;
  let pkg = TestPackage::new()?;
  let mut env = pkg.release_env(&server.uri())?;
  set_var(&mut env, "GIT_AUTHOR_NAME", "Release Robot");
  set_var(&mut env, "GIT_AUTHOR_EMAIL", "robot@example.com");

  pkg.commit_empty("fix: tiny fix")?;
  mount_github(&server, "1.0.0").await;

  let result = run_release(&pkg.path, &["run"], &env)?;
  assert!(result.success(), "{}", result.dump());

  let output = git(&pkg.path, &["log", "-1", "--format=%an <%ae>"])?;
  assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Release Robot <robot@example.com>");

  server.verify().await;
  Ok(())
}

const NPM_PIPELINE: &str = r#"
[pipeline]
checks = []

[[pipeline.verify]]
step = "manifest"
publish = true

[[pipeline.publish]]
step = "manifest"
publish = true
"#;

#[test]
fn test_manifest_step_publishes_to_npm() -> Result<()> {
  let pkg = TestPackage::new()?;
  pkg.write_file("release.toml", NPM_PIPELINE)?;
  pkg.write_fake_npm(0)?;
  pkg.commit_all("feat: publish to npm too")?;

  let mut env = pkg.release_env("http://127.0.0.1:1")?;
  set_var(&mut env, "NPM_TOKEN", "npm-token");

  let result = run_release(&pkg.path, &["run"], &env)?;

  assert!(result.success(), "{}", result.dump());
  assert_eq!(pkg.manifest_version()?, "1.0.0");
  assert_eq!(pkg.npm_calls()?, vec!["publish".to_string()]);
  Ok(())
}

#[test]
fn test_manifest_step_requires_npm_token() -> Result<()> {
  let pkg = TestPackage::new()?;
  pkg.write_file("release.toml", NPM_PIPELINE)?;
  pkg.write_fake_npm(0)?;
  pkg.commit_all("feat: publish to npm too")?;

  let result = run_release(&pkg.path, &["run"], &pkg.release_env("http://127.0.0.1:1")?)?;

  assert_eq!(result.status, Some(2), "{}", result.dump());
  assert!(result.stderr.contains("NPM_TOKEN is required"), "{}", result.dump());
  assert_eq!(pkg.manifest_version()?, "0.0.0-dev");
  assert!(pkg.npm_calls()?.is_empty());
  Ok(())
}

#[test]
fn test_failed_npm_publish_keeps_the_new_version() -> Result<()> {
  let pkg = TestPackage::new()?;
  pkg.write_file("release.toml", NPM_PIPELINE)?;
  pkg.write_fake_npm(1)?;
  pkg.commit_all("fix: publish to npm too")?;

  let mut env = pkg.release_env("http://127.0.0.1:1")?;
  set_var(&mut env, "NPM_TOKEN", "npm-token");

  let result = run_release(&pkg.path, &["run"], &env)?;

  assert_eq!(result.status, Some(2), "{}", result.dump());
  assert!(result.stderr.contains("npm publish exited with"), "{}", result.dump());
  assert_eq!(pkg.manifest_version()?, "1.0.0");
  Ok(())
}

#[test]
fn test_tag_without_release_commit_warns() -> Result<()> {
  let pkg = TestPackage::new()?;
  pkg.write_file(
    "release.toml",
    r#"
[pipeline]
checks = []
verify = []

[[pipeline.publish]]
step = "git"
message = "chore(release): {version}"
assets = []
"#,
  )?;
  let feature = pkg.commit_all("feat: tag only")?;

  let result = run_release(&pkg.path, &["run"], &pkg.release_env("http://127.0.0.1:1")?)?;

  assert!(result.success(), "{}", result.dump());
  assert!(result.stderr.contains("WARN"), "{}", result.dump());
  assert!(result.stderr.contains("tagging HEAD without a commit"), "{}", result.dump());
  assert_eq!(pkg.head()?, feature);
  assert_eq!(pkg.remote_ref("refs/tags/v1.0.0")?, Some(feature));
  Ok(())
}
