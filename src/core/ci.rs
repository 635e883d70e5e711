//! CI service detection
//!
//! CI jobs often check out a detached HEAD, so the branch being built is
//! taken from the service's own variables when one is detected. Outside a
//! known service the branch comes from git.

use crate::core::env::ReleaseEnv;

/// What the CI service says about the current build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiContext {
  /// Detected service, e.g. `travis` or `github-actions`
  pub service: Option<&'static str>,
  /// Branch being built (the target branch for pull requests)
  pub branch: Option<String>,
  /// Whether this build is for a pull or merge request
  pub pull_request: bool,
}

impl CiContext {
  /// Detect the CI service from the injected environment
  pub fn detect(env: &ReleaseEnv) -> Self {
    let get = |key: &str| env.non_empty(key).map(str::to_string);

    if env.non_empty("TRAVIS").is_some() || env.non_empty("TRAVIS_BRANCH").is_some() {
      return Self {
        service: Some("travis"),
        branch: get("TRAVIS_BRANCH"),
        pull_request: env.non_empty("TRAVIS_PULL_REQUEST").is_some_and(|pr| pr != "false"),
      };
    }

    if env.non_empty("GITHUB_ACTIONS").is_some() {
      let pull_request = env
        .non_empty("GITHUB_EVENT_NAME")
        .is_some_and(|event| event.starts_with("pull_request"));
      let branch = if pull_request {
        get("GITHUB_BASE_REF")
      } else {
        env
          .non_empty("GITHUB_REF")
          .and_then(|r| r.strip_prefix("refs/heads/"))
          .map(str::to_string)
      };
      return Self {
        service: Some("github-actions"),
        branch,
        pull_request,
      };
    }

    if env.non_empty("GITLAB_CI").is_some() {
      let pull_request = env.non_empty("CI_MERGE_REQUEST_ID").is_some();
      let branch = if pull_request {
        get("CI_MERGE_REQUEST_TARGET_BRANCH_NAME")
      } else {
        get("CI_COMMIT_BRANCH").or_else(|| get("CI_COMMIT_REF_NAME"))
      };
      return Self {
        service: Some("gitlab"),
        branch,
        pull_request,
      };
    }

    if env.non_empty("CIRCLECI").is_some() {
      return Self {
        service: Some("circleci"),
        branch: get("CIRCLE_BRANCH"),
        pull_request: env.non_empty("CIRCLE_PULL_REQUEST").is_some(),
      };
    }

    if env.non_empty("JENKINS_URL").is_some() {
      let pull_request = env.non_empty("CHANGE_ID").is_some();
      let branch = if pull_request {
        get("CHANGE_TARGET")
      } else {
        get("BRANCH_NAME").or_else(|| {
          env
            .non_empty("GIT_BRANCH")
            .map(|b| b.strip_prefix("origin/").unwrap_or(b).to_string())
        })
      };
      return Self {
        service: Some("jenkins"),
        branch,
        pull_request,
      };
    }

    Self::default()
  }
}
