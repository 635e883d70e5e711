//! `github` step: repository access check and release creation
//!
//! After a release, pull requests that contributed a commit get a comment
//! and open failure issues are closed. A failed release opens (or comments
//! on) the failure issue instead.
//!
//! Blocking `ureq` client, one request at a time, 30s per request.
//! HTTP error statuses are read as responses so the API's own message can
//! be reported.

use super::StepContext;
use crate::core::env::ReleaseEnv;
use crate::core::error::{ReleaseError, ReleaseResult};
use crate::utils::repo_slug;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use serde_json::{Value, json};
use std::time::Duration;

const STEP: &str = "github";
const DEFAULT_API: &str = "https://api.github.com";
const TOKEN_VARS: &[&str] = &["GH_TOKEN", "GITHUB_TOKEN"];
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Longest `q` the search API accepts
const MAX_SEARCH_QUERY: usize = 256;
const FAIL_LABEL: &str = "apm-release";

/// API base URL: GITHUB_API_URL, else GITHUB_URL + GITHUB_PREFIX, else api.github.com
pub fn api_base(env: &ReleaseEnv) -> String {
  let base = match (env.non_empty("GITHUB_API_URL"), env.non_empty("GITHUB_URL")) {
    (Some(api), _) => api.to_string(),
    (None, Some(url)) => {
      let prefix = env.non_empty("GITHUB_PREFIX").unwrap_or("");
      format!("{}/{}", url.trim_end_matches('/'), prefix.trim_start_matches('/'))
    }
    (None, None) => DEFAULT_API.to_string(),
  };
  base.trim_end_matches('/').to_string()
}

#[derive(Debug, Deserialize)]
struct Repository {
  #[serde(default)]
  permissions: Option<Permissions>,
}

#[derive(Debug, Deserialize)]
struct Permissions {
  #[serde(default)]
  push: bool,
}

#[derive(Debug, Deserialize)]
struct Release {
  html_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
  #[serde(default)]
  items: Vec<Issue>,
}

#[derive(Debug, Deserialize)]
struct Issue {
  number: u64,
  #[serde(default)]
  title: String,
  /// Present only when the issue is a pull request
  #[serde(default)]
  pull_request: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PullCommit {
  sha: String,
}

/// Minimal GitHub REST client
pub struct GithubClient {
  agent: ureq::Agent,
  base: String,
  token: String,
}

impl GithubClient {
  pub fn new(base: String, token: String) -> Self {
    let config = ureq::Agent::config_builder()
      .timeout_global(Some(REQUEST_TIMEOUT))
      .http_status_as_error(false)
      .build();
    Self {
      agent: config.into(),
      base,
      token,
    }
  }

  /// Client from the injected environment; fails when no token is set
  pub fn from_env(env: &ReleaseEnv) -> ReleaseResult<Self> {
    let token = env.first_non_empty(TOKEN_VARS).ok_or_else(|| {
      ReleaseError::step(
        STEP,
        format!("The environment variable {} is required.", TOKEN_VARS.join(" or ")),
      )
    })?;
    Ok(Self::new(api_base(env), token.to_string()))
  }

  /// Whether the token may push to `owner/repo`
  pub fn can_push(&self, owner: &str, repo: &str) -> ReleaseResult<bool> {
    let url = format!("{}/repos/{}/{}", self.base, owner, repo);
    tracing::debug!(%url, "GET");

    let mut response = self
      .authorized(self.agent.get(&url))
      .call()
      .map_err(|e| transport_error(&url, e))?;

    let status = response.status().as_u16();
    match status {
      200..=299 => {
        let repository: Repository = response.body_mut().read_json().map_err(|e| transport_error(&url, e))?;
        Ok(repository.permissions.is_some_and(|p| p.push))
      }
      401 => Err(ReleaseError::step(STEP, "The GitHub token is invalid (401 Unauthorized).")),
      404 => Err(ReleaseError::step(
        STEP,
        format!("The repository {}/{} does not exist or the token cannot see it.", owner, repo),
      )),
      _ => Err(api_error(status, &mut response)),
    }
  }

  /// Create a release and return its html_url
  pub fn create_release(
    &self,
    owner: &str,
    repo: &str,
    tag: &str,
    target: &str,
    body: &str,
  ) -> ReleaseResult<String> {
    let url = format!("{}/repos/{}/{}/releases", self.base, owner, repo);
    let payload = json!({
      "tag_name": tag,
      "target_commitish": target,
      "name": tag,
      "body": body,
    });
    tracing::debug!(%url, tag, "POST");

    let mut response = self
      .authorized(self.agent.post(&url))
      .send_json(&payload)
      .map_err(|e| transport_error(&url, e))?;

    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
      return Err(api_error(status, &mut response));
    }

    let release: Release = response.body_mut().read_json().map_err(|e| transport_error(&url, e))?;
    Ok(release.html_url)
  }

  fn authorized<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
    request
      .header("Authorization", &format!("token {}", self.token))
      .header("Accept", "application/vnd.github+json")
      .header("User-Agent", concat!("apm-release/", env!("CARGO_PKG_VERSION")))
  }

  fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> ReleaseResult<T> {
    tracing::debug!(%url, "GET");
    let mut request = self.authorized(self.agent.get(url));
    for (key, value) in query {
      request = request.query(*key, *value);
    }
    let mut response = request.call().map_err(|e| transport_error(url, e))?;

    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
      return Err(api_error(status, &mut response));
    }
    response.body_mut().read_json().map_err(|e| transport_error(url, e))
  }

  fn send(&self, request: ureq::RequestBuilder<ureq::typestate::WithBody>, url: &str, payload: &Value) -> ReleaseResult<()> {
    let mut response = self
      .authorized(request)
      .send_json(payload)
      .map_err(|e| transport_error(url, e))?;

    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
      return Err(api_error(status, &mut response));
    }
    Ok(())
  }

  /// Issues and pull requests matching a search query
  fn search_issues(&self, query: &str) -> ReleaseResult<Vec<Issue>> {
    let url = format!("{}/search/issues", self.base);
    let results: SearchResults = self.get(&url, &[("q", query)])?;
    Ok(results.items)
  }

  fn pull_request_commits(&self, owner: &str, repo: &str, number: u64) -> ReleaseResult<Vec<String>> {
    let url = format!("{}/repos/{}/{}/pulls/{}/commits", self.base, owner, repo, number);
    let commits: Vec<PullCommit> = self.get(&url, &[("per_page", "100")])?;
    Ok(commits.into_iter().map(|c| c.sha).collect())
  }

  fn comment(&self, owner: &str, repo: &str, number: u64, body: &str) -> ReleaseResult<()> {
    let url = format!("{}/repos/{}/{}/issues/{}/comments", self.base, owner, repo, number);
    tracing::debug!(%url, "POST");
    self.send(self.agent.post(&url), &url, &json!({ "body": body }))
  }

  fn close_issue(&self, owner: &str, repo: &str, number: u64) -> ReleaseResult<()> {
    let url = format!("{}/repos/{}/{}/issues/{}", self.base, owner, repo, number);
    tracing::debug!(%url, "PATCH");
    self.send(self.agent.patch(&url), &url, &json!({ "state": "closed" }))
  }

  fn open_issue(&self, owner: &str, repo: &str, title: &str, body: &str) -> ReleaseResult<()> {
    let url = format!("{}/repos/{}/{}/issues", self.base, owner, repo);
    tracing::debug!(%url, "POST");
    let payload = json!({ "title": title, "body": body, "labels": [FAIL_LABEL] });
    self.send(self.agent.post(&url), &url, &payload)
  }

  /// Open issues of `owner/repo` titled exactly `title`
  fn failure_issues(&self, owner: &str, repo: &str, title: &str) -> ReleaseResult<Vec<Issue>> {
    let query = format!("in:title repo:{}/{} type:issue state:open {}", owner, repo, title);
    let issues = self.search_issues(&query)?;
    Ok(issues.into_iter().filter(|issue| issue.title == title).collect())
  }
}

/// Search queries naming every SHA, each within the search API's length limit
fn pull_request_queries(owner: &str, repo: &str, shas: &[String]) -> Vec<String> {
  let base = format!("repo:{}/{} type:pr", owner, repo);
  let mut queries = Vec::new();
  let mut current = base.clone();

  for sha in shas {
    if current.len() + 1 + sha.len() > MAX_SEARCH_QUERY && current.len() > base.len() {
      queries.push(std::mem::replace(&mut current, base.clone()));
    }
    current.push(' ');
    current.push_str(sha);
  }
  if current.len() > base.len() {
    queries.push(current);
  }
  queries
}

fn transport_error(url: &str, err: ureq::Error) -> ReleaseError {
  ReleaseError::step(STEP, format!("request to {} failed: {}", url, err))
}

fn api_error(status: u16, response: &mut ureq::http::Response<ureq::Body>) -> ReleaseError {
  let message = response
    .body_mut()
    .read_json::<Value>()
    .ok()
    .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
    .unwrap_or_else(|| "no message".to_string());
  ReleaseError::step(STEP, format!("GitHub API returned {}: {}", status, message))
}

fn slug(ctx: &StepContext<'_>) -> ReleaseResult<(String, String)> {
  let target = ctx.push_target()?;
  repo_slug(&target)
    .ok_or_else(|| ReleaseError::step(STEP, format!("cannot determine owner/repo from repository URL {}", target)))
}

/// A token is set, the slug resolves and the token may push
pub fn verify(ctx: &StepContext<'_>) -> ReleaseResult<Option<String>> {
  let client = GithubClient::from_env(&ctx.release.env)?;
  let (owner, repo) = slug(ctx)?;

  if !client.can_push(&owner, &repo)? {
    return Err(ReleaseError::step(
      STEP,
      format!("The GitHub token doesn't allow to push to {}/{}.", owner, repo),
    ));
  }

  Ok(Some(format!("{}/{}", owner, repo)))
}

/// Create the release for the pushed tag
pub fn publish(ctx: &StepContext<'_>) -> ReleaseResult<Option<String>> {
  let next = ctx.require_next(STEP)?;
  let client = GithubClient::from_env(&ctx.release.env)?;
  let (owner, repo) = slug(ctx)?;

  let html_url = client.create_release(&owner, &repo, &next.tag, ctx.branch(), &next.notes)?;
  println!("Published GitHub release: {}", html_url);

  Ok(Some(html_url))
}

/// Comment on the pull requests shipped in the release and close failure issues
///
/// Returns the number of pull requests commented on.
pub fn announce_success(ctx: &StepContext<'_>, fail_title: &str, release_url: Option<&str>) -> ReleaseResult<usize> {
  let next = ctx.require_next(STEP)?;
  let client = GithubClient::from_env(&ctx.release.env)?;
  let (owner, repo) = slug(ctx)?;
  let released: BTreeSet<&str> = next.commits.iter().map(String::as_str).collect();

  let mut pull_requests = BTreeSet::new();
  for query in pull_request_queries(&owner, &repo, &next.commits) {
    let items = client.search_issues(&query)?;
    pull_requests.extend(items.into_iter().filter(|i| i.pull_request.is_some()).map(|i| i.number));
  }

  let available = match release_url {
    Some(url) => format!("\n\nThe release is available on [GitHub release]({})", url),
    None => String::new(),
  };

  let mut commented = 0;
  for number in pull_requests {
    let shas = client.pull_request_commits(&owner, &repo, number)?;
    if !shas.iter().any(|sha| released.contains(sha.as_str())) {
      tracing::debug!(number, "pull request has no released commit");
      continue;
    }
    let body = format!(":tada: This PR is included in version {} :tada:{}", next.version, available);
    client.comment(&owner, &repo, number, &body)?;
    println!("💬 Commented on pull request #{}", number);
    commented += 1;
  }

  for issue in client.failure_issues(&owner, &repo, fail_title)? {
    let body = format!(":tada: This issue has been resolved in version {} :tada:{}", next.version, available);
    client.comment(&owner, &repo, issue.number, &body)?;
    client.close_issue(&owner, &repo, issue.number)?;
    println!("🔒 Closed failure issue #{}", issue.number);
  }

  Ok(commented)
}

/// Report a failed release on the failure issue, opening it when none is open
pub fn announce_failure(ctx: &StepContext<'_>, fail_title: &str, error: &ReleaseError) -> ReleaseResult<()> {
  let client = GithubClient::from_env(&ctx.release.env)?;
  let (owner, repo) = slug(ctx)?;
  let body = failure_body(ctx.branch(), error);

  match client.failure_issues(&owner, &repo, fail_title)?.first() {
    Some(issue) => {
      client.comment(&owner, &repo, issue.number, &body)?;
      println!("💬 Reported the failure on issue #{}", issue.number);
    }
    None => {
      client.open_issue(&owner, &repo, fail_title, &body)?;
      println!("🚨 Opened issue \"{}\"", fail_title);
    }
  }
  Ok(())
}

fn failure_body(branch: &str, error: &ReleaseError) -> String {
  let mut body = format!(
    "## :rotating_light: The automated release from the `{}` branch failed. :rotating_light:\n\n\
     Fix the error below and push again; the next successful release closes this issue.\n\n",
    branch
  );
  if let Some(code) = error.code() {
    body.push_str(&format!("### {}\n\n", code));
  }
  body.push_str(&format!("```\n{}\n```\n", error.to_string().trim_end()));
  if let Some(help) = error.help_message() {
    body.push_str(&format!("\n{}\n", help));
  }
  body
}
