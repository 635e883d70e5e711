//! Additional operations for SystemGit (history, tags, commit, push)

use super::CommitInfo;
use super::system_git::SystemGit;
use crate::core::config::GitIdentity;
use crate::core::error::{GitError, ReleaseError, ReleaseResult, ResultExt};
use crate::utils::{path_to_git_format, redact_url};
use std::path::PathBuf;

/// Record separator between commits in `git log` output
const RECORD_SEP: char = '\u{1e}';
/// Field separator between SHA and message
const FIELD_SEP: char = '\u{1f}';

impl SystemGit {
  /// Commits reachable from HEAD but not from `since`, oldest first
  ///
  /// With `since = None` every commit reachable from HEAD is returned.
  /// An unborn branch yields an empty list.
  pub fn commits_since(&self, since: Option<&str>) -> ReleaseResult<Vec<CommitInfo>> {
    if !self.has_commits()? {
      return Ok(vec![]);
    }

    let range = match since {
      Some(rev) => format!("{}..HEAD", rev),
      None => "HEAD".to_string(),
    };
    let format = format!("--format=%H{}%B{}", FIELD_SEP, RECORD_SEP);

    let output = self.run(&["log", "--reverse", &format, &range], "Failed to run git log")?;
    Ok(parse_log_output(&String::from_utf8_lossy(&output.stdout)))
  }

  /// Tags whose commit is an ancestor of (or equal to) HEAD
  pub fn tags_merged_into_head(&self) -> ReleaseResult<Vec<String>> {
    if !self.has_commits()? {
      return Ok(vec![]);
    }

    let output = self.run(&["tag", "--merged", "HEAD"], "Failed to list tags")?;
    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect(),
    )
  }

  /// Resolve the commit a tag points at
  pub fn tag_commit(&self, tag: &str) -> ReleaseResult<String> {
    let spec = format!("{}^{{commit}}", tag);
    let output = self.run(&["rev-parse", &spec], "Failed to resolve tag")?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Stage files (paths relative to the work tree)
  pub fn add(&self, paths: &[PathBuf]) -> ReleaseResult<()> {
    let git_paths: Vec<String> = paths.iter().map(|p| path_to_git_format(p)).collect();
    let mut args = vec!["add", "--"];
    args.extend(git_paths.iter().map(String::as_str));
    self.run(&args, "Failed to stage files")?;
    Ok(())
  }

  /// Whether the index differs from HEAD (or holds anything, on an unborn branch)
  pub fn has_staged_changes(&self) -> ReleaseResult<bool> {
    if !self.has_commits()? {
      let output = self.run(&["ls-files", "--cached"], "Failed to list index")?;
      return Ok(!output.stdout.is_empty());
    }

    let output = self
      .git_cmd()
      .args(["diff", "--cached", "--quiet"])
      .output()
      .context("Failed to diff index")?;

    // --quiet exits 1 when there are differences
    match output.status.code() {
      Some(0) => Ok(false),
      Some(1) => Ok(true),
      _ => Err(ReleaseError::Git(GitError::CommandFailed {
        command: "git diff --cached --quiet".to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      })),
    }
  }

  /// Commit the index as `identity`
  pub fn commit(&self, message: &str, identity: &GitIdentity) -> ReleaseResult<String> {
    tracing::debug!(message, "git commit");
    let output = self
      .git_cmd()
      .env("GIT_AUTHOR_NAME", &identity.name)
      .env("GIT_AUTHOR_EMAIL", &identity.email)
      .env("GIT_COMMITTER_NAME", &identity.name)
      .env("GIT_COMMITTER_EMAIL", &identity.email)
      .args(["commit", "--no-verify", "-m", message])
      .output()
      .context("Failed to commit")?;

    if !output.status.success() {
      return Err(ReleaseError::Git(GitError::CommandFailed {
        command: "git commit".to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    self.head_commit()
  }

  /// Create a lightweight tag at `rev`
  pub fn create_tag(&self, tag: &str, rev: &str) -> ReleaseResult<()> {
    self.run(&["tag", tag, rev], "Failed to create tag")?;
    Ok(())
  }

  /// Push a refspec to a remote (URL or remote name)
  ///
  /// The remote may carry credentials; only its redacted form is logged or
  /// reported.
  pub fn push(&self, remote: &str, refspec: &str) -> ReleaseResult<()> {
    self.run_push(&["push"], remote, refspec, "Failed to push")
  }

  /// Check push access without transferring anything
  pub fn push_dry_run(&self, remote: &str, refspec: &str) -> ReleaseResult<()> {
    self.run_push(
      &["push", "--dry-run", "--no-verify"],
      remote,
      refspec,
      "Failed to run git push --dry-run",
    )
  }

  fn run_push(&self, args: &[&str], remote: &str, refspec: &str, context: &str) -> ReleaseResult<()> {
    let shown = redact_url(remote);
    tracing::debug!(remote = %shown, refspec, "{}", args.join(" "));
    let output = self
      .git_cmd()
      .args(args)
      .args([remote, refspec])
      .output()
      .context(context)?;

    if !output.status.success() {
      let reason = String::from_utf8_lossy(&output.stderr).replace(remote, &shown);
      return Err(ReleaseError::Git(GitError::PushFailed {
        remote: shown,
        refspec: refspec.to_string(),
        reason,
      }));
    }

    Ok(())
  }

  /// List all remotes
  pub fn list_remotes(&self) -> ReleaseResult<Vec<(String, String)>> {
    let output = self
      .git_cmd()
      .args(["remote", "-v"])
      .output()
      .context("Failed to list remotes")?;

    if !output.status.success() {
      return Ok(vec![]);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut remotes = Vec::new();

    for line in stdout.lines() {
      // Format: "origin  git@github.com:user/repo.git (fetch)"
      let parts: Vec<&str> = line.split_whitespace().collect();
      if parts.len() >= 2 && line.contains("(fetch)") {
        remotes.push((parts[0].to_string(), parts[1].to_string()));
      }
    }

    Ok(remotes)
  }

  /// Get remote URL
  pub fn get_remote_url(&self, name: &str) -> ReleaseResult<Option<String>> {
    let remotes = self.list_remotes()?;
    Ok(remotes.into_iter().find(|(n, _)| n == name).map(|(_, url)| url))
  }
}

/// Parse `git log --format=%H<US>%B<RS>` output into commits
fn parse_log_output(output: &str) -> Vec<CommitInfo> {
  output
    .split(RECORD_SEP)
    .filter_map(|record| {
      let record = record.trim_start_matches('\n');
      let (sha, message) = record.split_once(FIELD_SEP)?;
      let sha = sha.trim();
      if sha.is_empty() {
        return None;
      }
      Some(CommitInfo {
        sha: sha.to_string(),
        message: message.trim().to_string(),
      })
    })
    .collect()
}
