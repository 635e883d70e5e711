//! System git backend
//!
//! Every operation is one `git` subprocess with an isolated environment:
//! only the whitelisted variables from the injected `ReleaseEnv` reach git,
//! and user config that changes output or behaviour is overridden.

use crate::core::env::ReleaseEnv;
use crate::core::error::{GitError, ReleaseError, ReleaseResult, ResultExt};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Git backend using system git
pub struct SystemGit {
  /// Repository working directory
  pub(crate) repo_path: PathBuf,

  /// Working tree root
  pub(crate) work_tree: PathBuf,

  /// Environment git subprocesses are built from
  pub(crate) env: ReleaseEnv,
}

impl SystemGit {
  /// Open a git repository
  ///
  /// This performs ONE subprocess call to get the repository metadata.
  pub fn open(path: &Path, env: &ReleaseEnv) -> ReleaseResult<Self> {
    let mut cmd = Command::new("git");
    env.apply_git(&mut cmd);
    let output = cmd
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(ReleaseError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(ReleaseError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let work_tree = stdout.trim();

    Ok(Self {
      repo_path: path.to_path_buf(),
      work_tree: PathBuf::from(work_tree),
      env: env.clone(),
    })
  }

  /// Working tree root
  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Whether HEAD points at a commit (false on a freshly initialised repo)
  pub fn has_commits(&self) -> ReleaseResult<bool> {
    let output = self
      .git_cmd()
      .args(["rev-parse", "--verify", "--quiet", "HEAD"])
      .output()
      .context("Failed to resolve HEAD")?;
    Ok(output.status.success())
  }

  /// Get HEAD commit SHA
  pub fn head_commit(&self) -> ReleaseResult<String> {
    let output = self.run(&["rev-parse", "HEAD"], "Failed to get HEAD commit")?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Get current branch name
  pub fn current_branch(&self) -> ReleaseResult<String> {
    // symbolic-ref also works on an unborn branch, unlike rev-parse --abbrev-ref
    let output = self
      .git_cmd()
      .args(["symbolic-ref", "--short", "-q", "HEAD"])
      .output()
      .context("Failed to get current branch")?;

    if !output.status.success() {
      return Ok("HEAD".to_string()); // Detached HEAD
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Run a git command and fail on non-zero exit
  pub(crate) fn run(&self, args: &[&str], what: &str) -> ReleaseResult<Output> {
    tracing::debug!(args = ?args, "git");
    let output = self.git_cmd().args(args).output().context(what.to_string())?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(ReleaseError::Git(GitError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        stderr: stderr.to_string(),
      }));
    }

    Ok(output)
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to repo path
  /// - Clears environment variables, forwarding only the git whitelist
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");
    self.env.apply_git(&mut cmd);

    cmd.arg("-C").arg(&self.repo_path);

    // Force safe behavior (override user config)
    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII
    cmd.arg("-c").arg("commit.gpgSign=false");
    cmd.arg("-c").arg("tag.gpgSign=false");
    cmd.arg("-c").arg("log.showSignature=false");

    cmd
  }
}
