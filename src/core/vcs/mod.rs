pub mod system_git;
mod system_git_ops;

pub use system_git::SystemGit;

/// Information about a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
  pub sha: String,
  pub message: String,
}

impl CommitInfo {
  /// First line of the message
  pub fn subject(&self) -> &str {
    self.message.lines().next().unwrap_or("")
  }
}
