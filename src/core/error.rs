//! Error types for apm-release with contextual messages and exit codes
//!
//! Every failure the workflow can hit maps onto one `ReleaseError` variant.
//! Precondition failures carry a stable error code so callers can tell a
//! misconfigured environment apart from a failing release step.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for apm-release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, manifest, invalid args)
  User = 1,
  /// System error (git, network, I/O, failing step)
  System = 2,
  /// Precondition failure (tool missing, credential missing)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for apm-release
#[derive(Debug)]
pub enum ReleaseError {
  /// Configuration and manifest errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Environment precondition errors
  Precondition(PreconditionError),

  /// A release step failed. The message is passed through as the step produced it.
  Step { step: String, message: String },

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl ReleaseError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    ReleaseError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    ReleaseError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Create a step failure
  pub fn step(step: impl Into<String>, message: impl Into<String>) -> Self {
    ReleaseError::Step {
      step: step.into(),
      message: message.into(),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      ReleaseError::Message { message, context, help } => ReleaseError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      ReleaseError::Io(err) => ReleaseError::Message {
        message: format!("I/O error: {}", err),
        context: Some(ctx_str),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      ReleaseError::Config(_) => ExitCode::User,
      ReleaseError::Git(_) => ExitCode::System,
      ReleaseError::Precondition(_) => ExitCode::Validation,
      ReleaseError::Step { .. } => ExitCode::System,
      ReleaseError::Io(_) => ExitCode::System,
      ReleaseError::Message { .. } => ExitCode::User,
    }
  }

  /// Stable error code, when the failure has one
  pub fn code(&self) -> Option<&'static str> {
    match self {
      ReleaseError::Precondition(e) => Some(e.code()),
      _ => None,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      ReleaseError::Config(e) => e.help_message(),
      ReleaseError::Git(e) => e.help_message(),
      ReleaseError::Precondition(e) => Some(e.help_message()),
      ReleaseError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for ReleaseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseError::Config(e) => write!(f, "{}", e),
      ReleaseError::Git(e) => write!(f, "{}", e),
      ReleaseError::Precondition(e) => write!(f, "{}", e),
      ReleaseError::Step { step, message } => write!(f, "Step '{}' failed: {}", step, message),
      ReleaseError::Io(e) => write!(f, "I/O error: {}", e),
      ReleaseError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for ReleaseError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ReleaseError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for ReleaseError {
  fn from(err: io::Error) -> Self {
    ReleaseError::Io(err)
  }
}

impl From<String> for ReleaseError {
  fn from(msg: String) -> Self {
    ReleaseError::message(msg)
  }
}

impl From<&str> for ReleaseError {
  fn from(msg: &str) -> Self {
    ReleaseError::message(msg)
  }
}

impl From<toml_edit::de::Error> for ReleaseError {
  fn from(err: toml_edit::de::Error) -> Self {
    ReleaseError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<toml_edit::ser::Error> for ReleaseError {
  fn from(err: toml_edit::ser::Error) -> Self {
    ReleaseError::message(format!("TOML serialization error: {}", err))
  }
}

impl From<serde_json::Error> for ReleaseError {
  fn from(err: serde_json::Error) -> Self {
    ReleaseError::message(format!("JSON error: {}", err))
  }
}

impl From<semver::Error> for ReleaseError {
  fn from(err: semver::Error) -> Self {
    ReleaseError::message(format!("Invalid semantic version: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for ReleaseError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    ReleaseError::message(format!("UTF-8 conversion error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// release.toml could not be parsed or failed validation
  Invalid { path: PathBuf, reason: String },

  /// Pipeline declaration breaks an ordering rule
  Pipeline { reason: String },

  /// package.json not found
  ManifestNotFound { path: PathBuf },

  /// package.json is missing a required field or is malformed
  ManifestInvalid { path: PathBuf, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::Pipeline { .. } => {
        Some("Run `apm-release preset` to see the default step order and start from it.".to_string())
      }
      ConfigError::ManifestNotFound { .. } => {
        Some("Run apm-release from the package root or pass --cwd <dir>.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::Invalid { path, reason } => {
        write!(f, "Invalid configuration in {}: {}", path.display(), reason)
      }
      ConfigError::Pipeline { reason } => write!(f, "Invalid pipeline: {}", reason),
      ConfigError::ManifestNotFound { path } => {
        write!(f, "Package manifest not found: {}", path.display())
      }
      ConfigError::ManifestInvalid { path, reason } => {
        write!(f, "Invalid package manifest {}: {}", path.display(), reason)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// Push failed
  PushFailed {
    remote: String,
    refspec: String,
    reason: String,
  },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::PushFailed { reason, .. } => {
        if reason.contains("non-fast-forward") || reason.contains("rejected") {
          Some("The remote has commits you don't have. Pull and re-run the release.".to_string())
        } else if reason.contains("denied") || reason.contains("403") {
          Some("Check that the release credentials are allowed to push to the repository.".to_string())
        } else {
          None
        }
      }
      GitError::RepoNotFound { path } => Some(format!(
        "Run apm-release inside a git repository (checked: {})",
        path.display()
      )),
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr.trim_end())
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::PushFailed { remote, refspec, reason } => {
        write!(f, "Push of {} to {} failed: {}", refspec, remote, reason.trim_end())
      }
    }
  }
}

/// Environment precondition errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
  /// Required CLI absent or its version probe exited non-zero
  ToolNotInstalled { tool: String },

  /// Required environment variable absent or empty
  MissingCredential { variable: String },
}

impl PreconditionError {
  /// Stable machine-readable code
  pub fn code(&self) -> &'static str {
    match self {
      PreconditionError::ToolNotInstalled { .. } => "ENOAPMCLI",
      PreconditionError::MissingCredential { .. } => "ENOAPMTOKEN",
    }
  }

  fn help_message(&self) -> String {
    match self {
      PreconditionError::ToolNotInstalled { tool } => {
        format!("Install {} and make sure `{} -v` works from the release environment.", tool, tool)
      }
      PreconditionError::MissingCredential { variable } => {
        format!("Export {} in the CI environment before running the release.", variable)
      }
    }
  }
}

impl fmt::Display for PreconditionError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PreconditionError::ToolNotInstalled { tool } => write!(f, "The {} CLI must be installed.", tool),
      PreconditionError::MissingCredential { variable } => {
        write!(f, "The environment variable {} is required.", variable)
      }
    }
  }
}

/// Result type alias for apm-release
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> ReleaseResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<ReleaseError>,
{
  fn context(self, ctx: impl Into<String>) -> ReleaseResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with its code and help text
pub fn print_error(error: &ReleaseError) {
  match error.code() {
    Some(code) => eprintln!("\n❌ {} ({})\n", error, code),
    None => eprintln!("\n❌ {}\n", error),
  }

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
