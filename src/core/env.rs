//! Injected process environment
//!
//! The environment is read exactly once, in `main`, and then passed by
//! reference to the precondition checks and to every step. Nothing below
//! `main` calls `std::env::var` directly, which keeps tests free of global
//! state and makes every step's inputs explicit.

use std::collections::BTreeMap;
use std::process::Command;

/// Variables forwarded to git subprocesses. Everything else is cleared.
const GIT_PASSTHROUGH: &[&str] = &["PATH", "HOME", "SSH_AUTH_SOCK", "GIT_SSH_COMMAND"];

/// Snapshot of the environment a release runs in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseEnv {
  vars: BTreeMap<String, String>,
}

impl ReleaseEnv {
  /// Capture the current process environment (non UTF-8 entries are dropped)
  pub fn capture() -> Self {
    let vars = std::env::vars_os()
      .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
      .collect();
    Self { vars }
  }

  /// Build an environment from explicit pairs
  #[cfg(test)]
  pub fn from_pairs<I, K, V>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    Self {
      vars: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
    }
  }

  /// Raw lookup
  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(String::as_str)
  }

  /// Lookup that treats an empty value as unset
  pub fn non_empty(&self, key: &str) -> Option<&str> {
    self.get(key).filter(|v| !v.is_empty())
  }

  /// First non-empty value among `keys`
  pub fn first_non_empty(&self, keys: &[&str]) -> Option<&str> {
    keys.iter().find_map(|k| self.non_empty(k))
  }

  /// Iterate over all variables
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Replace the command's environment with this one
  pub fn apply_all(&self, cmd: &mut Command) {
    cmd.env_clear();
    cmd.envs(self.iter());
  }

  /// Replace the command's environment with the git whitelist
  pub fn apply_git(&self, cmd: &mut Command) {
    cmd.env_clear();
    for key in GIT_PASSTHROUGH {
      if let Some(value) = self.get(key) {
        cmd.env(key, value);
      }
    }
    cmd.env("GIT_TERMINAL_PROMPT", "0");
  }

  /// Return a copy with `key` set (tests and overrides)
  #[cfg(test)]
  pub fn with(mut self, key: &str, value: &str) -> Self {
    self.vars.insert(key.to_string(), value.to_string());
    self
  }
}
