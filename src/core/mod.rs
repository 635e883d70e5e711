//! Core building blocks shared by every command
//!
//! - **ci**: CI service detection (branch, pull request builds)
//! - **config**: release.toml parsing and validation
//! - **context**: per-invocation context (root, env, config, pipeline)
//! - **env**: the process environment, captured once and injected
//! - **error**: error types with exit codes, stable codes and help messages
//! - **vcs**: git operations (SystemGit)

pub mod ci;
pub mod config;
pub mod context;
pub mod env;
pub mod error;
pub mod vcs;
