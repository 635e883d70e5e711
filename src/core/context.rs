//! Release context - build once, pass everywhere
//!
//! ```text
//! main.rs:
//!   ReleaseEnv::capture()
//!   ReleaseContext::build(cwd, env) -> &ReleaseContext
//!   |
//!   v
//! commands/run.rs, verify.rs, plan.rs, preset.rs:
//!   fn run_*(ctx: &ReleaseContext, ...)
//! ```
//!
//! Config loading and pipeline validation happen here, so an invalid
//! `release.toml` fails before any check or step runs.

use crate::core::config::ReleaseConfig;
use crate::core::env::ReleaseEnv;
use crate::core::error::{ReleaseResult, ResultExt};
use crate::pipeline::Pipeline;
use crate::release::TagFormat;
use std::path::{Path, PathBuf};

/// Shared state for one invocation
#[derive(Debug, Clone)]
pub struct ReleaseContext {
  /// Package root (absolute path)
  pub root: PathBuf,

  /// Environment captured at startup
  pub env: ReleaseEnv,

  /// Loaded configuration (preset defaults when no file exists)
  pub config: ReleaseConfig,

  /// Pipeline to execute: the override from config, or the preset
  pub pipeline: Pipeline,
}

impl ReleaseContext {
  /// Load config and resolve the pipeline for the package at `root`
  pub fn build(root: &Path, env: ReleaseEnv) -> ReleaseResult<Self> {
    let root = root
      .canonicalize()
      .with_context(|| format!("Package directory not found: {}", root.display()))?;
    let config = ReleaseConfig::load(&root)?;
    let pipeline = config.resolve_pipeline();
    pipeline.validate()?;

    Ok(Self {
      root,
      env,
      config,
      pipeline,
    })
  }

  /// Absolute path to the package manifest
  pub fn manifest_path(&self) -> PathBuf {
    self.root.join(&self.config.manifest)
  }

  pub fn tag_format(&self) -> TagFormat {
    TagFormat::new(&self.config.tag_format)
  }
}
