//! Release analysis
//!
//! Works out what the next release is, without touching anything:
//!
//! 1. The last release is the highest-versioned tag that matches the tag
//!    format and is merged into HEAD (none on a first release)
//! 2. Commits since that tag are parsed as conventional commits
//! 3. The largest bump wins: breaking → major, `feat` → minor,
//!    `fix`/`perf`/`revert` → patch. Anything else releases nothing
//! 4. The first release is always 1.0.0
//!
//! The manifest and changelog helpers used by the publish steps also live
//! here.

pub mod changelog;
pub mod commit;
pub mod manifest;
pub mod plan;
pub mod tags;

pub use manifest::Manifest;
pub use plan::{NextRelease, ReleasePlan, VersionBump};
pub use tags::TagFormat;
