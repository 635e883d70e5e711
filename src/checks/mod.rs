//! Release preconditions
//!
//! Preconditions run before anything else in a release and fail fast. All
//! checks implement the `Check` trait and are built from `Precondition`
//! declarations, so a pipeline definition can list them as data.
//!
//! # Built-in Checks
//!
//! - **tool**: a CLI's version probe (`apm -v`) exits 0
//! - **env**: an environment variable (`ATOM_ACCESS_TOKEN`) is set and non-empty

mod runner;
mod token;
mod tool;
mod trait_def;

// Re-export public API
pub use runner::CheckRunner;
pub use trait_def::Precondition;
