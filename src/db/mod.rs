//! Database module: row models and SQL repositories for the story mirror.
//!
//! - `model`: view models returned by repositories.
//! - `repo`: SQL-only functions that map rows into entities.
//!
//! Callers import from `storybox::db`; the repository API is re-exported here.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::{ReplaceOutcome, SyncState};
