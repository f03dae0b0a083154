//! # Reprise Types
//!
//! Pure data types for reprise replay logs and cache entries.
//!
//! This crate holds the serialized vocabulary shared between the replay
//! engine and anything that inspects its cache files: resolved actions,
//! replay steps, versioned cache entries, execution results, and the
//! option structs that feed cache-key derivation. Zero heavy
//! dependencies so embedders can read cache entries without pulling in
//! the engine.

#![warn(missing_docs)]

mod action;
mod entry;
mod options;
mod result;
mod step;

pub use action::{actions_equivalent, Action};
pub use entry::{CacheEntry, CACHE_SCHEMA_VERSION};
pub use options::{AgentOptions, ExecuteOptions, SanitizedOptions};
pub use result::{AgentResult, AgentUsage, ResultMetadata};
pub use step::{KeyInput, Point, ReplayStep, WaitUntil};
