//! Pivot Config - Reloadable configuration sources
//!
//! A [`ConfigSource`] supplies a mapping of component-type-name to
//! configuration blob, refreshable at runtime. The lifecycle controller
//! consults the source when creating or replacing instances; already-running
//! instances are never hot-updated (invoke `replace` for that).
//!
//! Two backends are provided:
//!
//! - [`FileConfigSource`]: JSON/YAML files in a directory, keyed by file
//!   stem, with modification-time-aware reload. File watching stays with
//!   the host; `reload` is the notification the watcher would deliver.
//! - [`MemoryConfigSource`]: in-memory map for tests and demos.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod file;
pub mod memory;
pub mod source;

// Re-exports
pub use error::{ConfigError, Result};
pub use file::FileConfigSource;
pub use memory::MemoryConfigSource;
pub use source::ConfigSource;
