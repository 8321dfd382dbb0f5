//! Pivot Registry - Component type registry and instance table
//!
//! This crate provides the two registries at the heart of Pivot:
//!
//! - **TypeRegistry**: the closed, pre-registered set of component types
//!   (constructor + optional health probe per type)
//! - **InstanceTable**: the authoritative mapping of instance name to live
//!   instance, the central mutable resource
//!
//! ## Locking
//!
//! The instance table separates two concerns: a *structural* lock guarding
//! insert/remove/swap of entries (held only for the brief slot update, so
//! listing is never torn), and a *per-name transition lock* inside each
//! entry that serializes start/stop/replace/delete for that name. Callers
//! that operate on different names never block on each other.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod component;
pub mod error;
pub mod table;
pub mod types;

// Re-exports
pub use component::{Component, ComponentError, ComponentFactory, ComponentType, HealthProbe};
pub use error::{RegistryError, Result};
pub use table::{InstanceEntry, InstanceTable};
pub use types::TypeRegistry;
