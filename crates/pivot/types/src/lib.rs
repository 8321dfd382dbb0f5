//! Pivot Types - Core types for the component lifecycle layer
//!
//! Pivot manages the runtime lifecycle of uniquely named component
//! instances: registration of component types, instantiation, start/stop,
//! health checking, and atomic zero-downtime replacement.
//!
//! ## Architectural Boundaries
//!
//! - **Pivot** owns: the instance table, the lifecycle state machine, the
//!   replace protocol, consolidated health reporting
//! - **Component implementations** own: their internal state and the work
//!   performed in `start`/`stop`
//! - **The host** owns: which component types exist (a closed set registered
//!   at startup) and where configuration comes from
//!
//! ## Key Concepts
//!
//! - **Component type**: a named capability set (constructor + optional
//!   health probe) from which instances are made
//! - **Component instance**: a live, uniquely named, stateful object created
//!   from a component type
//! - **Replace**: substituting a new instance for an existing name without
//!   an observable gap in availability
//! - **Events**: unified observability stream over lifecycle activity

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod events;
pub mod health;
pub mod ids;
pub mod instance;

// Re-export main types
pub use events::{EventSeverity, EventSource, PivotEvent, PivotEventEnvelope};
pub use health::HealthReport;
pub use ids::{InstanceName, TypeName};
pub use instance::{InstanceRecord, InstanceState};
