//! # Pivot Lifecycle Controller
//!
//! The [`LifecycleController`] is the single entry point for component
//! lifecycle operations: registering types, creating, starting, stopping,
//! deleting, and atomically replacing live instances without restarting the
//! process.
//!
//! ## Overview
//!
//! The controller composes the type registry, the instance table, and an
//! optional [`ConfigSource`](pivot_config::ConfigSource) behind one API
//! that:
//!
//! - enforces the instance state machine
//! - serializes operations per instance name while keeping different names
//!   independent
//! - runs the make-before-break replace protocol
//! - emits events for monitoring and audit
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pivot_lifecycle::LifecycleController;
//! use pivot_registry::ComponentType;
//! use pivot_types::{InstanceName, TypeName};
//!
//! # async fn example(factory: Arc<dyn pivot_registry::ComponentFactory>) {
//! let controller = LifecycleController::new();
//!
//! controller
//!     .register_type(ComponentType::new("sensor", factory))
//!     .await
//!     .unwrap();
//!
//! let record = controller
//!     .create(InstanceName::new("s1"), TypeName::new("sensor"), None)
//!     .await
//!     .unwrap();
//!
//! controller.start(&record.name).await.unwrap();
//!
//! // Hot-swap: new instance goes live under "s1" with no service gap.
//! controller
//!     .replace(&record.name, None, Some(serde_json::json!({ "gain": 2 })))
//!     .await
//!     .unwrap();
//! # }
//! ```
//!
//! ## Cancellation
//!
//! Operations are not cancellable mid-flight. A caller that times out must
//! still let the in-flight operation run to completion; aborting a replace
//! between staging and commit would void the atomicity guarantee, so the
//! protocol never yields control to the caller in a partially-swapped
//! state.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod controller;
pub mod error;
pub mod replace;

// Re-exports
pub use controller::LifecycleController;
pub use error::{LifecycleError, Result};
