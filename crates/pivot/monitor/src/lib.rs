//! Pivot Monitor - Periodic condition monitoring
//!
//! The [`ConditionMonitor`] verifies at runtime that registered conditions
//! hold, and raises [`Alert`]s when they do not. Each condition pairs an
//! async sampling check with a validator over the sampled value and runs on
//! its own interval. A check that errors raises an error-level alert rather
//! than crashing the monitoring loop.
//!
//! Which values get sampled is entirely up to the host; this crate carries
//! no samplers of its own.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod alert;
pub mod condition;
pub mod error;
pub mod monitor;

// Re-exports
pub use alert::{Alert, AlertLevel};
pub use condition::{check_fn, Condition, ConditionCheck};
pub use error::{MonitorError, Result};
pub use monitor::{ConditionInfo, ConditionMonitor, MonitorEvent};
