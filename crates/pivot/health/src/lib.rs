//! Pivot Health - Consolidated health reporting
//!
//! The [`HealthAggregator`] walks the instance table invoking each
//! instance's type-supplied probe and produces a consolidated report.
//! Health checking never crashes the caller: a probe that errors is
//! captured as an unhealthy report for that instance, leaving every other
//! instance's result intact.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod aggregator;
pub mod error;

// Re-exports
pub use aggregator::HealthAggregator;
pub use error::{HealthError, Result};
