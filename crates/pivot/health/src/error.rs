//! Error types for health aggregation
//!
//! Probe failures are deliberately absent here: they are captured into the
//! per-instance report, never surfaced as errors.

use pivot_types::InstanceName;
use thiserror::Error;

/// Health aggregation errors
#[derive(Debug, Error)]
pub enum HealthError {
    /// The queried instance is not in the table
    #[error("Instance not found: {0}")]
    InstanceNotFound(InstanceName),
}

/// Result type for health operations
pub type Result<T> = std::result::Result<T, HealthError>;
