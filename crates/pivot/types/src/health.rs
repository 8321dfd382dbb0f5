//! Health reporting types
//!
//! A [`HealthReport`] is the immutable result of one probe invocation. It is
//! never persisted beyond an instance's cached last report, which is
//! overwritten on each probe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a single health probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Whether the instance is considered healthy
    pub healthy: bool,

    /// Human-readable detail (probe message or captured error text)
    pub detail: String,

    /// When the probe ran
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    /// Create a healthy report
    pub fn healthy(detail: impl Into<String>) -> Self {
        Self {
            healthy: true,
            detail: detail.into(),
            checked_at: Utc::now(),
        }
    }

    /// Create an unhealthy report
    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            healthy: false,
            detail: detail.into(),
            checked_at: Utc::now(),
        }
    }
}
