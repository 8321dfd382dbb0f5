//! Alert types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Info => write!(f, "info"),
            AlertLevel::Warning => write!(f, "warning"),
            AlertLevel::Error => write!(f, "error"),
            AlertLevel::Critical => write!(f, "critical"),
        }
    }
}

/// An alert raised by a failed or erroring condition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert ID
    pub id: Uuid,

    /// Alert severity
    pub level: AlertLevel,

    /// Human-readable message
    pub message: String,

    /// Name of the condition that raised the alert
    pub condition: String,

    /// Value observed by the check, when the check itself succeeded
    pub observed: Option<f64>,

    /// When the alert was raised
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    /// Create a new alert
    pub fn new(
        level: AlertLevel,
        condition: impl Into<String>,
        message: impl Into<String>,
        observed: Option<f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            condition: condition.into(),
            observed,
            raised_at: Utc::now(),
        }
    }
}
