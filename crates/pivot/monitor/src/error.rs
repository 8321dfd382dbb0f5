//! Monitor error types

use thiserror::Error;

/// Condition monitor errors
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Condition already registered: {0}")]
    ConditionAlreadyExists(String),

    #[error("Condition not found: {0}")]
    ConditionNotFound(String),

    #[error("Monitor is already running")]
    AlreadyRunning,
}

/// Result type for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;
