//! Error types for the lifecycle controller

use pivot_config::ConfigError;
use pivot_registry::{ComponentError, RegistryError};
use pivot_types::{InstanceName, InstanceState};
use thiserror::Error;

/// Lifecycle controller error type
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// State machine violation
    #[error("Invalid transition for {name}: cannot {attempted} while {from}")]
    InvalidTransition {
        name: InstanceName,
        from: InstanceState,
        attempted: &'static str,
    },

    /// A replace is already in flight for this name
    #[error("Instance busy, replace in progress: {0}")]
    Busy(InstanceName),

    /// The staged replacement failed verification; the existing instance
    /// remains live and untouched
    #[error("Replacement of {name} rejected ({reason}); existing instance remains live")]
    ReplacementRejected { name: InstanceName, reason: String },

    /// A component's own start/stop raised an error
    #[error("Component operation failed for {name}: {source}")]
    Component {
        name: InstanceName,
        source: ComponentError,
    },

    /// Registry subsystem error (unknown type/instance, duplicates,
    /// construction failures)
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration source error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;
