//! Event types for Pivot observability
//!
//! Events provide a unified stream of lifecycle activity. Subsystems emit
//! them on `tokio::sync::broadcast` channels; having no subscribers is fine.

use crate::ids::{InstanceName, TypeName};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all Pivot events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotEventEnvelope {
    /// Unique event ID
    pub id: Uuid,

    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Event source
    pub source: EventSource,

    /// Event severity
    pub severity: EventSeverity,

    /// The actual event
    pub event: PivotEvent,
}

/// Event sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    /// Lifecycle controller
    Lifecycle,
    /// Type registry
    Registry,
    /// Health aggregation
    Health,
    /// Condition monitoring
    Monitor,
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

/// Pivot events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PivotEvent {
    /// Component type registered
    TypeRegistered { type_name: TypeName },

    /// Component type unregistered
    TypeUnregistered { type_name: TypeName },

    /// Instance created
    InstanceCreated {
        name: InstanceName,
        type_name: TypeName,
    },

    /// Instance started
    InstanceStarted { name: InstanceName },

    /// Instance stopped
    InstanceStopped { name: InstanceName },

    /// Instance moved to the failed state
    InstanceFailed { name: InstanceName, reason: String },

    /// Instance deleted
    InstanceDeleted { name: InstanceName },

    /// Replace entered staging for a name
    ReplaceStarted { name: InstanceName },

    /// Replace committed; the new instance is live under the name
    ReplaceCompleted {
        name: InstanceName,
        type_name: TypeName,
    },

    /// Replace rejected; the old instance remains live
    ReplaceRejected { name: InstanceName, reason: String },

    /// Probed health flipped for an instance
    HealthChanged {
        name: InstanceName,
        healthy: bool,
    },
}

impl PivotEventEnvelope {
    /// Create a new event envelope
    pub fn new(event: PivotEvent, source: EventSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            source,
            severity: Self::infer_severity(&event),
            event,
        }
    }

    /// Infer severity from event type
    fn infer_severity(event: &PivotEvent) -> EventSeverity {
        match event {
            PivotEvent::InstanceFailed { .. } => EventSeverity::Error,

            PivotEvent::ReplaceRejected { .. }
            | PivotEvent::HealthChanged { healthy: false, .. } => EventSeverity::Warning,

            _ => EventSeverity::Info,
        }
    }
}
