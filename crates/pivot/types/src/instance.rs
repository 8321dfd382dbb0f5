//! Instance types for component instances
//!
//! An [`InstanceRecord`] is the authoritative record of one live component
//! instance, owned exclusively by the instance table and mutated only by
//! lifecycle operations.

use crate::health::HealthReport;
use crate::ids::{InstanceName, TypeName};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a component instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceState {
    /// Constructed but not yet started
    Created,

    /// Started and serving
    Running,

    /// Stopped after running; may be started again
    Stopped,

    /// An operation reported an unrecoverable error; only `delete` or
    /// `replace` clears this state
    Failed,

    /// A replace is in flight for this name; exclusive transient overlay
    Replacing,
}

impl InstanceState {
    /// Whether `start` is valid from this state
    pub fn startable(&self) -> bool {
        matches!(self, InstanceState::Created | InstanceState::Stopped)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, InstanceState::Running)
    }

    pub fn is_replacing(&self) -> bool {
        matches!(self, InstanceState::Replacing)
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceState::Created => write!(f, "created"),
            InstanceState::Running => write!(f, "running"),
            InstanceState::Stopped => write!(f, "stopped"),
            InstanceState::Failed => write!(f, "failed"),
            InstanceState::Replacing => write!(f, "replacing"),
        }
    }
}

/// Authoritative record of a component instance
///
/// The component type is referenced by name; the record never owns the type
/// definition. Clones of this record are handed out by `get`/`list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Instance name, unique within the table
    pub name: InstanceName,

    /// Name of the component type this instance was made from
    pub type_name: TypeName,

    /// Configuration blob the instance was constructed with
    pub config: serde_json::Value,

    /// Current lifecycle state
    pub state: InstanceState,

    /// Creation timestamp; a successful replace produces a record with a
    /// fresh `created_at`
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Timestamp of the last state transition
    pub last_transition_at: chrono::DateTime<chrono::Utc>,

    /// Cached result of the most recent probe, if any
    pub last_health: Option<HealthReport>,
}

impl InstanceRecord {
    /// Create a fresh record in `Created` state
    pub fn new(name: InstanceName, type_name: TypeName, config: serde_json::Value) -> Self {
        let now = chrono::Utc::now();
        Self {
            name,
            type_name,
            config,
            state: InstanceState::Created,
            created_at: now,
            last_transition_at: now,
            last_health: None,
        }
    }

    /// Move to a new state, stamping the transition time
    pub fn transition(&mut self, state: InstanceState) {
        self.state = state;
        self.last_transition_at = chrono::Utc::now();
    }
}
