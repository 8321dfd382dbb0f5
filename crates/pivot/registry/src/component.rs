//! Component capability traits
//!
//! A component type is a capability set: a constructor, start/stop behavior,
//! and an optional health probe. Behavior is selected through the type
//! registry, never through runtime type inspection of the instance table.

use pivot_types::{HealthReport, TypeName};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Error raised by component implementations
///
/// Constructors, `start`/`stop`, and probes are host-supplied code; their
/// failures are carried as messages and wrapped into the typed errors of the
/// owning subsystem.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ComponentError {
    message: String,
}

impl ComponentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A live component instance
///
/// Implementations hold their own state behind interior mutability; `start`
/// and `stop` may block on external work. Instances never rename or
/// re-register themselves - the instance table owns identity.
#[async_trait]
pub trait Component: Send + Sync {
    /// Bring the component into service
    async fn start(&self) -> Result<(), ComponentError>;

    /// Take the component out of service
    async fn stop(&self) -> Result<(), ComponentError>;

    /// Access the concrete type, for the type's own probe
    fn as_any(&self) -> &dyn Any;
}

/// Constructor capability for a component type
///
/// `construct` must not leave partial global state behind on failure; the
/// caller discards whatever the factory returned.
#[async_trait]
pub trait ComponentFactory: Send + Sync {
    /// Produce a fresh instance from a configuration blob
    ///
    /// Factories validate their config with deny-unknown-fields serde
    /// structs and reject unknown fields explicitly.
    async fn construct(
        &self,
        config: &serde_json::Value,
    ) -> Result<Box<dyn Component>, ComponentError>;
}

/// Health probe capability for a component type
///
/// Routine unhealthiness is reported via `HealthReport { healthy: false }`;
/// a returned error means the probe itself broke and is captured by the
/// health aggregator rather than propagated.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Probe one instance of this type
    async fn probe(&self, component: &dyn Component) -> Result<HealthReport, ComponentError>;
}

/// A registered component type: name + constructor + optional probe
///
/// Registered once, immutable thereafter. Instances reference the type they
/// were made from but never own it.
#[derive(Clone)]
pub struct ComponentType {
    name: TypeName,
    factory: Arc<dyn ComponentFactory>,
    probe: Option<Arc<dyn HealthProbe>>,
}

impl ComponentType {
    /// Define a type with a constructor and no probe
    pub fn new(name: impl Into<TypeName>, factory: Arc<dyn ComponentFactory>) -> Self {
        Self {
            name: name.into(),
            factory,
            probe: None,
        }
    }

    /// Attach a health probe
    pub fn with_probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    pub fn factory(&self) -> &Arc<dyn ComponentFactory> {
        &self.factory
    }

    pub fn probe(&self) -> Option<&Arc<dyn HealthProbe>> {
        self.probe.as_ref()
    }
}

impl fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component").finish_non_exhaustive()
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentType")
            .field("name", &self.name)
            .field("has_probe", &self.probe.is_some())
            .finish()
    }
}
