//! Lifecycle controller
//!
//! The controller owns the type registry and instance table and is the only
//! writer of instance state. It is an explicitly constructed object handed
//! to callers by reference; there is no ambient global registry.

use crate::error::{LifecycleError, Result};
use pivot_config::ConfigSource;
use pivot_registry::{ComponentType, InstanceEntry, InstanceTable, RegistryError, TypeRegistry};
use pivot_types::{
    EventSource, InstanceName, InstanceRecord, InstanceState, PivotEvent, PivotEventEnvelope,
    TypeName,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

/// Channel capacity for lifecycle events
const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// Unified entry point for component lifecycle operations
pub struct LifecycleController {
    /// Registered component types
    types: Arc<TypeRegistry>,

    /// Live instances
    table: Arc<InstanceTable>,

    /// Optional configuration source consulted on create/replace
    config_source: Option<Arc<dyn ConfigSource>>,

    /// Event channel
    event_tx: broadcast::Sender<PivotEventEnvelope>,
}

impl LifecycleController {
    /// Create a controller with no configuration source
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            types: Arc::new(TypeRegistry::new()),
            table: Arc::new(InstanceTable::new()),
            config_source: None,
            event_tx,
        }
    }

    /// Attach a configuration source
    ///
    /// `create` and `replace` consult it when the caller supplies no
    /// explicit config blob.
    pub fn with_config_source(mut self, source: Arc<dyn ConfigSource>) -> Self {
        self.config_source = Some(source);
        self
    }

    /// Shared handle to the instance table (for the health aggregator)
    pub fn instance_table(&self) -> Arc<InstanceTable> {
        self.table.clone()
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<PivotEventEnvelope> {
        self.event_tx.subscribe()
    }

    // ========== Type Operations ==========

    /// Register a new component type
    #[instrument(skip(self, definition), fields(type_name = %definition.name()))]
    pub async fn register_type(&self, definition: ComponentType) -> Result<()> {
        let type_name = definition.name().clone();
        self.types.register(definition).await?;

        self.emit(PivotEvent::TypeRegistered {
            type_name: type_name.clone(),
        });
        info!(type_name = %type_name, "Component type registered");
        Ok(())
    }

    /// Unregister a component type
    ///
    /// Refused with `TypeInUse` while any live instance references the
    /// type.
    #[instrument(skip(self), fields(type_name = %type_name))]
    pub async fn unregister_type(&self, type_name: &TypeName) -> Result<()> {
        if self.table.references_type(type_name).await {
            return Err(RegistryError::TypeInUse(type_name.clone()).into());
        }
        self.types.unregister(type_name).await?;

        self.emit(PivotEvent::TypeUnregistered {
            type_name: type_name.clone(),
        });
        info!(type_name = %type_name, "Component type unregistered");
        Ok(())
    }

    /// List registered type names in registration order
    pub async fn list_types(&self) -> Vec<TypeName> {
        self.types.list().await
    }

    // ========== Instance Operations ==========

    /// Create a new instance of a registered type
    ///
    /// The new instance starts in `Created`. When no config blob is given,
    /// the attached configuration source is consulted; an empty object is
    /// used as the final fallback.
    #[instrument(skip(self, config), fields(name = %name, type_name = %type_name))]
    pub async fn create(
        &self,
        name: InstanceName,
        type_name: TypeName,
        config: Option<serde_json::Value>,
    ) -> Result<InstanceRecord> {
        // 1. Resolve the type before doing any work
        let ty = self.types.resolve(&type_name).await?;

        // 2. Fail duplicate names before paying for construction; the
        //    insert below re-checks under the structural lock
        if self.table.get(&name).await.is_some() {
            return Err(RegistryError::InstanceAlreadyExists(name).into());
        }

        // 3. Resolve config: explicit > configuration source > empty object
        let config = self.resolve_config(&type_name, config).await?;

        // 4. Construct outside all locks
        let component = self.types.construct(&type_name, &config).await?;

        // 5. Publish the entry
        let record = InstanceRecord::new(name.clone(), type_name.clone(), config);
        let entry = Arc::new(InstanceEntry::new(record.clone(), component, ty));
        self.table.insert(entry).await?;

        self.emit(PivotEvent::InstanceCreated {
            name: name.clone(),
            type_name: type_name.clone(),
        });
        info!(name = %name, type_name = %type_name, "Instance created");

        Ok(record)
    }

    /// Start an instance
    ///
    /// Valid from `Created` and `Stopped`. A component start failure moves
    /// the instance to `Failed`.
    #[instrument(skip(self), fields(name = %name))]
    pub async fn start(&self, name: &InstanceName) -> Result<()> {
        let (entry, _guard) = self.lock_for_operation(name).await?;

        let from = entry.state().await;
        if !from.startable() {
            return Err(LifecycleError::InvalidTransition {
                name: name.clone(),
                from,
                attempted: "start",
            });
        }

        if let Err(source) = entry.component().start().await {
            self.fail_instance(&entry, name, &source.to_string()).await;
            return Err(LifecycleError::Component {
                name: name.clone(),
                source,
            });
        }

        entry.record().write().await.transition(InstanceState::Running);
        self.emit(PivotEvent::InstanceStarted { name: name.clone() });
        info!(name = %name, "Instance started");
        Ok(())
    }

    /// Stop a running instance
    ///
    /// Valid from `Running` only. A component stop failure moves the
    /// instance to `Failed`.
    #[instrument(skip(self), fields(name = %name))]
    pub async fn stop(&self, name: &InstanceName) -> Result<()> {
        let (entry, _guard) = self.lock_for_operation(name).await?;

        let from = entry.state().await;
        if !from.is_running() {
            return Err(LifecycleError::InvalidTransition {
                name: name.clone(),
                from,
                attempted: "stop",
            });
        }

        if let Err(source) = entry.component().stop().await {
            self.fail_instance(&entry, name, &source.to_string()).await;
            return Err(LifecycleError::Component {
                name: name.clone(),
                source,
            });
        }

        entry.record().write().await.transition(InstanceState::Stopped);
        self.emit(PivotEvent::InstanceStopped { name: name.clone() });
        info!(name = %name, "Instance stopped");
        Ok(())
    }

    /// Delete an instance
    ///
    /// Valid from any state except `Replacing`. A running component is
    /// stopped first; a stop failure is logged and removal proceeds, since
    /// `delete` is the documented way out of `Failed`.
    #[instrument(skip(self), fields(name = %name))]
    pub async fn delete(&self, name: &InstanceName) -> Result<()> {
        let (entry, _guard) = self.lock_for_operation(name).await?;

        if entry.state().await.is_running() {
            if let Err(e) = entry.component().stop().await {
                warn!(name = %name, error = %e, "Stop during delete failed; removing anyway");
            }
        }

        self.table.remove(name, &entry).await?;

        self.emit(PivotEvent::InstanceDeleted { name: name.clone() });
        info!(name = %name, "Instance deleted");
        Ok(())
    }

    /// Get the record of one instance
    pub async fn get(&self, name: &InstanceName) -> Result<InstanceRecord> {
        let entry = self.table.get_required(name).await?;
        Ok(entry.snapshot().await)
    }

    /// Records of all live instances
    pub async fn list(&self) -> Vec<InstanceRecord> {
        let mut records = Vec::new();
        for entry in self.table.list().await {
            records.push(entry.snapshot().await);
        }
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// Shut the registry down: stop every running instance
    ///
    /// Takes each instance's transition lock in turn, so in-flight replaces
    /// drain before their instance is stopped.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        info!("Lifecycle controller shutting down");

        for entry in self.table.list().await {
            let _guard = entry.lock_transition().await;
            let record = entry.snapshot().await;

            if !self.table.is_current(&record.name, &entry).await {
                continue;
            }
            if !record.state.is_running() {
                continue;
            }

            if let Err(e) = entry.component().stop().await {
                warn!(name = %record.name, error = %e, "Stop during shutdown failed");
                entry.record().write().await.transition(InstanceState::Failed);
                continue;
            }
            entry.record().write().await.transition(InstanceState::Stopped);
            self.emit(PivotEvent::InstanceStopped {
                name: record.name.clone(),
            });
        }
    }

    // ========== Internal ==========

    /// Resolve the effective config blob for a type
    pub(crate) async fn resolve_config(
        &self,
        type_name: &TypeName,
        explicit: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        if let Some(config) = explicit {
            return Ok(config);
        }
        if let Some(source) = &self.config_source {
            if let Some(config) = source.load(type_name).await? {
                return Ok(config);
            }
        }
        Ok(serde_json::Value::Object(serde_json::Map::new()))
    }

    /// Resolve an entry and acquire its transition lock for a mutating
    /// operation
    ///
    /// Fails `Busy` when the instance is mid-replace: the overlay state is
    /// checked before blocking on the lock (a replace holds it for its full
    /// duration) and the entry is revalidated afterwards in case it was
    /// deleted or swapped while this caller waited.
    async fn lock_for_operation(
        &self,
        name: &InstanceName,
    ) -> Result<(Arc<InstanceEntry>, tokio::sync::OwnedMutexGuard<()>)> {
        loop {
            let entry = self.table.get_required(name).await?;

            if entry.state().await.is_replacing() {
                return Err(LifecycleError::Busy(name.clone()));
            }

            let guard = entry.lock_transition().await;

            // The entry may have been deleted or swapped while this caller
            // waited; re-resolve and try again against the live entry.
            if !self.table.is_current(name, &entry).await {
                continue;
            }
            if entry.state().await.is_replacing() {
                return Err(LifecycleError::Busy(name.clone()));
            }

            return Ok((entry, guard));
        }
    }

    /// Mark an instance failed and emit the event
    async fn fail_instance(&self, entry: &Arc<InstanceEntry>, name: &InstanceName, reason: &str) {
        entry.record().write().await.transition(InstanceState::Failed);
        self.emit(PivotEvent::InstanceFailed {
            name: name.clone(),
            reason: reason.to_string(),
        });
        warn!(name = %name, reason = %reason, "Instance failed");
    }

    pub(crate) fn emit(&self, event: PivotEvent) {
        let envelope = PivotEventEnvelope::new(event, EventSource::Lifecycle);
        let _ = self.event_tx.send(envelope);
    }

    pub(crate) fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    pub(crate) fn config_source(&self) -> Option<&Arc<dyn ConfigSource>> {
        self.config_source.as_ref()
    }

    pub(crate) fn table(&self) -> &Arc<InstanceTable> {
        &self.table
    }
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self::new()
    }
}
