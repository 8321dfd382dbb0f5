//! Instance table
//!
//! The [`InstanceTable`] is the authoritative mapping of instance name to
//! live instance. The table's structural lock covers insert/remove/swap and
//! listing only; it is never held across construction or probe calls. Each
//! entry carries its own transition lock, which serializes lifecycle
//! operations for that name while leaving other names free to proceed.

use crate::component::{Component, ComponentType};
use crate::error::{RegistryError, Result};
use pivot_types::{InstanceName, InstanceRecord, InstanceState};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, TryLockError};

/// One live instance: record, component object, and its type's capabilities
///
/// The component object is fixed for the lifetime of the entry; a replace
/// installs a whole new entry rather than mutating this one.
pub struct InstanceEntry {
    transition_lock: Arc<Mutex<()>>,
    record: RwLock<InstanceRecord>,
    component: Box<dyn Component>,
    ty: Arc<ComponentType>,
}

impl std::fmt::Debug for InstanceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceEntry")
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

impl InstanceEntry {
    pub fn new(record: InstanceRecord, component: Box<dyn Component>, ty: Arc<ComponentType>) -> Self {
        Self {
            transition_lock: Arc::new(Mutex::new(())),
            record: RwLock::new(record),
            component,
            ty,
        }
    }

    /// Acquire the per-name transition lock, waiting for the current holder
    ///
    /// The lock is held across the full duration of
    /// start/stop/replace/delete, including any construction or probe work
    /// those operations perform.
    pub async fn lock_transition(&self) -> OwnedMutexGuard<()> {
        self.transition_lock.clone().lock_owned().await
    }

    /// Acquire the per-name transition lock without waiting
    ///
    /// The replace protocol uses this: a second replace on a busy name must
    /// fail immediately rather than queue.
    pub fn try_lock_transition(&self) -> std::result::Result<OwnedMutexGuard<()>, TryLockError> {
        self.transition_lock.clone().try_lock_owned()
    }

    /// The mutable record behind its own short-lived lock
    pub fn record(&self) -> &RwLock<InstanceRecord> {
        &self.record
    }

    /// Snapshot of the record
    pub async fn snapshot(&self) -> InstanceRecord {
        self.record.read().await.clone()
    }

    /// Current lifecycle state
    pub async fn state(&self) -> InstanceState {
        self.record.read().await.state
    }

    pub fn component(&self) -> &dyn Component {
        self.component.as_ref()
    }

    pub fn component_type(&self) -> &Arc<ComponentType> {
        &self.ty
    }
}

/// Authoritative name -> instance mapping
#[derive(Default)]
pub struct InstanceTable {
    entries: RwLock<HashMap<InstanceName, Arc<InstanceEntry>>>,
}

impl InstanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry; fails if the name is already live
    pub async fn insert(&self, entry: Arc<InstanceEntry>) -> Result<()> {
        let name = entry.record().read().await.name.clone();
        let mut entries = self.entries.write().await;

        if entries.contains_key(&name) {
            return Err(RegistryError::InstanceAlreadyExists(name));
        }
        entries.insert(name, entry);
        Ok(())
    }

    /// Look up the entry currently live under a name
    pub async fn get(&self, name: &InstanceName) -> Option<Arc<InstanceEntry>> {
        self.entries.read().await.get(name).cloned()
    }

    /// Like [`get`](Self::get), erroring when the name is unknown
    pub async fn get_required(&self, name: &InstanceName) -> Result<Arc<InstanceEntry>> {
        self.get(name)
            .await
            .ok_or_else(|| RegistryError::InstanceNotFound(name.clone()))
    }

    /// Whether `entry` is still the live entry for `name`
    ///
    /// Mutating operations revalidate after acquiring the transition lock:
    /// the entry they resolved may have been deleted or swapped out while
    /// they waited.
    pub async fn is_current(&self, name: &InstanceName, entry: &Arc<InstanceEntry>) -> bool {
        match self.entries.read().await.get(name) {
            Some(current) => Arc::ptr_eq(current, entry),
            None => false,
        }
    }

    /// Remove the entry for `name` if it is still `expected`
    ///
    /// Returns the removed entry, or `InstanceNotFound` when the name is
    /// absent or already superseded.
    pub async fn remove(
        &self,
        name: &InstanceName,
        expected: &Arc<InstanceEntry>,
    ) -> Result<Arc<InstanceEntry>> {
        let mut entries = self.entries.write().await;
        match entries.remove(name) {
            Some(current) if Arc::ptr_eq(&current, expected) => Ok(current),
            Some(current) => {
                // Superseded while the caller waited; put it back.
                entries.insert(name.clone(), current);
                Err(RegistryError::InstanceNotFound(name.clone()))
            }
            None => Err(RegistryError::InstanceNotFound(name.clone())),
        }
    }

    /// Atomically replace the entry for `name`, returning the old entry
    ///
    /// This is the commit point of the replace protocol: a single slot
    /// assignment under the structural write lock. Readers observe either
    /// the old entry or the new one, never an intermediate state.
    pub async fn swap(
        &self,
        name: &InstanceName,
        replacement: Arc<InstanceEntry>,
    ) -> Result<Arc<InstanceEntry>> {
        let mut entries = self.entries.write().await;
        match entries.insert(name.clone(), replacement) {
            Some(old) => Ok(old),
            None => {
                // Name was deleted out from under the replace; undo.
                entries.remove(name);
                Err(RegistryError::InstanceNotFound(name.clone()))
            }
        }
    }

    /// Consistent snapshot of all entries
    pub async fn list(&self) -> Vec<Arc<InstanceEntry>> {
        self.entries.read().await.values().cloned().collect()
    }

    /// Number of live instances
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Whether any live instance references the given type
    pub async fn references_type(&self, type_name: &pivot_types::TypeName) -> bool {
        let entries = self.entries.read().await;
        for entry in entries.values() {
            if entry.record().read().await.type_name == *type_name {
                return true;
            }
        }
        false
    }
}
