//! In-memory configuration source
//!
//! Suitable for tests and demos; production hosts use [`FileConfigSource`]
//! or their own backend behind the same trait.
//!
//! [`FileConfigSource`]: crate::file::FileConfigSource

use crate::error::Result;
use crate::source::ConfigSource;
use async_trait::async_trait;
use pivot_types::TypeName;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory configuration source
#[derive(Default)]
pub struct MemoryConfigSource {
    blobs: RwLock<HashMap<TypeName, serde_json::Value>>,
}

impl MemoryConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the blob for a component type
    pub async fn set(&self, type_name: impl Into<TypeName>, blob: serde_json::Value) {
        self.blobs.write().await.insert(type_name.into(), blob);
    }

    /// Remove the blob for a component type
    pub async fn remove(&self, type_name: &TypeName) {
        self.blobs.write().await.remove(type_name);
    }
}

#[async_trait]
impl ConfigSource for MemoryConfigSource {
    async fn load(&self, type_name: &TypeName) -> Result<Option<serde_json::Value>> {
        Ok(self.blobs.read().await.get(type_name).cloned())
    }

    async fn reload(&self) -> Result<()> {
        // Nothing cached outside the map itself.
        Ok(())
    }
}
