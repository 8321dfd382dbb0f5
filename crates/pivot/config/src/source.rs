//! Configuration source trait

use crate::error::Result;
use async_trait::async_trait;
use pivot_types::TypeName;

/// Supplier of per-component-type configuration blobs
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Fetch the current blob for a component type, if one is configured
    async fn load(&self, type_name: &TypeName) -> Result<Option<serde_json::Value>>;

    /// Refresh all cached blobs from the backing store
    ///
    /// The registry applies refreshed configuration on the next
    /// `create`/`replace`; calling this never disturbs running instances.
    async fn reload(&self) -> Result<()>;
}
