//! Component type registry
//!
//! The registry is the closed set of component types known to the system.
//! Types are registered at startup (or through an explicit administrative
//! call) and are immutable once registered.

use crate::component::{Component, ComponentType};
use crate::error::{RegistryError, Result};
use pivot_types::TypeName;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Registry of component types
///
/// Listing preserves registration order. Removal of a type that still has
/// live instances is refused by the lifecycle controller before it reaches
/// this registry.
#[derive(Default)]
pub struct TypeRegistry {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    order: Vec<TypeName>,
    types: HashMap<TypeName, Arc<ComponentType>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new component type
    pub async fn register(&self, definition: ComponentType) -> Result<()> {
        let mut inner = self.inner.write().await;
        let name = definition.name().clone();

        if inner.types.contains_key(&name) {
            return Err(RegistryError::TypeAlreadyExists(name));
        }

        debug!(type_name = %name, "Component type registered");
        inner.order.push(name.clone());
        inner.types.insert(name, Arc::new(definition));
        Ok(())
    }

    /// Remove a component type
    pub async fn unregister(&self, name: &TypeName) -> Result<()> {
        let mut inner = self.inner.write().await;

        if inner.types.remove(name).is_none() {
            return Err(RegistryError::TypeNotFound(name.clone()));
        }
        inner.order.retain(|n| n != name);

        debug!(type_name = %name, "Component type unregistered");
        Ok(())
    }

    /// Look up a type by name
    pub async fn resolve(&self, name: &TypeName) -> Result<Arc<ComponentType>> {
        self.inner
            .read()
            .await
            .types
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::TypeNotFound(name.clone()))
    }

    /// Whether a type is registered
    pub async fn contains(&self, name: &TypeName) -> bool {
        self.inner.read().await.types.contains_key(name)
    }

    /// List registered type names, in registration order
    pub async fn list(&self) -> Vec<TypeName> {
        self.inner.read().await.order.clone()
    }

    /// Construct a fresh instance of a type
    ///
    /// Factory failures are wrapped as [`RegistryError::Construction`]; the
    /// registry itself holds no lock across the factory call, so a failed
    /// construction cannot leave partial state behind.
    pub async fn construct(
        &self,
        name: &TypeName,
        config: &serde_json::Value,
    ) -> Result<Box<dyn Component>> {
        let ty = self.resolve(name).await?;
        ty.factory()
            .construct(config)
            .await
            .map_err(|source| RegistryError::Construction {
                type_name: name.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentError, ComponentFactory};
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::any::Any;

    struct NullComponent;

    #[async_trait]
    impl Component for NullComponent {
        async fn start(&self) -> std::result::Result<(), ComponentError> {
            Ok(())
        }

        async fn stop(&self) -> std::result::Result<(), ComponentError> {
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct NullFactory;

    #[async_trait]
    impl ComponentFactory for NullFactory {
        async fn construct(
            &self,
            _config: &serde_json::Value,
        ) -> std::result::Result<Box<dyn Component>, ComponentError> {
            Ok(Box::new(NullComponent))
        }
    }

    /// Factory with a strict config schema, for validation tests
    struct StrictFactory;

    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct StrictConfig {
        #[allow(dead_code)]
        gain: Option<f64>,
    }

    #[async_trait]
    impl ComponentFactory for StrictFactory {
        async fn construct(
            &self,
            config: &serde_json::Value,
        ) -> std::result::Result<Box<dyn Component>, ComponentError> {
            let _parsed: StrictConfig = serde_json::from_value(config.clone())
                .map_err(|e| ComponentError::new(e.to_string()))?;
            Ok(Box::new(NullComponent))
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_fails() {
        let registry = TypeRegistry::new();
        registry
            .register(ComponentType::new("sensor", Arc::new(NullFactory)))
            .await
            .unwrap();

        let err = registry
            .register(ComponentType::new("sensor", Arc::new(NullFactory)))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::TypeAlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_list_preserves_registration_order() {
        let registry = TypeRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry
                .register(ComponentType::new(name, Arc::new(NullFactory)))
                .await
                .unwrap();
        }

        let names: Vec<_> = registry.list().await.iter().map(|n| n.as_str().to_string()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);

        registry.unregister(&TypeName::new("alpha")).await.unwrap();
        let names: Vec<_> = registry.list().await.iter().map(|n| n.as_str().to_string()).collect();
        assert_eq!(names, vec!["zeta", "mid"]);
    }

    #[tokio::test]
    async fn test_resolve_unknown_type() {
        let registry = TypeRegistry::new();
        let err = registry.resolve(&TypeName::new("ghost")).await.unwrap_err();
        assert!(matches!(err, RegistryError::TypeNotFound(_)));
    }

    #[tokio::test]
    async fn test_construct_rejects_unknown_fields() {
        let registry = TypeRegistry::new();
        registry
            .register(ComponentType::new("strict", Arc::new(StrictFactory)))
            .await
            .unwrap();

        let ok = registry
            .construct(&TypeName::new("strict"), &serde_json::json!({ "gain": 2.0 }))
            .await;
        assert!(ok.is_ok());

        let err = registry
            .construct(&TypeName::new("strict"), &serde_json::json!({ "bogus": 1 }))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Construction { .. }));
    }
}
