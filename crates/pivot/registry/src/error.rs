//! Registry error types

use crate::component::ComponentError;
use pivot_types::{InstanceName, TypeName};
use thiserror::Error;

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Component type not found: {0}")]
    TypeNotFound(TypeName),

    #[error("Component type already exists: {0}")]
    TypeAlreadyExists(TypeName),

    #[error("Component type still in use by live instances: {0}")]
    TypeInUse(TypeName),

    #[error("Instance not found: {0}")]
    InstanceNotFound(InstanceName),

    #[error("Instance already exists: {0}")]
    InstanceAlreadyExists(InstanceName),

    #[error("Construction of {type_name} failed: {source}")]
    Construction {
        type_name: TypeName,
        source: ComponentError,
    },
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
