//! Configuration error types

use thiserror::Error;

/// Configuration source errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {file}: {message}")]
    Parse { file: String, message: String },
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
