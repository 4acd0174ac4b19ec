//! Runtime error types.

use herald_core::{BoxError, ConfigSourceError, RegistryError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading or validating the configuration failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Command registration failed.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Reloading the configuration failed; the previous one stays active.
    #[error(transparent)]
    Reload(#[from] ConfigSourceError),

    /// Pushing the command manifests to the platform failed.
    #[error("Failed to register application commands - {0}")]
    Publish(#[source] BoxError),

    /// A shutdown signal handler could not be installed.
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
