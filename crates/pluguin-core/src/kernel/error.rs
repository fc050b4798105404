//! # Pluguin Kernel Errors
//!
//! Defines [`Error`], the enum every fallible operation in the crate returns,
//! and [`ContainerError`] for service resolution failures. Subsystem errors
//! (storage, plugin system, migrations) fold into [`Error`] through `#[from]`.
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::database::error::MigrationError;
use crate::plugin_system::error::PluginSystemError;
use crate::storage::error::StorageSystemError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Service registry failure
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// Specific, typed plugin system error
    #[error("Plugin system error: {0}")]
    PluginSystem(#[from] PluginSystemError),

    /// Specific, typed storage system error
    #[error("Storage system error: {0}")]
    StorageSystem(#[from] StorageSystemError),

    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    /// The provider manifest directory is missing or not writable.
    #[error("The {} directory must be present and writable.", path.display())]
    ManifestWrite { path: PathBuf },

    /// Error occurring during a specific kernel lifecycle phase.
    #[error("Kernel lifecycle error during {phase}: {message}")]
    KernelLifecycleError {
        phase: KernelLifecyclePhase,
        component_name: Option<String>,
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Represents a specific phase in the kernel's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum KernelLifecyclePhase {
    #[error("Bootstrap")]
    Bootstrap,
    #[error("Boot")]
    Boot,
}

#[derive(Debug, ThisError)]
pub enum ContainerError {
    /// No binding, instance, alias target or deferred provider matches the key.
    #[error("Target [{key}] is not bound and cannot be resolved")]
    UnresolvableBinding { key: String },

    #[error("Service [{key}] does not hold a value of type {expected}")]
    ServiceTypeMismatch { key: String, expected: &'static str },

    #[error("Circular dependency while resolving [{key}]: {}", chain.join(" -> "))]
    CircularDependency { key: String, chain: Vec<String> },

    #[error("[{key}] is aliased to itself")]
    AliasToItself { key: String },
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl Error {
    /// Wrap an I/O failure with the operation and path it happened on.
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        Error::StorageSystem(StorageSystemError::io(source, operation, path))
    }
}
