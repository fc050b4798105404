//! # Pluguin Storage
//!
//! Filesystem access ([`StorageProvider`], [`LocalStorageProvider`]), the
//! named key-value records that hold persisted host state ([`OptionStore`])
//! and the configuration repository loaded at bootstrap ([`ConfigRepository`]).
pub mod config;
pub mod error;
pub mod local;
pub mod options;
pub mod provider;

/// Re-export key types
pub use config::{ConfigFormat, ConfigRepository};
pub use local::LocalStorageProvider;
pub use options::{FileOptionStore, MemoryOptionStore, OptionStore, OptionStoreExt};
pub use provider::StorageProvider;
