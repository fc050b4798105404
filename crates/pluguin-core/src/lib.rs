pub mod database;
pub mod kernel;
pub mod plugin_system;
pub mod storage;

// Re-export key public types/traits for host and dependent plugins
pub use kernel::Kernel;
pub use kernel::error::Error as KernelError;
pub use kernel::provider::{ProviderClass, ServiceProvider};
pub use plugin_system::{Host, Plugin};
pub use storage::{OptionStore, StorageProvider};
pub use database::{Migration, Migrator};

#[cfg(test)]
mod tests;
