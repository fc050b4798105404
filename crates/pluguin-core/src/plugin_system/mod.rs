//! # Pluguin Plugin System
//!
//! The host side of the framework: dependent plugins implement [`Plugin`]
//! and are registered with the [`Host`], which gives each of them a
//! [`Kernel`](crate::kernel::Kernel), shares its filesystem and option store,
//! and tracks the installed version of every plugin in a persisted
//! [`InstalledPlugins`] record to decide between install, upgrade and
//! downgrade hooks.
//!
//! - **[`traits`]**: the [`Plugin`] trait and its lifecycle hooks.
//! - **[`registry`]**: the installed-plugins record.
//! - **[`hook`]**: activation / deactivation / uninstall hook names.
//! - **[`host`]**: the [`Host`] orchestrating registration and dispatch.
//! - **[`error`]**: [`PluginSystemError`](error::PluginSystemError).
pub mod error;
pub mod hook;
pub mod host;
pub mod registry;
pub mod traits;

pub use hook::LifecycleHook;
pub use host::Host;
pub use registry::{InstalledPlugin, InstalledPlugins, VersionChange};
pub use traits::Plugin;
