//! # Pluguin Kernel
//!
//! The `kernel` module is the per-plugin runtime: a service container with
//! deferred providers, a boot state machine and termination callbacks.
//!
//! ## Key Responsibilities & Components:
//!
//! - **Service registry**: [`Container`](container::Container) stores bindings,
//!   shared instances, aliases and extenders.
//! - **Providers**: the [`ServiceProvider`](provider::ServiceProvider) trait and
//!   [`ProviderClass`](provider::ProviderClass) constructors for lazy loading.
//! - **Deferred services**: [`DeferredServices`](deferred::DeferredServices)
//!   maps service names to the provider able to satisfy them.
//! - **Orchestration**: [`Kernel`](bootstrap::Kernel) drives registration, boot,
//!   deferred resolution and termination; [`Bootstrapper`](bootstrappers::Bootstrapper)s
//!   run the startup sequence and [`ProviderRepository`](manifest::ProviderRepository)
//!   caches which providers are eager and which are deferred.
//! - **Error Handling**: [`Error`](error::Error) and the `Result` alias.
pub mod bootstrap;
pub mod bootstrappers;
pub mod constants;
pub mod container;
pub mod deferred;
pub mod error;
pub mod manifest;
pub mod paths;
pub mod provider;

pub use bootstrap::{Kernel, KernelState};
pub use bootstrappers::{Bootstrapper, BootProviders, LoadConfiguration, RegisterProviders};
pub use container::{Container, Parameters, Service};
pub use deferred::DeferredServices;
pub use error::{ContainerError, Error, Result};
pub use manifest::{ProviderManifest, ProviderRepository};
pub use provider::{ProviderClass, ServiceProvider};

// Test module declaration
#[cfg(test)]
mod tests;
