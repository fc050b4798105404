//! # Pluguin Database
//!
//! Versioned schema migrations for dependent plugins. A [`Migrator`] runs
//! [`Migration`]s in batches and records what ran in a
//! [`MigrationRepository`]; the default repository keeps that record in the
//! host's option store. Both are offered lazily by the deferred
//! [`MigrationServiceProvider`] as the `migrator` and `migration.repository`
//! services.
pub mod error;
pub mod migration;
pub mod migrator;
pub mod provider;
pub mod repository;

pub use error::MigrationError;
pub use migration::Migration;
pub use migrator::{MigrationStatus, Migrator};
pub use provider::MigrationServiceProvider;
pub use repository::{MigrationRecord, MigrationRepository, OptionMigrationRepository};
