//! # Pluguin Migration Errors
use thiserror::Error;

use crate::kernel::error::Error as KernelError;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration '{migration}' failed while running {direction}: {source}")]
    Failed {
        migration: String,
        direction: &'static str,
        #[source]
        source: Box<KernelError>,
    },

    #[error("Migration name '{name}' is used more than once")]
    DuplicateName { name: String },
}
