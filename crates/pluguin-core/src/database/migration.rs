use crate::kernel::bootstrap::Kernel;
use crate::kernel::error::Result;

/// A reversible schema change.
///
/// Migrations resolve whatever schema service they act on from the kernel.
/// Names must be unique within a plugin; they are what the repository records.
pub trait Migration {
    fn name(&self) -> &str;

    fn up(&self, kernel: &Kernel) -> Result<()>;

    fn down(&self, kernel: &Kernel) -> Result<()>;
}
