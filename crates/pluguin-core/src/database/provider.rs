use std::rc::Rc;

use crate::database::migrator::Migrator;
use crate::database::repository::{MigrationRepository, OptionMigrationRepository};
use crate::kernel::bootstrap::Kernel;
use crate::kernel::constants;
use crate::kernel::error::Result;
use crate::kernel::provider::ServiceProvider;

/// Offers `migrator` and `migration.repository`, loaded on first use.
#[derive(Debug, Default)]
pub struct MigrationServiceProvider;

impl MigrationServiceProvider {
    pub const PROVIDES: [&'static str; 2] = ["migrator", "migration.repository"];

    fn register_repository(&self, kernel: &Kernel) {
        kernel.singleton("migration.repository", |kernel: &Kernel| {
            let table = match kernel.config() {
                Ok(config) => config.get::<String>("database.migrations"),
                Err(_) => None,
            }
            .unwrap_or_else(|| constants::DEFAULT_MIGRATIONS_OPTION.to_string());
            let repository: Rc<dyn MigrationRepository> =
                Rc::new(OptionMigrationRepository::new(kernel.options()?, table));
            Ok(repository)
        });
    }

    fn register_migrator(&self, kernel: &Kernel) {
        kernel.singleton("migrator", |kernel: &Kernel| {
            let repository = kernel.make_as::<Rc<dyn MigrationRepository>>("migration.repository")?;
            Ok(Migrator::new((*repository).clone()))
        });
    }
}

impl ServiceProvider for MigrationServiceProvider {
    fn register(&self, kernel: &Kernel) -> Result<()> {
        self.register_repository(kernel);
        self.register_migrator(kernel);
        Ok(())
    }

    fn is_deferred(&self) -> bool {
        true
    }

    fn provides(&self) -> Vec<String> {
        Self::PROVIDES.iter().map(|s| s.to_string()).collect()
    }
}
