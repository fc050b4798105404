use std::collections::HashSet;
use std::rc::Rc;

use crate::database::error::MigrationError;
use crate::database::migration::Migration;
use crate::database::repository::MigrationRepository;
use crate::kernel::bootstrap::Kernel;
use crate::kernel::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub name: String,
    pub ran: bool,
}

/// Runs and reverts migrations, one batch per `run`.
#[derive(Debug, Clone)]
pub struct Migrator {
    repository: Rc<dyn MigrationRepository>,
}

impl Migrator {
    pub fn new(repository: Rc<dyn MigrationRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> Rc<dyn MigrationRepository> {
        self.repository.clone()
    }

    /// Run every migration that has not run yet, in the given order, as one
    /// new batch. Returns the names that ran.
    pub fn run(&self, kernel: &Kernel, migrations: &[Rc<dyn Migration>]) -> Result<Vec<String>> {
        Self::check_unique(migrations)?;
        self.repository.create_repository()?;

        let ran: HashSet<String> = self.repository.get_ran()?.into_iter().collect();
        let pending: Vec<&Rc<dyn Migration>> =
            migrations.iter().filter(|m| !ran.contains(m.name())).collect();

        if pending.is_empty() {
            log::info!("Nothing to migrate");
            return Ok(Vec::new());
        }

        let batch = self.repository.get_next_batch_number()?;
        let mut completed = Vec::with_capacity(pending.len());
        for migration in pending {
            log::info!("Migrating: {}", migration.name());
            migration.up(kernel).map_err(|e| Self::failed(migration.name(), "up", e))?;
            self.repository.log(migration.name(), batch)?;
            completed.push(migration.name().to_string());
        }
        Ok(completed)
    }

    /// Revert the most recent batch, newest first. Returns the names reverted.
    pub fn rollback(&self, kernel: &Kernel, migrations: &[Rc<dyn Migration>]) -> Result<Vec<String>> {
        if !self.repository.repository_exists()? {
            return Ok(Vec::new());
        }
        let last: Vec<String> = self
            .repository
            .get_last()?
            .into_iter()
            .map(|record| record.migration)
            .collect();
        self.revert(kernel, migrations, &last)
    }

    /// Revert every migration that ran, newest first.
    pub fn reset(&self, kernel: &Kernel, migrations: &[Rc<dyn Migration>]) -> Result<Vec<String>> {
        if !self.repository.repository_exists()? {
            return Ok(Vec::new());
        }
        let mut ran = self.repository.get_ran()?;
        ran.reverse();
        self.revert(kernel, migrations, &ran)
    }

    /// `(name, ran)` for every known migration, in the given order.
    pub fn status(&self, migrations: &[Rc<dyn Migration>]) -> Result<Vec<MigrationStatus>> {
        let ran: HashSet<String> = if self.repository.repository_exists()? {
            self.repository.get_ran()?.into_iter().collect()
        } else {
            HashSet::new()
        };
        Ok(migrations
            .iter()
            .map(|m| MigrationStatus {
                name: m.name().to_string(),
                ran: ran.contains(m.name()),
            })
            .collect())
    }

    fn revert(&self, kernel: &Kernel, migrations: &[Rc<dyn Migration>], names: &[String]) -> Result<Vec<String>> {
        let mut reverted = Vec::with_capacity(names.len());
        for name in names {
            let Some(migration) = migrations.iter().find(|m| m.name() == name) else {
                log::warn!("Migration not found: {}", name);
                continue;
            };
            log::info!("Rolling back: {}", name);
            migration.down(kernel).map_err(|e| Self::failed(name, "down", e))?;
            self.repository.delete(name)?;
            reverted.push(name.clone());
        }
        Ok(reverted)
    }

    fn check_unique(migrations: &[Rc<dyn Migration>]) -> Result<()> {
        let mut seen = HashSet::new();
        for migration in migrations {
            if !seen.insert(migration.name()) {
                return Err(MigrationError::DuplicateName {
                    name: migration.name().to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn failed(name: &str, direction: &'static str, source: crate::kernel::error::Error) -> crate::kernel::error::Error {
        MigrationError::Failed {
            migration: name.to_string(),
            direction,
            source: Box::new(source),
        }
        .into()
    }
}
