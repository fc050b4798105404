use std::fmt::Debug;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::kernel::error::Result;
use crate::storage::options::{OptionStore, OptionStoreExt};

/// Record of which migrations ran, and in which batch.
pub trait MigrationRepository: Debug {
    /// Names of every migration that ran, oldest first.
    fn get_ran(&self) -> Result<Vec<String>>;

    /// Records of the most recent batch, newest first.
    fn get_last(&self) -> Result<Vec<MigrationRecord>>;

    fn get_last_batch_number(&self) -> Result<u32>;

    fn get_next_batch_number(&self) -> Result<u32> {
        Ok(self.get_last_batch_number()? + 1)
    }

    fn log(&self, migration: &str, batch: u32) -> Result<()>;

    fn delete(&self, migration: &str) -> Result<()>;

    fn repository_exists(&self) -> Result<bool>;

    fn create_repository(&self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub migration: String,
    pub batch: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MigrationLog {
    #[serde(default)]
    entries: Vec<MigrationRecord>,
}

/// Repository kept as one record in the host's option store.
#[derive(Debug)]
pub struct OptionMigrationRepository {
    options: Rc<dyn OptionStore>,
    table: String,
}

impl OptionMigrationRepository {
    pub fn new(options: Rc<dyn OptionStore>, table: impl Into<String>) -> Self {
        Self {
            options,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn read(&self) -> Result<MigrationLog> {
        Ok(self.options.get_typed::<MigrationLog>(&self.table)?.unwrap_or_default())
    }

    fn write(&self, log: &MigrationLog) -> Result<()> {
        self.options.update_typed(&self.table, log)
    }
}

impl MigrationRepository for OptionMigrationRepository {
    fn get_ran(&self) -> Result<Vec<String>> {
        let mut entries = self.read()?.entries;
        entries.sort_by_key(|record| record.batch);
        Ok(entries.into_iter().map(|record| record.migration).collect())
    }

    fn get_last(&self) -> Result<Vec<MigrationRecord>> {
        let log = self.read()?;
        let last = log.entries.iter().map(|record| record.batch).max().unwrap_or(0);
        Ok(log
            .entries
            .into_iter()
            .rev()
            .filter(|record| record.batch == last && last > 0)
            .collect())
    }

    fn get_last_batch_number(&self) -> Result<u32> {
        Ok(self.read()?.entries.iter().map(|record| record.batch).max().unwrap_or(0))
    }

    fn log(&self, migration: &str, batch: u32) -> Result<()> {
        let mut log = self.read()?;
        log.entries.push(MigrationRecord {
            migration: migration.to_string(),
            batch,
        });
        self.write(&log)
    }

    fn delete(&self, migration: &str) -> Result<()> {
        let mut log = self.read()?;
        log.entries.retain(|record| record.migration != migration);
        self.write(&log)
    }

    fn repository_exists(&self) -> Result<bool> {
        Ok(self.options.get_option(&self.table)?.is_some())
    }

    fn create_repository(&self) -> Result<()> {
        if !self.repository_exists()? {
            log::info!("Creating migration repository '{}'", self.table);
            self.write(&MigrationLog::default())?;
        }
        Ok(())
    }
}
