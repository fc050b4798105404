//! The "losers" example plugin.
//!
//! Registers a schema service backed by the host's option store, ships the
//! `create_losers_table` migration, runs it on install and upgrade and
//! reverts it on uninstall.
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use core_logging::LoggingServiceProvider;
use pluguin_core::database::Migrator;
use pluguin_core::kernel::error::{Error as KernelError, Result as KernelResult};
use pluguin_core::storage::OptionStoreExt;
use pluguin_core::{Kernel, Migration, OptionStore, Plugin, ProviderClass, ServiceProvider};
use semver::Version;
use serde::{Deserialize, Serialize};

pub const BASENAME: &str = "losers/losers.php";
pub const SCHEMA_OPTION: &str = "losers_schema";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Id,
    String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

/// Column list collected while defining a table.
#[derive(Debug, Default)]
pub struct Blueprint {
    columns: Vec<Column>,
}

impl Blueprint {
    /// Auto-incrementing `id` primary key.
    pub fn id(&mut self) -> &mut Self {
        self.column("id", ColumnType::Id)
    }

    pub fn string(&mut self, name: &str) -> &mut Self {
        self.column(name, ColumnType::String)
    }

    fn column(&mut self, name: &str, kind: ColumnType) -> &mut Self {
        self.columns.push(Column {
            name: name.to_string(),
            kind,
        });
        self
    }
}

/// Table definitions persisted as one option record.
#[derive(Debug)]
pub struct Schema {
    options: Rc<dyn OptionStore>,
    option: String,
    // Read-through cache of the persisted tables
    tables: RefCell<Option<BTreeMap<String, Vec<Column>>>>,
}

impl Schema {
    pub fn new(options: Rc<dyn OptionStore>, option: impl Into<String>) -> Self {
        Self {
            options,
            option: option.into(),
            tables: RefCell::new(None),
        }
    }

    pub fn create<F>(&self, table: &str, define: F) -> KernelResult<()>
    where
        F: FnOnce(&mut Blueprint),
    {
        let mut tables = self.load()?;
        if tables.contains_key(table) {
            return Err(KernelError::Other(format!("Table '{}' already exists", table)));
        }
        let mut blueprint = Blueprint::default();
        define(&mut blueprint);
        tables.insert(table.to_string(), blueprint.columns);
        self.store(tables)?;
        log::info!("Created table {}", table);
        Ok(())
    }

    pub fn drop_if_exists(&self, table: &str) -> KernelResult<()> {
        let mut tables = self.load()?;
        if tables.remove(table).is_some() {
            self.store(tables)?;
            log::info!("Dropped table {}", table);
        }
        Ok(())
    }

    pub fn has_table(&self, table: &str) -> KernelResult<bool> {
        Ok(self.load()?.contains_key(table))
    }

    pub fn columns(&self, table: &str) -> KernelResult<Vec<Column>> {
        Ok(self.load()?.get(table).cloned().unwrap_or_default())
    }

    fn load(&self) -> KernelResult<BTreeMap<String, Vec<Column>>> {
        if let Some(tables) = self.tables.borrow().as_ref() {
            return Ok(tables.clone());
        }
        let tables = self
            .options
            .get_typed::<BTreeMap<String, Vec<Column>>>(&self.option)?
            .unwrap_or_default();
        *self.tables.borrow_mut() = Some(tables.clone());
        Ok(tables)
    }

    fn store(&self, tables: BTreeMap<String, Vec<Column>>) -> KernelResult<()> {
        self.options.update_typed(&self.option, &tables)?;
        *self.tables.borrow_mut() = Some(tables);
        Ok(())
    }
}

/// Publishes `db.schema`.
#[derive(Debug, Default)]
pub struct SchemaServiceProvider;

impl ServiceProvider for SchemaServiceProvider {
    fn register(&self, kernel: &Kernel) -> KernelResult<()> {
        kernel.singleton("db.schema", |kernel: &Kernel| {
            let option = match kernel.config() {
                Ok(config) => config.get_or("database.schema", SCHEMA_OPTION.to_string()),
                Err(_) => SCHEMA_OPTION.to_string(),
            };
            Ok(Schema::new(kernel.options()?, option))
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CreateLosersTable;

impl Migration for CreateLosersTable {
    fn name(&self) -> &str {
        "create_losers_table"
    }

    fn up(&self, kernel: &Kernel) -> KernelResult<()> {
        kernel.make_as::<Schema>("db.schema")?.create("losers", |table| {
            table.id();
            table.string("loser_name");
        })
    }

    fn down(&self, kernel: &Kernel) -> KernelResult<()> {
        kernel.make_as::<Schema>("db.schema")?.drop_if_exists("losers")
    }
}

pub struct LosersPlugin {
    version: String,
    base_path: Option<PathBuf>,
}

impl LosersPlugin {
    pub fn new(version: impl Into<String>, base_path: Option<PathBuf>) -> Self {
        Self {
            version: version.into(),
            base_path,
        }
    }

    pub fn migrations(&self) -> Vec<Rc<dyn Migration>> {
        vec![Rc::new(CreateLosersTable)]
    }

    fn migrate(&self, kernel: &Kernel) -> KernelResult<()> {
        let migrator = kernel.make_as::<Migrator>("migrator")?;
        let ran = migrator.run(kernel, &self.migrations())?;
        log::info!("Ran {} migration(s) for {}", ran.len(), BASENAME);
        Ok(())
    }
}

impl Plugin for LosersPlugin {
    fn basename(&self) -> &str {
        BASENAME
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn base_path(&self) -> Option<PathBuf> {
        self.base_path.clone()
    }

    fn providers(&self) -> Vec<ProviderClass> {
        vec![
            ProviderClass::of::<LoggingServiceProvider>(),
            ProviderClass::of::<SchemaServiceProvider>(),
        ]
    }

    fn install(&self, kernel: &Kernel) -> KernelResult<()> {
        self.migrate(kernel)
    }

    fn upgrade(&self, kernel: &Kernel, _from: &Version, _to: &Version) -> KernelResult<()> {
        self.migrate(kernel)
    }

    fn downgrade(&self, _kernel: &Kernel, from: &Version, to: &Version) -> KernelResult<()> {
        log::warn!("{} downgraded from {} to {}, schema left as is", BASENAME, from, to);
        Ok(())
    }

    fn uninstall(&self, kernel: &Kernel) -> KernelResult<()> {
        let migrator = kernel.make_as::<Migrator>("migrator")?;
        migrator.reset(kernel, &self.migrations())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
