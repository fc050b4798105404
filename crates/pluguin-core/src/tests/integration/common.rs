#![cfg(test)]

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use semver::Version;
use tempfile::{tempdir, TempDir};

use crate::database::migration::Migration;
use crate::database::migrator::Migrator;
use crate::kernel::bootstrap::Kernel;
use crate::kernel::error::Result;
use crate::kernel::provider::{ProviderClass, ServiceProvider};
use crate::plugin_system::host::Host;
use crate::plugin_system::traits::Plugin;
use crate::storage::local::LocalStorageProvider;
use crate::storage::options::{FileOptionStore, OptionStore};
use crate::storage::provider::StorageProvider;

/// Tables created by the test migrations.
#[derive(Debug, Default)]
pub struct Schema {
    pub tables: RefCell<Vec<String>>,
}

impl Schema {
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.borrow().iter().any(|t| t == table)
    }
}

/// Eager provider publishing the shared `db.schema` service.
#[derive(Debug, Default)]
pub struct SchemaServiceProvider;

impl ServiceProvider for SchemaServiceProvider {
    fn register(&self, kernel: &Kernel) -> Result<()> {
        kernel.singleton("db.schema", |_: &Kernel| Ok(Schema::default()));
        Ok(())
    }
}

pub struct CreateTable(pub &'static str);

impl Migration for CreateTable {
    fn name(&self) -> &str {
        self.0
    }

    fn up(&self, kernel: &Kernel) -> Result<()> {
        let schema = kernel.make_as::<Schema>("db.schema")?;
        schema.tables.borrow_mut().push(self.0.trim_start_matches("create_").to_string());
        Ok(())
    }

    fn down(&self, kernel: &Kernel) -> Result<()> {
        let schema = kernel.make_as::<Schema>("db.schema")?;
        let table = self.0.trim_start_matches("create_");
        schema.tables.borrow_mut().retain(|t| t != table);
        Ok(())
    }
}

/// A plugin whose later versions ship more migrations.
pub struct SchemaPlugin {
    pub version: String,
    pub base: PathBuf,
    pub events: Rc<RefCell<Vec<String>>>,
}

impl SchemaPlugin {
    pub fn migrations(&self) -> Vec<Rc<dyn Migration>> {
        let mut migrations: Vec<Rc<dyn Migration>> = vec![Rc::new(CreateTable("create_losers"))];
        if Version::parse(&self.version).map(|v| v.major >= 2).unwrap_or(false) {
            migrations.push(Rc::new(CreateTable("create_winners")));
        }
        migrations
    }

    fn migrate(&self, kernel: &Kernel) -> Result<()> {
        let migrator = kernel.make_as::<Migrator>("migrator")?;
        let ran = migrator.run(kernel, &self.migrations())?;
        self.events.borrow_mut().extend(ran);
        Ok(())
    }
}

impl Plugin for SchemaPlugin {
    fn basename(&self) -> &str {
        "schema/schema.php"
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn base_path(&self) -> Option<PathBuf> {
        Some(self.base.clone())
    }

    fn providers(&self) -> Vec<ProviderClass> {
        vec![ProviderClass::of::<SchemaServiceProvider>()]
    }

    fn install(&self, kernel: &Kernel) -> Result<()> {
        self.migrate(kernel)
    }

    fn upgrade(&self, kernel: &Kernel, _from: &Version, _to: &Version) -> Result<()> {
        self.migrate(kernel)
    }

    fn uninstall(&self, kernel: &Kernel) -> Result<()> {
        let migrator = kernel.make_as::<Migrator>("migrator")?;
        let reverted = migrator.reset(kernel, &self.migrations())?;
        self.events
            .borrow_mut()
            .extend(reverted.into_iter().map(|name| format!("revert {}", name)));
        Ok(())
    }
}

/// A plugin directory with a manifest cache and a TOML config, and the
/// file-backed option store a host would use.
pub struct TestEnvironment {
    pub dir: TempDir,
    pub files: Rc<dyn StorageProvider>,
    pub options: Rc<dyn OptionStore>,
    pub events: Rc<RefCell<Vec<String>>>,
}

impl TestEnvironment {
    pub fn host(&self) -> Host {
        Host::new(self.files.clone(), self.options.clone()).expect("Failed to create host")
    }

    pub fn plugin(&self, version: &str) -> Rc<SchemaPlugin> {
        Rc::new(SchemaPlugin {
            version: version.to_string(),
            base: self.dir.path().join("schema"),
            events: self.events.clone(),
        })
    }

    pub fn take_events(&self) -> Vec<String> {
        self.events.borrow_mut().drain(..).collect()
    }
}

pub fn setup_test_environment() -> TestEnvironment {
    let dir = tempdir().expect("Failed to create temp directory");
    let plugin_dir = dir.path().join("schema");
    fs::create_dir_all(plugin_dir.join("bootstrap").join("cache")).expect("Failed to create cache dir");
    fs::write(
        plugin_dir.join("config.toml"),
        "[database]\nmigrations = \"schema_migrations\"\n",
    )
    .expect("Failed to write config");

    let files: Rc<dyn StorageProvider> = Rc::new(LocalStorageProvider::new(dir.path().to_path_buf()));
    let options: Rc<dyn OptionStore> = Rc::new(FileOptionStore::new(files.clone(), "options.json"));
    TestEnvironment {
        dir,
        files,
        options,
        events: Rc::new(RefCell::new(Vec::new())),
    }
}
