use std::fmt;
use std::rc::Rc;

use crate::database::provider::MigrationServiceProvider;
use crate::kernel::bootstrap::Kernel;
use crate::kernel::constants;
use crate::kernel::error::{Error, Result};
use crate::kernel::provider::ProviderClass;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::hook::LifecycleHook;
use crate::plugin_system::registry::{self, InstalledPlugins, VersionChange};
use crate::plugin_system::traits::Plugin;
use crate::storage::options::OptionStore;
use crate::storage::provider::StorageProvider;

struct RegisteredPlugin {
    basename: String,
    plugin: Rc<dyn Plugin>,
    kernel: Rc<Kernel>,
}

/// The host every dependent plugin registers against.
///
/// Owns the shared filesystem and option store, and the installed-plugins
/// record consulted on each registration.
pub struct Host {
    files: Rc<dyn StorageProvider>,
    options: Rc<dyn OptionStore>,
    installed: InstalledPlugins,
    // Registration order
    plugins: Vec<RegisteredPlugin>,
}

impl Host {
    /// Create the host, creating the installed-plugins record on first run.
    pub fn new(files: Rc<dyn StorageProvider>, options: Rc<dyn OptionStore>) -> Result<Self> {
        log::info!("Initializing {} v{}", constants::APP_NAME, constants::FRAMEWORK_VERSION);
        let installed = InstalledPlugins::load_or_create(options.as_ref())?;
        Ok(Self {
            files,
            options,
            installed,
            plugins: Vec::new(),
        })
    }

    pub fn files(&self) -> Rc<dyn StorageProvider> {
        self.files.clone()
    }

    pub fn options(&self) -> Rc<dyn OptionStore> {
        self.options.clone()
    }

    pub fn installed(&self) -> &InstalledPlugins {
        &self.installed
    }

    /// Register a dependent plugin: build and bootstrap its kernel, run the
    /// install / upgrade / downgrade hook its recorded version calls for,
    /// persist the record, then `init` it.
    pub fn register(&mut self, plugin: Rc<dyn Plugin>) -> Result<Rc<Kernel>> {
        let basename = plugin.basename().to_string();
        let version = registry::parse_version(&basename, plugin.version())?;
        log::info!("Registering plugin {} v{}", basename, version);

        let kernel = Rc::new(Kernel::new(plugin.base_path()));
        kernel.instance("files", self.files.clone());
        kernel.instance("options", self.options.clone());

        let migrations = ProviderClass::of::<MigrationServiceProvider>();
        kernel.add_deferred_services(
            MigrationServiceProvider::PROVIDES
                .iter()
                .map(|service| (service.to_string(), migrations.clone())),
        );
        kernel.set_configured_providers(plugin.providers());

        kernel.bootstrap_with(&plugin.bootstrappers())?;

        match self.installed.version_change(&basename, &version) {
            VersionChange::Install => {
                log::info!("Installing plugin {} v{}", basename, version);
                Self::run_hook(&basename, "install", || plugin.install(&kernel))?;
            }
            VersionChange::Upgrade { from, to } => {
                log::info!("Upgrading plugin {} from {} to {}", basename, from, to);
                Self::run_hook(&basename, "upgrade", || plugin.upgrade(&kernel, &from, &to))?;
            }
            VersionChange::Downgrade { from, to } => {
                log::warn!("Downgrading plugin {} from {} to {}", basename, from, to);
                Self::run_hook(&basename, "downgrade", || plugin.downgrade(&kernel, &from, &to))?;
            }
            VersionChange::Unchanged => {}
        }

        self.installed.record(&basename, &version);
        self.installed.save(self.options.as_ref())?;

        let registered = RegisteredPlugin {
            basename: basename.clone(),
            plugin: plugin.clone(),
            kernel: kernel.clone(),
        };
        match self.plugins.iter_mut().find(|r| r.basename == basename) {
            Some(existing) => *existing = registered,
            None => self.plugins.push(registered),
        }

        Self::run_hook(&basename, "init", || plugin.init(&kernel))?;
        Ok(kernel)
    }

    pub fn kernel(&self, basename: &str) -> Option<Rc<Kernel>> {
        self.find(basename).map(|registered| registered.kernel.clone())
    }

    pub fn plugin(&self, basename: &str) -> Option<Rc<dyn Plugin>> {
        self.find(basename).map(|registered| registered.plugin.clone())
    }

    /// Registered basenames, in registration order.
    pub fn registered(&self) -> Vec<String> {
        self.plugins.iter().map(|registered| registered.basename.clone()).collect()
    }

    pub fn activate(&self, basename: &str) -> Result<()> {
        let registered = self.get_registered(basename)?;
        log::info!("Activating plugin {}", basename);
        Self::run_hook(basename, "activate", || registered.plugin.activate(&registered.kernel))
    }

    pub fn deactivate(&self, basename: &str) -> Result<()> {
        let registered = self.get_registered(basename)?;
        log::info!("Deactivating plugin {}", basename);
        Self::run_hook(basename, "deactivate", || registered.plugin.deactivate(&registered.kernel))
    }

    /// Run the plugin's uninstall hook and forget its recorded version.
    pub fn uninstall(&mut self, basename: &str) -> Result<()> {
        {
            let registered = self.get_registered(basename)?;
            log::info!("Uninstalling plugin {}", basename);
            Self::run_hook(basename, "uninstall", || registered.plugin.uninstall(&registered.kernel))?;
        }
        self.installed.remove(basename);
        self.installed.save(self.options.as_ref())?;
        self.plugins.retain(|registered| registered.basename != basename);
        Ok(())
    }

    /// Dispatch a `<hook>_<basename>` hook name.
    pub fn dispatch(&mut self, hook_name: &str) -> Result<()> {
        let (hook, basename) = LifecycleHook::parse(hook_name)?;
        match hook {
            LifecycleHook::Activate => self.activate(&basename),
            LifecycleHook::Deactivate => self.deactivate(&basename),
            LifecycleHook::Uninstall => self.uninstall(&basename),
        }
    }

    /// Hook names the host answers for a registered plugin.
    pub fn hook_names(&self, basename: &str) -> Vec<String> {
        [LifecycleHook::Activate, LifecycleHook::Deactivate, LifecycleHook::Uninstall]
            .iter()
            .map(|hook| hook.hook_name(basename))
            .collect()
    }

    /// The host itself may only be deactivated once no dependent plugin is recorded.
    pub fn deactivate_host(&self) -> Result<()> {
        if self.installed.is_empty() {
            log::info!("Deactivating {}", constants::APP_NAME);
            return Ok(());
        }
        Err(PluginSystemError::DependentsInstalled {
            names: self.installed.basenames(),
        }
        .into())
    }

    /// Run every registered kernel's terminating callbacks, in registration order.
    pub fn terminate(&self) -> Result<()> {
        for registered in &self.plugins {
            registered.kernel.terminate()?;
        }
        Ok(())
    }

    fn find(&self, basename: &str) -> Option<&RegisteredPlugin> {
        self.plugins.iter().find(|registered| registered.basename == basename)
    }

    fn get_registered(&self, basename: &str) -> Result<&RegisteredPlugin> {
        self.find(basename).ok_or_else(|| {
            PluginSystemError::PluginNotFound {
                basename: basename.to_string(),
            }
            .into()
        })
    }

    fn run_hook<F>(basename: &str, hook: &str, run: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        run().map_err(|source| {
            Error::from(PluginSystemError::HookFailed {
                basename: basename.to_string(),
                hook: hook.to_string(),
                source: Box::new(source),
            })
        })
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("files", &self.files)
            .field("options", &self.options)
            .field("installed", &self.installed)
            .field("plugins", &self.registered())
            .finish()
    }
}
