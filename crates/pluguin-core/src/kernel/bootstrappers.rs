use std::rc::Rc;

use crate::kernel::bootstrap::Kernel;
use crate::kernel::error::Result;
use crate::storage::config::{ConfigFormat, ConfigRepository};
use crate::storage::local::LocalStorageProvider;
use crate::storage::provider::StorageProvider;

/// One step of the kernel startup sequence.
pub trait Bootstrapper {
    /// Key used by `before_bootstrapping` / `after_bootstrapping`.
    fn name(&self) -> &'static str;

    fn bootstrap(&self, kernel: &Kernel) -> Result<()>;
}

/// Loads `config.{json,toml,yaml,yml}` from the base path and binds it as `config`.
#[derive(Debug, Default)]
pub struct LoadConfiguration;

impl Bootstrapper for LoadConfiguration {
    fn name(&self) -> &'static str {
        "load_configuration"
    }

    fn bootstrap(&self, kernel: &Kernel) -> Result<()> {
        let files: Rc<dyn StorageProvider> = if kernel.container().bound("files") {
            kernel.files()?
        } else {
            Rc::new(LocalStorageProvider::new(Default::default()))
        };

        let mut repository = ConfigRepository::new();
        if let Some(paths) = kernel.paths() {
            let stem = paths.config();
            let candidate = ConfigFormat::all()
                .iter()
                .flat_map(|format| format.extensions())
                .map(|extension| stem.with_extension(extension))
                .find(|candidate| files.is_file(candidate));
            if let Some(candidate) = candidate {
                log::info!("Loading configuration from {}", candidate.display());
                repository = ConfigRepository::from_file(files.as_ref(), &candidate)?;
            }
        }

        kernel.instance("config", repository);
        Ok(())
    }
}

/// Registers the kernel's configured providers through the manifest cache.
#[derive(Debug, Default)]
pub struct RegisterProviders;

impl Bootstrapper for RegisterProviders {
    fn name(&self) -> &'static str {
        "register_providers"
    }

    fn bootstrap(&self, kernel: &Kernel) -> Result<()> {
        kernel.register_configured_providers()
    }
}

#[derive(Debug, Default)]
pub struct BootProviders;

impl Bootstrapper for BootProviders {
    fn name(&self) -> &'static str {
        "boot_providers"
    }

    fn bootstrap(&self, kernel: &Kernel) -> Result<()> {
        kernel.boot()
    }
}

/// The standard startup sequence.
pub fn default_bootstrappers() -> Vec<Box<dyn Bootstrapper>> {
    vec![
        Box::new(LoadConfiguration),
        Box::new(RegisterProviders),
        Box::new(BootProviders),
    ]
}
