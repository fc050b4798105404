use std::path::PathBuf;

use semver::Version;

use crate::kernel::bootstrap::Kernel;
use crate::kernel::bootstrappers::{self, Bootstrapper};
use crate::kernel::error::Result;
use crate::kernel::provider::ProviderClass;

/// Core trait that all dependent plugins must implement
///
/// Every hook receives the plugin's own kernel. Hooks default to doing
/// nothing, so a plugin only overrides the ones it cares about.
pub trait Plugin {
    /// Stable identifier, e.g. `losers/losers.php`. Keys the installed-plugins record.
    fn basename(&self) -> &str;

    /// Semantic version string of the plugin
    fn version(&self) -> &str;

    /// Root directory for config, manifest cache and database files
    fn base_path(&self) -> Option<PathBuf> {
        None
    }

    /// Providers registered by the `RegisterProviders` bootstrapper
    fn providers(&self) -> Vec<ProviderClass> {
        Vec::new()
    }

    /// Startup sequence run against the plugin's kernel
    fn bootstrappers(&self) -> Vec<Box<dyn Bootstrapper>> {
        bootstrappers::default_bootstrappers()
    }

    /// First time the host sees this plugin
    fn install(&self, _kernel: &Kernel) -> Result<()> {
        Ok(())
    }

    /// The recorded version is older than the running one
    fn upgrade(&self, _kernel: &Kernel, _from: &Version, _to: &Version) -> Result<()> {
        Ok(())
    }

    /// The recorded version is newer than the running one
    fn downgrade(&self, _kernel: &Kernel, _from: &Version, _to: &Version) -> Result<()> {
        Ok(())
    }

    fn activate(&self, _kernel: &Kernel) -> Result<()> {
        Ok(())
    }

    fn deactivate(&self, _kernel: &Kernel) -> Result<()> {
        Ok(())
    }

    fn uninstall(&self, _kernel: &Kernel) -> Result<()> {
        Ok(())
    }

    /// Last step of registration, after version hooks have run
    fn init(&self, _kernel: &Kernel) -> Result<()> {
        Ok(())
    }
}
