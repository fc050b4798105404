use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::kernel::bootstrap::Kernel;
use crate::kernel::error::{Error, Result};
use crate::kernel::provider::ProviderClass;
use crate::storage::error::StorageSystemError;
use crate::storage::provider::StorageProvider;

/// Cached split of the configured providers into eager and deferred ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderManifest {
    /// Provider names the manifest was compiled from, in order.
    pub providers: Vec<String>,
    /// Providers registered on every load.
    pub eager: Vec<String>,
    /// Service name -> deferred provider name.
    pub deferred: BTreeMap<String, String>,
}

impl ProviderManifest {
    fn fresh(providers: &[ProviderClass]) -> Self {
        Self {
            providers: providers.iter().map(|p| p.name().to_string()).collect(),
            eager: Vec::new(),
            deferred: BTreeMap::new(),
        }
    }
}

/// Loads providers into a kernel, compiling and caching the manifest as needed.
pub struct ProviderRepository {
    files: Rc<dyn StorageProvider>,
    // None: compile on every load, never cache
    manifest_path: Option<PathBuf>,
}

impl ProviderRepository {
    pub fn new(files: Rc<dyn StorageProvider>, manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            files,
            manifest_path: Some(manifest_path.into()),
        }
    }

    /// Repository that compiles the manifest in memory on every load.
    pub fn uncached(files: Rc<dyn StorageProvider>) -> Self {
        Self {
            files,
            manifest_path: None,
        }
    }

    pub fn manifest_path(&self) -> Option<&Path> {
        self.manifest_path.as_deref()
    }

    /// Register eager providers and queue deferred services for `providers`.
    pub fn load(&self, kernel: &Kernel, providers: &[ProviderClass]) -> Result<ProviderManifest> {
        let mut manifest = self.load_manifest()?;

        if self.should_recompile(manifest.as_ref(), providers) {
            manifest = Some(self.compile_manifest(providers)?);
        }
        let manifest = manifest.unwrap_or_default();

        for name in &manifest.eager {
            match providers.iter().find(|p| p.name() == name) {
                Some(class) => {
                    kernel.register_class(class, false)?;
                }
                None => log::warn!("Manifest names unknown eager provider {}", name),
            }
        }

        let deferred: Vec<(String, ProviderClass)> = manifest
            .deferred
            .iter()
            .filter_map(|(service, name)| {
                providers
                    .iter()
                    .find(|p| p.name() == name)
                    .map(|class| (service.clone(), class.clone()))
            })
            .collect();
        kernel.add_deferred_services(deferred);

        Ok(manifest)
    }

    /// Read the cached manifest. A missing file yields `None`; so does an
    /// unreadable one, which is recompiled.
    pub fn load_manifest(&self) -> Result<Option<ProviderManifest>> {
        let Some(path) = self.manifest_path.as_deref() else {
            return Ok(None);
        };
        if !self.files.exists(path) {
            return Ok(None);
        }
        let content = self.files.read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(manifest) => Ok(Some(manifest)),
            Err(e) => {
                log::warn!("Ignoring corrupt provider manifest {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    pub fn should_recompile(&self, manifest: Option<&ProviderManifest>, providers: &[ProviderClass]) -> bool {
        match manifest {
            None => true,
            Some(manifest) => {
                manifest.providers.len() != providers.len()
                    || manifest
                        .providers
                        .iter()
                        .zip(providers)
                        .any(|(cached, class)| cached != class.name())
            }
        }
    }

    fn compile_manifest(&self, providers: &[ProviderClass]) -> Result<ProviderManifest> {
        let mut manifest = ProviderManifest::fresh(providers);

        for class in providers {
            let instance = class.instantiate();
            if instance.is_deferred() {
                for service in instance.provides() {
                    manifest.deferred.insert(service, class.name().to_string());
                }
            } else {
                manifest.eager.push(class.name().to_string());
            }
        }

        match self.manifest_path.as_deref() {
            Some(path) => {
                log::info!("Compiling provider manifest {}", path.display());
                self.write_manifest(&manifest)?;
            }
            None => log::debug!("Compiled provider manifest in memory"),
        }
        Ok(manifest)
    }

    /// Persist the manifest. The target directory must already exist and be
    /// writable. An uncached repository writes nothing.
    pub fn write_manifest(&self, manifest: &ProviderManifest) -> Result<()> {
        let Some(path) = self.manifest_path.as_deref() else {
            return Ok(());
        };
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        if !self.is_writable_dir(&dir) {
            return Err(Error::ManifestWrite { path: dir });
        }

        let content = serde_json::to_string_pretty(manifest).map_err(|e| {
            StorageSystemError::SerializationError {
                format: "json".to_string(),
                source: Box::new(e),
            }
        })?;
        self.files.write_string(path, &content)
    }

    fn is_writable_dir(&self, dir: &Path) -> bool {
        if !self.files.is_dir(dir) {
            return false;
        }
        match self.files.metadata(dir) {
            Ok(metadata) => !metadata.permissions().readonly(),
            Err(_) => false,
        }
    }
}
