use std::path::{Path, PathBuf};

use crate::kernel::constants;

/// Filesystem layout of a dependent plugin, rooted at its base path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paths {
    base: PathBuf,
    database: Option<PathBuf>,
    storage: Option<PathBuf>,
}

impl Paths {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            database: None,
            storage: None,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Config file path without extension; the loader probes the supported formats.
    pub fn config(&self) -> PathBuf {
        self.base.join(constants::CONFIG_FILE_STEM)
    }

    pub fn bootstrap(&self) -> PathBuf {
        self.base.join(constants::BOOTSTRAP_DIR)
    }

    pub fn database(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.base.join(constants::DATABASE_DIR))
    }

    pub fn storage(&self) -> PathBuf {
        self.storage
            .clone()
            .unwrap_or_else(|| self.base.join(constants::STORAGE_DIR))
    }

    pub fn cached_services(&self) -> PathBuf {
        self.base.join(constants::SERVICES_MANIFEST)
    }

    pub fn set_database(&mut self, path: impl Into<PathBuf>) {
        self.database = Some(path.into());
    }

    pub fn set_storage(&mut self, path: impl Into<PathBuf>) {
        self.storage = Some(path.into());
    }

    /// `(binding key, path)` pairs published into the container.
    pub fn bindings(&self) -> Vec<(&'static str, PathBuf)> {
        vec![
            ("path.base", self.base.clone()),
            ("path.config", self.config()),
            ("path.bootstrap", self.bootstrap()),
            ("path.database", self.database()),
            ("path.storage", self.storage()),
        ]
    }
}
