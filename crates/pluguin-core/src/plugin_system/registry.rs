use std::cmp::Ordering;
use std::collections::BTreeMap;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::kernel::constants;
use crate::kernel::error::Result;
use crate::plugin_system::error::PluginSystemError;
use crate::storage::options::{OptionStore, OptionStoreExt};

/// Last version of a dependent plugin the host has seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPlugin {
    pub version: String,
}

/// What the host must do for a plugin, given its recorded version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionChange {
    Install,
    Upgrade { from: Version, to: Version },
    Downgrade { from: Version, to: Version },
    Unchanged,
}

/// The installed-plugins record stored under the `pluguin` option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPlugins {
    #[serde(default)]
    pub plugins: BTreeMap<String, InstalledPlugin>,
}

impl InstalledPlugins {
    /// Read the record, creating an empty one when the option does not exist yet.
    pub fn load_or_create(store: &dyn OptionStore) -> Result<Self> {
        match store.get_typed::<InstalledPlugins>(constants::INSTALLED_PLUGINS_OPTION)? {
            Some(record) => Ok(record),
            None => {
                let record = InstalledPlugins::default();
                let value = serde_json::to_value(&record).unwrap_or_default();
                store.add_option(constants::INSTALLED_PLUGINS_OPTION, value)?;
                log::info!("Created installed-plugins record");
                Ok(record)
            }
        }
    }

    pub fn save(&self, store: &dyn OptionStore) -> Result<()> {
        store.update_typed(constants::INSTALLED_PLUGINS_OPTION, self)
    }

    pub fn get(&self, basename: &str) -> Option<&InstalledPlugin> {
        self.plugins.get(basename)
    }

    pub fn contains(&self, basename: &str) -> bool {
        self.plugins.contains_key(basename)
    }

    pub fn record(&mut self, basename: &str, version: &Version) {
        self.plugins.insert(
            basename.to_string(),
            InstalledPlugin {
                version: version.to_string(),
            },
        );
    }

    pub fn remove(&mut self, basename: &str) -> Option<InstalledPlugin> {
        self.plugins.remove(basename)
    }

    pub fn basenames(&self) -> Vec<String> {
        self.plugins.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Compare `current` against the recorded version of `basename`.
    ///
    /// A recorded version that no longer parses is treated as a fresh
    /// install, which rewrites the record.
    pub fn version_change(&self, basename: &str, current: &Version) -> VersionChange {
        let Some(installed) = self.plugins.get(basename) else {
            return VersionChange::Install;
        };
        let recorded = match parse_version(basename, &installed.version) {
            Ok(recorded) => recorded,
            Err(e) => {
                log::warn!("Ignoring recorded version of {}: {}", basename, e);
                return VersionChange::Install;
            }
        };
        match current.cmp_precedence(&recorded) {
            Ordering::Greater => VersionChange::Upgrade {
                from: recorded,
                to: current.clone(),
            },
            Ordering::Less => VersionChange::Downgrade {
                from: recorded,
                to: current.clone(),
            },
            Ordering::Equal => VersionChange::Unchanged,
        }
    }
}

/// Parse a plugin version string. Missing minor and patch parts count as 0,
/// so `1.0` reads as `1.0.0`; everything else follows semver.
pub fn parse_version(basename: &str, version: &str) -> Result<Version> {
    let normalized = pad_version(version.trim());
    Version::parse(&normalized).map_err(|source| {
        PluginSystemError::InvalidVersion {
            basename: basename.to_string(),
            version: version.to_string(),
            source,
        }
        .into()
    })
}

fn pad_version(version: &str) -> String {
    let split = version.find(['-', '+']).unwrap_or(version.len());
    let (core, suffix) = version.split_at(split);
    let padding = match core.split('.').count() {
        1 if !core.is_empty() => ".0.0",
        2 => ".0",
        _ => "",
    };
    format!("{}{}{}", core, padding, suffix)
}
