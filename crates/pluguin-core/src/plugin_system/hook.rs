use std::fmt;
use std::str::FromStr;

use crate::kernel::error::Result;
use crate::plugin_system::error::PluginSystemError;

/// Per-plugin hooks the host registers under `<hook>_<basename>` names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleHook {
    Activate,
    Deactivate,
    Uninstall,
}

impl LifecycleHook {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleHook::Activate => "activate",
            LifecycleHook::Deactivate => "deactivate",
            LifecycleHook::Uninstall => "uninstall",
        }
    }

    /// Hook name for a plugin, e.g. `activate_losers/losers.php`.
    pub fn hook_name(&self, basename: &str) -> String {
        format!("{}_{}", self.as_str(), basename)
    }

    /// Split a hook name into the hook and the plugin basename.
    pub fn parse(name: &str) -> Result<(LifecycleHook, String)> {
        let bad_name = || PluginSystemError::BadHookName {
            name: name.to_string(),
        };
        let (hook, basename) = name.split_once('_').ok_or_else(bad_name)?;
        if basename.is_empty() {
            return Err(bad_name().into());
        }
        let hook = hook.parse::<LifecycleHook>().map_err(|_| bad_name())?;
        Ok((hook, basename.to_string()))
    }
}

impl FromStr for LifecycleHook {
    type Err = PluginSystemError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "activate" => Ok(LifecycleHook::Activate),
            "deactivate" => Ok(LifecycleHook::Deactivate),
            "uninstall" => Ok(LifecycleHook::Uninstall),
            _ => Err(PluginSystemError::BadHookName { name: s.to_string() }),
        }
    }
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
