//! # Pluguin Plugin System Errors
//!
//! Defines [`PluginSystemError`] for host-side failures: unknown plugins,
//! malformed hook names, unparsable versions, refused host deactivation and
//! failing lifecycle hooks.
#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Plugin not registered: '{basename}'")]
    PluginNotFound { basename: String },

    #[error("Unknown lifecycle hook '{name}'")]
    BadHookName { name: String },

    #[error("Invalid version '{version}' for plugin '{basename}': {source}")]
    InvalidVersion {
        basename: String,
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("Deactivation failed because the following plugin(s) depend on Pluguin: {}", names.join(", "))]
    DependentsInstalled { names: Vec<String> },

    #[error("Lifecycle hook '{hook}' failed for plugin '{basename}': {source}")]
    HookFailed {
        basename: String,
        hook: String,
        #[source]
        source: Box<crate::kernel::error::Error>,
    },
}
