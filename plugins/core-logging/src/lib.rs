//! # Core Logging
//!
//! A [`ServiceProvider`] that installs a global `tracing` subscriber for the
//! process, configured from the `logging` table of a dependent plugin's
//! configuration, and routes the `log` records emitted by pluguin-core into it.
//!
//! ```toml
//! [logging]
//! level = "debug"   # any EnvFilter directive; RUST_LOG wins when set
//! format = "json"   # "text" (default) or "json"
//! target = false
//! ```
use std::io::IsTerminal;
use std::sync::OnceLock;

use log::debug;
use pluguin_core::kernel::error::Result as KernelResult;
use pluguin_core::{Kernel, ServiceProvider};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

static INITIALISED: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// The `logging` configuration table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
    pub target: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            target: true,
        }
    }
}

impl LoggingSettings {
    /// Read the kernel's `logging` table, falling back to defaults when the
    /// kernel has no configuration or the table does not parse.
    pub fn from_kernel(kernel: &Kernel) -> Self {
        match kernel.config() {
            Ok(config) => config.get::<LoggingSettings>("logging").unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// `RUST_LOG` takes precedence over the configured level.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Installed,
    AlreadyInitialised,
}

/// Install the global subscriber once per process.
///
/// Later calls, and calls made after some other crate installed a global
/// subscriber, report [`InitOutcome::AlreadyInitialised`].
pub fn init_logging(settings: &LoggingSettings) -> InitOutcome {
    if INITIALISED.set(()).is_err() {
        return InitOutcome::AlreadyInitialised;
    }

    let bridged = tracing_log::LogTracer::init().is_ok();
    let filter = settings.filter();
    let installed = match settings.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(settings.target);
            tracing::subscriber::set_global_default(Registry::default().with(filter).with(fmt_layer))
        }
        LogFormat::Text => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(settings.target)
                .with_ansi(std::io::stdout().is_terminal());
            tracing::subscriber::set_global_default(Registry::default().with(filter).with(fmt_layer))
        }
    };

    if installed.is_err() {
        return InitOutcome::AlreadyInitialised;
    }
    if !bridged {
        tracing::warn!("A `log` logger is already installed; pluguin-core records will not reach tracing");
    }
    InitOutcome::Installed
}

/// Publishes `logging.settings` and installs the subscriber on boot.
#[derive(Debug, Default)]
pub struct LoggingServiceProvider;

impl ServiceProvider for LoggingServiceProvider {
    fn register(&self, kernel: &Kernel) -> KernelResult<()> {
        kernel.singleton("logging.settings", |kernel: &Kernel| Ok(LoggingSettings::from_kernel(kernel)));
        Ok(())
    }

    fn boot(&self, kernel: &Kernel) -> KernelResult<()> {
        let settings = kernel.make_as::<LoggingSettings>("logging.settings")?;
        match init_logging(&settings) {
            InitOutcome::Installed => {
                tracing::info!(filter = %settings.level, format = ?settings.format, "Logging initialised");
            }
            InitOutcome::AlreadyInitialised => {
                debug!("Logging already initialised, keeping the existing subscriber");
            }
        }
        Ok(())
    }
}
