use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use tempfile::tempdir;

use crate::kernel::bootstrap::Kernel;
use crate::kernel::bootstrappers::{default_bootstrappers, Bootstrapper, LoadConfiguration};
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};

#[derive(Debug)]
struct FailingBootstrapper;

impl Bootstrapper for FailingBootstrapper {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn bootstrap(&self, _kernel: &Kernel) -> Result<()> {
        Err(Error::Other("cannot start".into()))
    }
}

#[test]
fn test_load_configuration_reads_json_config() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    fs::write(
        temp_dir.path().join("config.json"),
        r#"{ "database": { "migrations": "losers_migrations" } }"#,
    )
    .expect("write config");
    let kernel = Kernel::new(Some(temp_dir.path().to_path_buf()));

    LoadConfiguration.bootstrap(&kernel)?;

    let config = kernel.config()?;
    assert_eq!(
        config.get::<String>("database.migrations").as_deref(),
        Some("losers_migrations")
    );
    Ok(())
}

#[cfg(feature = "yaml-config")]
#[test]
fn test_load_configuration_reads_yml_config() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    fs::write(temp_dir.path().join("config.yml"), "logging:\n  level: debug\n").expect("write config");
    let kernel = Kernel::new(Some(temp_dir.path().to_path_buf()));

    LoadConfiguration.bootstrap(&kernel)?;

    assert_eq!(kernel.config()?.get::<String>("logging.level").as_deref(), Some("debug"));
    Ok(())
}

#[test]
fn test_load_configuration_without_file_binds_empty_config() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let kernel = Kernel::new(Some(temp_dir.path().to_path_buf()));

    LoadConfiguration.bootstrap(&kernel)?;

    assert!(!kernel.config()?.has("database"));
    Ok(())
}

#[test]
fn test_bootstrap_callbacks_surround_their_bootstrapper() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    fs::create_dir_all(temp_dir.path().join("bootstrap").join("cache")).expect("create cache dir");
    let kernel = Kernel::new(Some(temp_dir.path().to_path_buf()));
    let log = Rc::new(RefCell::new(Vec::new()));

    let before = log.clone();
    kernel.before_bootstrapping("boot_providers", move |k: &Kernel| {
        assert!(!k.is_booted());
        before.borrow_mut().push("before boot_providers");
        Ok(())
    });
    let after = log.clone();
    kernel.after_bootstrapping("boot_providers", move |k: &Kernel| {
        assert!(k.is_booted());
        after.borrow_mut().push("after boot_providers");
        Ok(())
    });
    let config = log.clone();
    kernel.after_bootstrapping("load_configuration", move |k: &Kernel| {
        assert!(k.config().is_ok());
        config.borrow_mut().push("after load_configuration");
        Ok(())
    });

    kernel.bootstrap_with(&default_bootstrappers())?;

    assert!(kernel.has_been_bootstrapped());
    assert!(kernel.is_booted());
    assert_eq!(
        *log.borrow(),
        vec!["after load_configuration", "before boot_providers", "after boot_providers"]
    );
    Ok(())
}

#[test]
fn test_failing_bootstrapper_is_wrapped() {
    let kernel = Kernel::default();
    let bootstrappers: Vec<Box<dyn Bootstrapper>> = vec![Box::new(FailingBootstrapper)];

    let result = kernel.bootstrap_with(&bootstrappers);

    match result {
        Err(Error::KernelLifecycleError {
            phase,
            component_name,
            source,
            ..
        }) => {
            assert_eq!(phase, KernelLifecyclePhase::Bootstrap);
            assert_eq!(component_name.as_deref(), Some("failing"));
            assert!(matches!(source.as_deref(), Some(Error::Other(_))));
        }
        other => panic!("Expected KernelLifecycleError, got {:?}", other),
    }
}

#[test]
fn test_set_base_path_publishes_paths() -> Result<()> {
    let kernel = Kernel::default();
    kernel.set_base_path("/srv/plugins/losers/");

    let base = kernel.make_as::<std::path::PathBuf>("path.base")?;
    let database = kernel.make_as::<std::path::PathBuf>("path.database")?;

    assert_eq!(base.as_path(), std::path::Path::new("/srv/plugins/losers"));
    assert_eq!(database.as_path(), std::path::Path::new("/srv/plugins/losers/database"));

    kernel.use_database_path("/var/db");
    assert_eq!(
        kernel.make_as::<std::path::PathBuf>("path.database")?.as_path(),
        std::path::Path::new("/var/db")
    );
    assert_eq!(
        kernel.paths().map(|p| p.database()),
        Some(std::path::PathBuf::from("/var/db"))
    );

    kernel.use_storage_path("/var/storage");
    assert_eq!(
        kernel.make_as::<std::path::PathBuf>("path.storage")?.as_path(),
        std::path::Path::new("/var/storage")
    );
    assert_eq!(
        kernel.paths().map(|p| p.storage()),
        Some(std::path::PathBuf::from("/var/storage"))
    );
    Ok(())
}
