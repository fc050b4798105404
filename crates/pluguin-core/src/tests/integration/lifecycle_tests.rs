#![cfg(test)]

use serde_json::Value;

use crate::database::migrator::Migrator;
use crate::kernel::constants;
use crate::kernel::error::Result;
use crate::storage::options::OptionStoreExt;

use super::common::{setup_test_environment, Schema};

#[cfg(feature = "toml-config")]
#[test]
fn test_full_plugin_lifecycle() -> Result<()> {
    let env = setup_test_environment();

    // Install: migrations run against the eager schema service
    let mut host = env.host();
    let kernel = host.register(env.plugin("1.0.0"))?;
    assert_eq!(env.take_events(), vec!["create_losers"]);
    assert!(kernel.make_as::<Schema>("db.schema")?.has_table("losers"));
    assert!(kernel.cached_services_path().is_file());

    // The configured migration table is used, in the same file as the plugin record
    let log: Option<Value> = env.options.get_typed("schema_migrations")?;
    assert!(log.is_some());
    assert!(env.dir.path().join("options.json").is_file());

    // Restart with the same version: nothing to do
    let mut host = env.host();
    host.register(env.plugin("1.0.0"))?;
    assert!(env.take_events().is_empty());

    // Upgrade: only the new migration runs
    let mut host = env.host();
    let kernel = host.register(env.plugin("2.0.0"))?;
    assert_eq!(env.take_events(), vec!["create_winners"]);
    let migrator = kernel.make_as::<Migrator>("migrator")?;
    assert_eq!(migrator.repository().get_last_batch_number()?, 2);

    // Uninstall reverts both batches and frees the host
    host.dispatch("uninstall_schema/schema.php")?;
    assert_eq!(
        env.take_events(),
        vec!["revert create_winners", "revert create_losers"]
    );
    assert!(host.deactivate_host().is_ok());
    Ok(())
}

#[test]
fn test_record_survives_host_restart() -> Result<()> {
    let env = setup_test_environment();
    env.host().register(env.plugin("1.0.0"))?;

    let host = env.host();

    assert!(host.installed().contains("schema/schema.php"));
    let raw: Option<Value> = env.options.get_typed(constants::INSTALLED_PLUGINS_OPTION)?;
    assert_eq!(
        raw.and_then(|v| v["plugins"]["schema/schema.php"]["version"].as_str().map(String::from)),
        Some("1.0.0".to_string())
    );
    assert!(host.deactivate_host().is_err());
    Ok(())
}
