/// Framework name
pub const APP_NAME: &str = "Pluguin";

/// Framework version reported by every kernel
pub const FRAMEWORK_VERSION: &str = "0.1.0";

/// Option record holding the installed-plugins registry
pub const INSTALLED_PLUGINS_OPTION: &str = "pluguin";

/// Default option record for the migration repository
pub const DEFAULT_MIGRATIONS_OPTION: &str = "migrations";

/// Config file stem looked up under the base path
pub const CONFIG_FILE_STEM: &str = "config";

/// Cached provider manifest, relative to the base path
pub const SERVICES_MANIFEST: &str = "bootstrap/cache/services.json";

/// Default database directory
pub const DATABASE_DIR: &str = "database";

/// Default storage directory
pub const STORAGE_DIR: &str = "storage";

/// Default bootstrap directory
pub const BOOTSTRAP_DIR: &str = "bootstrap";
