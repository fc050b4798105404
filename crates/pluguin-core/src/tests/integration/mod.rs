// Integration tests for pluguin-core: a host, file-backed options and a
// dependent plugin with providers, configuration and migrations.
pub mod common;
pub mod lifecycle_tests;
