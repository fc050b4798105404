pub mod bootstrapper_tests;
pub mod container_tests;
pub mod provider_tests;
