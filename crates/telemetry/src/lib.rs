//! Logging setup shared by the binary and the integration tests.

pub mod tracing_setup;

pub use tracing_setup::init_tracing_from_env;
