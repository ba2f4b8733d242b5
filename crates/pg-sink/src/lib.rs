//! Postgres bulk-copy adapter for the session tracker.

pub mod config;
pub mod schema;
pub mod sink;

pub use config::PgConfig;
pub use sink::PgSink;
