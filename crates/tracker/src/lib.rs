//! The session-tracking actor: a bounded ingress, a single-owner session
//! store, periodic reaping and sampling, and durable flushes into the sink.

pub mod config;
pub mod store;
pub mod tracker;

pub use config::TrackerConfig;
pub use store::SessionStore;
pub use tracker::SessionTracker;
