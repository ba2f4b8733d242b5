//! Tracker configuration.

use std::time::Duration;

/// Session tracker configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Bounded ingress depth; events submitted while full are dropped.
    pub queue_capacity: usize,
    /// Idle threshold after which an HLS session is flushed.
    pub session_timeout: Duration,
    /// Fail-safe upper bound for Icecast sessions that never receive their
    /// disconnect callback.
    pub icecast_session_timeout: Duration,
    /// How often expirations are evaluated.
    pub reaper_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            session_timeout: Duration::from_secs(60),
            icecast_session_timeout: Duration::from_secs(24 * 3600),
            reaper_interval: Duration::from_secs(10),
        }
    }
}
