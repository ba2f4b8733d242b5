//! Contract between the tracker and the durable analytics store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::event::Source;
use crate::session::Session;
use crate::Result;

/// One row of a listener-count snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerSample {
    pub timestamp: DateTime<Utc>,
    pub source: Source,
    pub mount: String,
    pub count: i64,
}

/// Durable destination for finished sessions and listener-count snapshots.
///
/// Implementations stream rows into a named table in a fixed column order
/// over at most one connection; the tracker worker serializes every call, so
/// no internal locking is required. Cancellation is external: the tracker
/// races each call against its shutdown token and must not call again after
/// cancelling.
#[async_trait]
pub trait SessionSink: Send + Sync {
    /// Bulk-copies finished sessions into the `sessions` table. Returns the
    /// number of rows written.
    async fn copy_sessions(&self, sessions: &[Session]) -> Result<u64>;

    /// Bulk-copies one snapshot into the `listeners_total` table. Returns the
    /// number of rows written.
    async fn copy_listener_counts(&self, samples: &[ListenerSample]) -> Result<u64>;

    /// Releases the underlying connections. Called exactly once, at the end
    /// of tracker shutdown.
    fn close(&self);
}
