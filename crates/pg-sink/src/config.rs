//! Sink configuration.

use serde::{Deserialize, Serialize};

/// Postgres sink configuration.
///
/// An empty connection string disables session tracking entirely; the
/// tracker is only constructed when one is provided.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PgConfig {
    /// `postgres://` connection string.
    pub conn_string: String,
}
