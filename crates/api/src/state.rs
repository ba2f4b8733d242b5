//! Application state shared across handlers.

use std::path::PathBuf;
use std::sync::Arc;

use tracker::SessionTracker;

/// Static-serving parameters.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    /// Directory tree the origin serves.
    pub root_dir: PathBuf,
    /// Query parameter carrying the session id.
    pub sid_param: String,
    /// Cookie (and query parameter) carrying the user id.
    pub uid_param: String,
    /// Extension of segment files, including the dot.
    pub chunk_ext: String,
    /// MIME type for segments; derived from the extension when empty.
    pub chunk_mime: String,
}

impl ServeConfig {
    fn resolve_mime(mut self) -> Self {
        if self.chunk_mime.is_empty() {
            self.chunk_mime = mime_guess::from_ext(self.chunk_ext.trim_start_matches('.'))
                .first_raw()
                .unwrap_or("application/octet-stream")
                .to_string();
        }
        self
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Session tracker; `None` when no sink is configured, in which case
    /// handlers serve without submitting events.
    pub tracker: Option<Arc<SessionTracker>>,
    pub serve: Arc<ServeConfig>,
}

impl AppState {
    pub fn new(serve: ServeConfig, tracker: Option<Arc<SessionTracker>>) -> Self {
        Self {
            tracker,
            serve: Arc::new(serve.resolve_mime()),
        }
    }
}
