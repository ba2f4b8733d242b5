//! HTTP layer for the origin: media handlers, the Icecast callback,
//! playlist rewriting, and TLS hot-reload.

pub mod paths;
pub mod playlist;
pub mod routes;
pub mod state;
pub mod tls;

pub use routes::router;
pub use state::{AppState, ServeConfig};
