//! HTTP routes: the Icecast callback and the HLS fallback.

pub mod hls;
pub mod icecast;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Creates the origin router. Every path that is not the Icecast callback is
/// treated as a media request.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/_in/icecast", get(icecast::icecast_handler))
        .fallback(hls::hls_handler)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
