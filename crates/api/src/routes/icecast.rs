//! Icecast listener-authentication callback.
//!
//! Icecast calls this endpoint once when a listener connects and once when it
//! disconnects; both are folded into the same session model as HLS events.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use origin_core::{ChunkEvent, Source};

use crate::state::AppState;

pub async fn icecast_handler(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mount = query.get("mount").cloned().unwrap_or_default();
    let ip = query.get("ip").cloned().unwrap_or_default();
    let agent = query.get("agent").cloned().unwrap_or_default();
    if mount.is_empty() || ip.is_empty() || agent.is_empty() {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let icecast_id = match query.get("client").map(|v| v.parse::<i64>()) {
        Some(Ok(id)) if id != 0 => id,
        _ => return StatusCode::BAD_REQUEST.into_response(),
    };

    if let Some(tracker) = &state.tracker {
        tracker.submit(ChunkEvent {
            time: Utc::now(),
            path: String::new(),
            ip,
            user_agent: agent,
            referer: String::new(),
            sid: String::new(),
            uid: String::new(),
            icecast_id,
            mount,
            chunk_size: 0,
            source: Source::Icecast,
        });
    }

    (StatusCode::NO_CONTENT, [("icecast-auth-user", "1")]).into_response()
}
