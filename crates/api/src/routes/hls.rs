//! The HLS media handler: playlists are rewritten with session parameters,
//! segments are streamed and attributed to a session.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use origin_core::event::mount_from_path;
use origin_core::{ChunkEvent, Source};
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::paths;
use crate::playlist;
use crate::state::AppState;

const PLAYLIST_MIME: &str = "application/vnd.apple.mpegurl";
const UID_COOKIE_DAYS: i64 = 365;

pub async fn hls_handler(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    jar: CookieJar,
    headers: axum::http::HeaderMap,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        warn!(method = %method, "method not allowed");
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let serve = &state.serve;
    let Some(path) = paths::resolve(&serve.root_dir, uri.path()) else {
        warn!(path = uri.path(), "wrong path");
        return StatusCode::NOT_FOUND.into_response();
    };

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    let is_playlist = ext == ".m3u8";
    if !is_playlist && ext != serve.chunk_ext {
        warn!(extension = %ext, "wrong file extension");
        return StatusCode::NOT_FOUND.into_response();
    }

    let meta = match tokio::fs::metadata(&path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(error = %e, "file not found");
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(e) => {
            error!(error = %e, "failed to stat file");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    if meta.is_dir() {
        warn!("directory access forbidden");
        return StatusCode::FORBIDDEN.into_response();
    }

    if method == Method::HEAD {
        let builder = if is_playlist {
            base(StatusCode::OK).header(header::CONTENT_TYPE, PLAYLIST_MIME)
        } else {
            base(StatusCode::OK)
                .header(header::CONTENT_TYPE, serve.chunk_mime.as_str())
                .header(header::CONTENT_LENGTH, meta.len())
        };
        return finish(builder, Body::empty());
    }

    let remote = connect_info
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();
    let user_agent = header_str(&headers, header::USER_AGENT);
    let referer = header_str(&headers, header::REFERER);

    let sid = match query.get(&serve.sid_param) {
        Some(v) if !v.is_empty() => v.clone(),
        _ => Uuid::new_v4().to_string(),
    };

    let (uid, jar, is_new_uid) = match jar.get(&serve.uid_param) {
        Some(cookie) => (cookie.value().to_string(), jar, false),
        None => {
            let (uid, minted) = match query.get(&serve.uid_param) {
                Some(v) if !v.is_empty() => (v.clone(), false),
                _ => (Uuid::new_v4().to_string(), true),
            };
            let cookie = Cookie::build((serve.uid_param.clone(), uid.clone()))
                .path("/")
                .max_age(time::Duration::days(UID_COOKIE_DAYS))
                .secure(true)
                .http_only(true)
                .build();
            (uid, jar.add(cookie), minted)
        }
    };

    if !is_playlist {
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                error!(error = %e, "failed to open file");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        let size = meta.len();

        info!(
            path = %path.display(),
            size,
            ip = %remote,
            user_agent,
            sid = %sid,
            uid = %uid,
            referer,
            "chunk"
        );

        if let Some(tracker) = &state.tracker {
            tracker.submit(ChunkEvent {
                time: Utc::now(),
                path: uri.path().to_string(),
                ip: remote,
                user_agent: user_agent.to_string(),
                referer: referer.to_string(),
                sid,
                uid,
                icecast_id: 0,
                mount: mount_from_path(uri.path()),
                chunk_size: size as i64,
                source: Source::Hls,
            });
        }

        let response = finish(
            base(StatusCode::OK)
                .header(header::CONTENT_TYPE, serve.chunk_mime.as_str())
                .header(header::CONTENT_LENGTH, size),
            Body::from_stream(ReaderStream::new(file)),
        );
        return (jar, response).into_response();
    }

    let contents = match tokio::fs::read_to_string(&path).await {
        Ok(contents) => contents,
        Err(e) => {
            error!(error = %e, "failed to read playlist");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let params = format!(
        "{}={}&{}={}",
        serve.sid_param, sid, serve.uid_param, uid
    );
    let body = playlist::rewrite(&contents, &params);

    info!(
        path = %path.display(),
        ip = %remote,
        user_agent,
        sid = %sid,
        uid = %uid,
        referer,
        "playlist"
    );
    if is_new_uid {
        info!(uid = %uid, "new uid");
    }

    let response = finish(
        base(StatusCode::OK).header(header::CONTENT_TYPE, PLAYLIST_MIME),
        Body::from(body),
    );
    (jar, response).into_response()
}

fn header_str(headers: &axum::http::HeaderMap, name: header::HeaderName) -> &str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn base(status: StatusCode) -> axum::http::response::Builder {
    Response::builder()
        .status(status)
        .header(header::ALLOW, "GET, HEAD, OPTIONS")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::PRAGMA, "no-cache")
        .header(header::EXPIRES, "0")
}

fn finish(builder: axum::http::response::Builder, body: Body) -> Response {
    builder
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
