//! Handler tests: media serving, playlist rewriting, and the Icecast
//! callback, driven through the real router.

use std::sync::Arc;
use std::time::Duration;

use api::{router, AppState, ServeConfig};
use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::eventually;
use integration_tests::mocks::MockSink;
use origin_core::{Codec, Quality, Source};
use tracker::{SessionTracker, TrackerConfig};
use uuid::Uuid;

const CHUNK_NAME: &str = "mp3_hifi_1700000000_6.000_42.ts";
const CHUNK_BODY: &[u8] = b"not really mpeg-ts";

fn media_root() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let mount = dir.path().join("radio1");
    std::fs::create_dir(&mount).expect("mount dir");
    std::fs::write(mount.join(CHUNK_NAME), CHUNK_BODY).expect("chunk");
    std::fs::write(
        mount.join("live.m3u8"),
        "#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXTINF:6.0,\nmp3_hifi_1700000000_6.000_42.ts\n",
    )
    .expect("playlist");
    dir
}

fn serve_config(root: &tempfile::TempDir) -> ServeConfig {
    ServeConfig {
        root_dir: root.path().to_path_buf(),
        sid_param: "sid".to_string(),
        uid_param: "uid".to_string(),
        chunk_ext: ".ts".to_string(),
        chunk_mime: String::new(),
    }
}

fn tracked_state(root: &tempfile::TempDir, sink: &MockSink) -> AppState {
    let tracker = SessionTracker::new(
        TrackerConfig {
            queue_capacity: 64,
            session_timeout: Duration::from_millis(50),
            icecast_session_timeout: Duration::from_secs(3600),
            reaper_interval: Duration::from_millis(20),
        },
        Arc::new(sink.clone()),
    );
    AppState::new(serve_config(root), Some(Arc::new(tracker)))
}

#[tokio::test]
async fn chunk_delivery_is_served_and_attributed() {
    let root = media_root();
    let sink = MockSink::new();
    let server = TestServer::new(router(tracked_state(&root, &sink))).expect("test server");

    let sid = "11111111-1111-1111-1111-111111111111";
    let response = server
        .get("/radio1/mp3_hifi_1700000000_6.000_42.ts")
        .add_query_param("sid", sid)
        .add_query_param("uid", "22222222-2222-2222-2222-222222222222")
        .await;

    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), CHUNK_BODY);
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "video/mp2t"
    );
    assert_eq!(response.header("cache-control").to_str().unwrap(), "no-cache");

    // The delivery becomes a session; the fast reaper flushes it to the sink.
    eventually(|| sink.session_count() == 1).await;
    let s = sink.flushed_sessions()[0].clone();
    assert_eq!(s.sid, Uuid::parse_str(sid).unwrap());
    assert_eq!(s.source, Source::Hls);
    assert_eq!(s.mount, "radio1");
    assert_eq!(s.codec, Codec::Mp3);
    assert_eq!(s.quality, Quality::Hifi);
    assert_eq!(s.total_bytes, CHUNK_BODY.len() as i64);
}

#[tokio::test]
async fn playlist_is_rewritten_with_session_params() {
    let root = media_root();
    let server = TestServer::new(router(AppState::new(serve_config(&root), None)))
        .expect("test server");

    let response = server
        .get("/radio1/live.m3u8")
        .add_query_param("sid", "fixed-sid")
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "application/vnd.apple.mpegurl"
    );

    let body = response.text();
    assert!(body.starts_with("#EXTM3U\n"));
    assert!(
        body.contains("mp3_hifi_1700000000_6.000_42.ts?sid=fixed-sid&uid="),
        "segment URI must carry the session params: {body}"
    );

    // A uid cookie is minted for new listeners.
    let set_cookie = response.header("set-cookie");
    let set_cookie = set_cookie.to_str().unwrap();
    assert!(set_cookie.starts_with("uid="));
    assert!(set_cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn existing_uid_cookie_is_reused() {
    let root = media_root();
    let server = TestServer::new(router(AppState::new(serve_config(&root), None)))
        .expect("test server");

    let response = server
        .get("/radio1/live.m3u8")
        .add_header("cookie", "uid=known-listener")
        .await;

    response.assert_status_ok();
    assert!(response.text().contains("&uid=known-listener"));
}

#[tokio::test]
async fn head_requests_return_metadata_only() {
    let root = media_root();
    let server = TestServer::new(router(AppState::new(serve_config(&root), None)))
        .expect("test server");

    let response = server
        .method(
            axum::http::Method::HEAD,
            "/radio1/mp3_hifi_1700000000_6.000_42.ts",
        )
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.header("content-length").to_str().unwrap(),
        CHUNK_BODY.len().to_string()
    );
    assert!(response.as_bytes().is_empty());
}

#[tokio::test]
async fn non_media_paths_are_rejected() {
    let root = media_root();
    std::fs::write(root.path().join("radio1").join("secret.txt"), b"nope").unwrap();
    let server = TestServer::new(router(AppState::new(serve_config(&root), None)))
        .expect("test server");

    server
        .get("/radio1/secret.txt")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get("/radio1/missing.ts")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .post("/radio1/live.m3u8")
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn icecast_callback_validates_its_params() {
    let root = media_root();
    let sink = MockSink::new();
    let server = TestServer::new(router(tracked_state(&root, &sink))).expect("test server");

    // Missing agent.
    server
        .get("/_in/icecast")
        .add_query_param("mount", "m")
        .add_query_param("ip", "203.0.113.9")
        .add_query_param("client", "7")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    // Zero client id.
    server
        .get("/_in/icecast")
        .add_query_param("mount", "m")
        .add_query_param("ip", "203.0.113.9")
        .add_query_param("agent", "foobar2000/2.0")
        .add_query_param("client", "0")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(sink.session_count(), 0);
}

#[tokio::test]
async fn icecast_connect_and_disconnect_produce_one_session() {
    let root = media_root();
    let sink = MockSink::new();
    let server = TestServer::new(router(tracked_state(&root, &sink))).expect("test server");

    for _ in 0..2 {
        let response = server
            .get("/_in/icecast")
            .add_query_param("mount", "m")
            .add_query_param("ip", "203.0.113.9")
            .add_query_param("agent", "foobar2000/2.0")
            .add_query_param("client", "7")
            .await;
        response.assert_status(StatusCode::NO_CONTENT);
        assert_eq!(response.header("icecast-auth-user").to_str().unwrap(), "1");
    }

    // The second callback is the disconnect; the next reap flushes.
    eventually(|| sink.session_count() == 1).await;
    let s = sink.flushed_sessions()[0].clone();
    assert_eq!(s.source, Source::Icecast);
    assert_eq!(s.mount, "m");
    assert_eq!(s.ip, Some("203.0.113.9".parse().unwrap()));
}
