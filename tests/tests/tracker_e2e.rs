//! End-to-end tests for the session tracker against the mock sink.
//!
//! These drive the real actor: bounded ingress, worker, reaper, cancellation.
//! Event timestamps are placed in the past so the wall-clock reaper expires
//! them on its first ticks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Duration as ChronoDuration, Utc};
use integration_tests::eventually;
use integration_tests::fixtures::{hls_event, icecast_event};
use integration_tests::mocks::MockSink;
use origin_core::{Codec, Quality, Source};
use tracker::{SessionTracker, TrackerConfig};
use uuid::Uuid;

fn fast_config() -> TrackerConfig {
    TrackerConfig {
        queue_capacity: 64,
        session_timeout: Duration::from_millis(50),
        icecast_session_timeout: Duration::from_secs(3600),
        reaper_interval: Duration::from_millis(20),
    }
}

#[tokio::test]
async fn idle_hls_session_is_flushed_once() {
    let sink = MockSink::new();
    let tracker = SessionTracker::new(fast_config(), Arc::new(sink.clone()));

    let t0 = Utc::now() - ChronoDuration::seconds(120);
    let sid = "11111111-1111-1111-1111-111111111111";
    let uid = "22222222-2222-2222-2222-222222222222";
    let path = "/radio1/mp3_hifi_1700000000_6.000_42.ts";

    assert!(tracker.submit(hls_event(sid, uid, path, 1000, t0)));
    assert!(tracker.submit(hls_event(
        sid,
        uid,
        path,
        2000,
        t0 + ChronoDuration::seconds(30)
    )));

    eventually(|| sink.session_count() == 1).await;

    let flushed = sink.flushed_sessions();
    let s = &flushed[0];
    assert_eq!(s.sid, Uuid::parse_str(sid).unwrap());
    assert_eq!(s.uid, Uuid::parse_str(uid).unwrap());
    assert_eq!(s.source, Source::Hls);
    assert_eq!(s.codec, Codec::Mp3);
    assert_eq!(s.quality, Quality::Hifi);
    assert_eq!(s.total_bytes, 3000);
    assert_eq!(s.start_time, t0);
    assert_eq!(s.last_active, t0 + ChronoDuration::seconds(30));
    assert_eq!(s.duration, ChronoDuration::seconds(30));
    assert_eq!(s.ip, Some("10.0.0.1".parse().unwrap()));
    assert_eq!(s.mount, "radio1");

    tracker.shutdown(Duration::from_secs(1)).await;
    assert_eq!(sink.session_count(), 1, "no duplicate flush on shutdown");
    assert!(sink.is_closed());
    assert_eq!(tracker.dropped_count(), 0);
    assert_eq!(tracker.flush_error_count(), 0);
}

#[tokio::test]
async fn malformed_sids_coalesce_into_one_flushed_row() {
    let sink = MockSink::new();
    let tracker = SessionTracker::new(fast_config(), Arc::new(sink.clone()));

    let t0 = Utc::now() - ChronoDuration::seconds(120);
    tracker.submit(hls_event(
        "not-a-uuid",
        "22222222-2222-2222-2222-222222222222",
        "/radio1/mp3_hifi_1_2_3.ts",
        100,
        t0,
    ));
    tracker.submit(hls_event(
        "not-a-uuid",
        "33333333-3333-3333-3333-333333333333",
        "/radio1/mp3_hifi_1_2_3.ts",
        200,
        t0 + ChronoDuration::seconds(1),
    ));

    eventually(|| sink.session_count() == 1).await;

    let flushed = sink.flushed_sessions();
    assert_eq!(flushed[0].sid, Uuid::nil());
    assert_eq!(
        flushed[0].uid,
        Uuid::parse_str("22222222-2222-2222-2222-222222222222").unwrap(),
        "uid comes from the first event"
    );
    assert_eq!(flushed[0].total_bytes, 300);

    tracker.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn icecast_disconnect_expires_and_remints() {
    let sink = MockSink::new();
    let tracker = SessionTracker::new(fast_config(), Arc::new(sink.clone()));

    let t0 = Utc::now() - ChronoDuration::seconds(60);
    tracker.submit(icecast_event(7, "m", t0));
    tracker.submit(icecast_event(7, "m", t0 + ChronoDuration::seconds(10)));

    eventually(|| sink.session_count() == 1).await;
    let first = sink.flushed_sessions()[0].clone();
    assert_eq!(first.source, Source::Icecast);
    assert_eq!(first.mount, "m");
    assert_eq!(first.duration, ChronoDuration::seconds(10));

    // The mapping for client 7 was removed with the session; a later
    // sighting mints a fresh session id.
    tracker.submit(icecast_event(7, "m", Utc::now()));
    tracker.shutdown(Duration::from_secs(1)).await;

    let flushed = sink.flushed_sessions();
    assert_eq!(flushed.len(), 2);
    assert_ne!(flushed[1].sid, first.sid);
}

#[tokio::test]
async fn overflow_drops_events_and_counts_them() {
    let sink = MockSink::new();
    let config = TrackerConfig {
        queue_capacity: 4,
        ..TrackerConfig::default()
    };
    let tracker = SessionTracker::new(config, Arc::new(sink));

    // Single-threaded test runtime and no awaits between submits: the worker
    // cannot drain the queue while the burst is in flight.
    let t0 = Utc::now();
    let mut accepted = 0;
    for i in 0..10 {
        let sid = format!("00000000-0000-0000-0000-0000000000{i:02}");
        if tracker.submit(hls_event(&sid, "", "/radio1/mp3_hifi_1_2_3.ts", 100, t0)) {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 4);
    assert_eq!(tracker.dropped_count(), 6);

    tracker.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn shutdown_deadline_cancels_a_hung_sink() {
    let sink = MockSink::hanging();
    let config = TrackerConfig {
        queue_capacity: 128,
        session_timeout: Duration::from_secs(60),
        icecast_session_timeout: Duration::from_secs(3600),
        reaper_interval: Duration::from_secs(10),
    };
    let tracker = SessionTracker::new(config, Arc::new(sink.clone()));

    let t0 = Utc::now();
    for i in 0..50 {
        let sid = format!("00000000-0000-0000-0000-0000000000{i:02}");
        assert!(tracker.submit(hls_event(&sid, "", "/radio1/mp3_hifi_1_2_3.ts", 100, t0)));
    }

    let started = Instant::now();
    tracker.shutdown(Duration::from_millis(100)).await;
    let elapsed = started.elapsed();

    assert!(
        elapsed >= Duration::from_millis(90),
        "shutdown returned before the deadline: {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_secs(2),
        "shutdown did not honor the deadline: {elapsed:?}"
    );
    assert!(tracker.flush_error_count() >= 1);
    assert_eq!(sink.session_count(), 0, "the hung copy never completed");
    assert!(sink.is_closed());
}

#[tokio::test]
async fn shutdown_is_idempotent_and_closes_the_ingress() {
    let sink = MockSink::new();
    let tracker = SessionTracker::new(fast_config(), Arc::new(sink.clone()));

    tracker.shutdown(Duration::from_secs(1)).await;
    tracker.shutdown(Duration::from_secs(1)).await;
    assert!(sink.is_closed());

    // Submits after shutdown are refused without counting as drops.
    let refused = tracker.submit(hls_event(
        "11111111-1111-1111-1111-111111111111",
        "",
        "/radio1/mp3_hifi_1_2_3.ts",
        100,
        Utc::now(),
    ));
    assert!(!refused);
    assert_eq!(tracker.dropped_count(), 0);
}

#[tokio::test]
async fn failed_flushes_are_counted_and_dropped() {
    let sink = MockSink::new();
    sink.set_should_fail(true);
    let tracker = SessionTracker::new(fast_config(), Arc::new(sink.clone()));

    let t0 = Utc::now() - ChronoDuration::seconds(120);
    tracker.submit(hls_event(
        "11111111-1111-1111-1111-111111111111",
        "",
        "/radio1/mp3_hifi_1_2_3.ts",
        100,
        t0,
    ));

    eventually(|| tracker.flush_error_count() >= 1).await;
    assert_eq!(sink.session_count(), 0, "the batch was dropped, not retried");

    tracker.shutdown(Duration::from_secs(1)).await;
}
