//! Event builders for tracker tests.

use chrono::{DateTime, Utc};
use origin_core::{ChunkEvent, Source};

/// An HLS segment-delivery event with typical provenance.
pub fn hls_event(
    sid: &str,
    uid: &str,
    path: &str,
    chunk_size: i64,
    time: DateTime<Utc>,
) -> ChunkEvent {
    ChunkEvent {
        time,
        path: path.to_string(),
        ip: "10.0.0.1:55555".to_string(),
        user_agent: "Mozilla/5.0".to_string(),
        referer: String::new(),
        sid: sid.to_string(),
        uid: uid.to_string(),
        icecast_id: 0,
        mount: String::new(),
        chunk_size,
        source: Source::Hls,
    }
}

/// An Icecast authentication-callback event.
pub fn icecast_event(client_id: i64, mount: &str, time: DateTime<Utc>) -> ChunkEvent {
    ChunkEvent {
        time,
        path: String::new(),
        ip: "203.0.113.9".to_string(),
        user_agent: "foobar2000/2.0".to_string(),
        referer: String::new(),
        sid: String::new(),
        uid: String::new(),
        icecast_id: client_id,
        mount: mount.to_string(),
        chunk_size: 0,
        source: Source::Icecast,
    }
}
