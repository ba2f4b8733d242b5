//! In-memory session store, owned exclusively by the tracker worker.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use origin_core::session::parse_uuid;
use origin_core::{ChunkEvent, ListenerSample, Session, Source, UaEnricher};
use uuid::Uuid;

use crate::config::TrackerConfig;

/// Index of live sessions keyed by session UUID, plus the auxiliary
/// `icecast client id -> session UUID` index.
///
/// Accessed from no other execution context; serialization is structural, so
/// no locking is used. The icecast index holds an entry iff the corresponding
/// session is live — entries are removed in lock-step on expiry.
#[derive(Default)]
pub struct SessionStore {
    sessions: HashMap<Uuid, Session>,
    icecast_ids: HashMap<i64, Uuid>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Folds one event in.
    ///
    /// Icecast events resolve their session id through the auxiliary index,
    /// minting a fresh UUID on first sighting; HLS events parse the textual
    /// SID (nil bucket on failure). A live session only has `last_active` and
    /// `total_bytes` updated; the first event for an id creates the session
    /// via enrichment.
    pub fn apply(&mut self, event: ChunkEvent, enricher: &UaEnricher) {
        let sid = match event.source {
            Source::Icecast => *self
                .icecast_ids
                .entry(event.icecast_id)
                .or_insert_with(Uuid::new_v4),
            _ => parse_uuid(&event.sid),
        };

        if let Some(s) = self.sessions.get_mut(&sid) {
            s.last_active = event.time;
            s.total_bytes += event.chunk_size;
            return;
        }

        let mut s = Session::from_event(&event, enricher);
        s.sid = sid;
        self.sessions.insert(sid, s);
    }

    /// Removes idle sessions and returns them with `duration` set.
    ///
    /// HLS sessions expire once idle past the session timeout. Icecast sends
    /// only a connect and a disconnect callback, so those sessions expire as
    /// soon as any second event has arrived (`last_active > start_time`), or
    /// past the icecast timeout as an upper bound.
    pub fn reap(&mut self, now: DateTime<Utc>, cfg: &TrackerConfig) -> Vec<Session> {
        let dead: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|(_, s)| match s.source {
                Source::Icecast => {
                    s.last_active > s.start_time
                        || idle_longer_than(now, s, cfg.icecast_session_timeout)
                }
                _ => idle_longer_than(now, s, cfg.session_timeout),
            })
            .map(|(sid, _)| *sid)
            .collect();

        let mut expired = Vec::with_capacity(dead.len());
        for sid in dead {
            if let Some(mut s) = self.sessions.remove(&sid) {
                s.duration = s.last_active - s.start_time;
                if s.source == Source::Icecast {
                    self.icecast_ids.remove(&s.icecast_id);
                }
                expired.push(s);
            }
        }
        expired
    }

    /// Snapshot of listener counts per (source, mount), without mutation.
    ///
    /// HLS counts sessions active within the session timeout; Icecast counts
    /// sessions still waiting for their disconnect callback
    /// (`start_time == last_active`). The asymmetry follows the two-event
    /// shape of the Icecast callback.
    pub fn sample(&self, now: DateTime<Utc>, cfg: &TrackerConfig) -> Vec<ListenerSample> {
        let mut hls: HashMap<&str, i64> = HashMap::new();
        let mut icecast: HashMap<&str, i64> = HashMap::new();

        for s in self.sessions.values() {
            match s.source {
                Source::Icecast => {
                    if s.start_time == s.last_active {
                        *icecast.entry(s.mount.as_str()).or_default() += 1;
                    }
                }
                _ => {
                    if !idle_longer_than(now, s, cfg.session_timeout) {
                        *hls.entry(s.mount.as_str()).or_default() += 1;
                    }
                }
            }
        }

        let mut out = Vec::with_capacity(hls.len() + icecast.len());
        for (mount, count) in hls {
            out.push(ListenerSample {
                timestamp: now,
                source: Source::Hls,
                mount: mount.to_string(),
                count,
            });
        }
        for (mount, count) in icecast {
            out.push(ListenerSample {
                timestamp: now,
                source: Source::Icecast,
                mount: mount.to_string(),
                count,
            });
        }
        out
    }

    /// Empties the store for the final shutdown flush, setting `duration` on
    /// every session.
    pub fn drain(&mut self) -> Vec<Session> {
        self.icecast_ids.clear();
        self.sessions
            .drain()
            .map(|(_, mut s)| {
                s.duration = s.last_active - s.start_time;
                s
            })
            .collect()
    }

    #[cfg(test)]
    fn icecast_index_len(&self) -> usize {
        self.icecast_ids.len()
    }
}

fn idle_longer_than(now: DateTime<Utc>, s: &Session, timeout: Duration) -> bool {
    (now - s.last_active)
        .to_std()
        .map_or(false, |idle| idle > timeout)
}
