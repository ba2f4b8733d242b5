//! Ingress event type and media classification enums.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};

/// Origin of an event: an HLS segment delivery or an Icecast
/// authentication callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Hls,
    Icecast,
    Unknown,
}

impl Source {
    /// Numeric encoding used by the sink (`source SMALLINT`).
    pub fn code(self) -> i16 {
        match self {
            Self::Hls => 0,
            Self::Icecast => 1,
            Self::Unknown => 255,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hls => "hls",
            Self::Icecast => "icecast",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audio codec parsed from the chunk filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Aac,
    Mp3,
    Ac3,
    Eac3,
    DolbyAtmos,
    Flac,
    Opus,
    Speex,
    Vorbis,
    Unknown,
}

impl Codec {
    /// Numeric encoding used by the sink (`codec SMALLINT`).
    pub fn code(self) -> i16 {
        match self {
            Self::Aac => 0,
            Self::Mp3 => 1,
            Self::Ac3 => 2,
            Self::Eac3 => 3,
            Self::DolbyAtmos => 4,
            Self::Flac => 5,
            Self::Opus => 6,
            Self::Speex => 7,
            Self::Vorbis => 8,
            Self::Unknown => 255,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Mp3 => "mp3",
            Self::Ac3 => "ac3",
            Self::Eac3 => "eac3",
            Self::DolbyAtmos => "dolby_atmos",
            Self::Flac => "flac",
            Self::Opus => "opus",
            Self::Speex => "speex",
            Self::Vorbis => "vorbis",
            Self::Unknown => "unknown",
        }
    }

    /// Every unrecognized token maps to `Unknown`.
    pub fn parse(token: &str) -> Self {
        match token {
            "aac" => Self::Aac,
            "mp3" => Self::Mp3,
            "ac3" => Self::Ac3,
            "eac3" => Self::Eac3,
            "dolby_atmos" => Self::DolbyAtmos,
            "flac" => Self::Flac,
            "opus" => Self::Opus,
            "speex" => Self::Speex,
            "vorbis" => Self::Vorbis,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stream quality tier parsed from the chunk filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Lofi,
    Midfi,
    Hifi,
    Unknown,
}

impl Quality {
    /// Numeric encoding used by the sink (`quality SMALLINT`).
    pub fn code(self) -> i16 {
        match self {
            Self::Lofi => 0,
            Self::Midfi => 1,
            Self::Hifi => 2,
            Self::Unknown => 255,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lofi => "lofi",
            Self::Midfi => "midfi",
            Self::Hifi => "hifi",
            Self::Unknown => "unknown",
        }
    }

    /// Every unrecognized token maps to `Unknown`.
    pub fn parse(token: &str) -> Self {
        match token {
            "lofi" => Self::Lofi,
            "midfi" => Self::Midfi,
            "hifi" => Self::Hifi,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single ingress event, passed by value to the tracker.
///
/// HLS deliveries carry the request path, the textual session/user ids and
/// the segment size; Icecast callbacks carry the integer client id and the
/// mount instead.
#[derive(Debug, Clone)]
pub struct ChunkEvent {
    pub time: DateTime<Utc>,
    pub path: String,
    /// Remote address as reported by the listener; may include a port.
    pub ip: String,
    pub user_agent: String,
    pub referer: String,
    /// Textual session id; may be empty or malformed.
    pub sid: String,
    /// Textual user id; may be empty or malformed.
    pub uid: String,
    /// Icecast client id; zero for HLS events.
    pub icecast_id: i64,
    pub mount: String,
    pub chunk_size: i64,
    pub source: Source,
}

/// Classifies a segment path from its basename.
///
/// The grammar is `<codec>_<quality>_<timestamp>_<duration>_<sequence>.<ext>`,
/// five underscore-separated tokens. Anything else classifies as
/// `Unknown`/`Unknown`; the session is still created.
pub fn classify_chunk_path(path: &str) -> (Codec, Quality) {
    let Some(name) = Path::new(path).file_name().and_then(|n| n.to_str()) else {
        return (Codec::Unknown, Quality::Unknown);
    };
    let parts: Vec<&str> = name.split('_').collect();
    if parts.len() != 5 {
        return (Codec::Unknown, Quality::Unknown);
    }
    (Codec::parse(parts[0]), Quality::parse(parts[1]))
}

/// Derives the mount (stream endpoint) from the first path segment.
pub fn mount_from_path(path: &str) -> String {
    path.split('/')
        .find(|seg| !seg.is_empty())
        .unwrap_or_default()
        .to_string()
}
