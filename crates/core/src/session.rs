//! The session aggregate and its enrichment from a first event.

use std::net::IpAddr;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use woothee::parser::Parser;

use crate::event::{classify_chunk_path, mount_from_path, ChunkEvent, Codec, Quality, Source};

/// User-agent classification captured once, at session creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UaProfile {
    pub browser: String,
    pub browser_version: String,
    pub device: String,
    pub os: String,
    pub is_desktop: bool,
    pub is_mobile: bool,
    pub is_tablet: bool,
    pub is_tv: bool,
    pub is_bot: bool,
    pub is_android: bool,
    pub is_ios: bool,
    pub is_windows: bool,
    pub is_linux: bool,
    pub is_mac: bool,
    pub is_openbsd: bool,
    pub is_chromeos: bool,
    pub is_chrome: bool,
    pub is_firefox: bool,
    pub is_safari: bool,
    pub is_edge: bool,
    pub is_opera: bool,
    pub is_samsung_browser: bool,
    pub is_vivaldi: bool,
    pub is_yandex_browser: bool,
}

/// Wraps the woothee parser.
///
/// One instance lives on the tracker worker and is consulted exactly once per
/// session, at creation; later events for a live session never re-parse.
pub struct UaEnricher {
    parser: Parser,
}

impl UaEnricher {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    /// Classifies a raw user-agent string. An empty string yields the
    /// all-zero profile.
    pub fn profile(&self, ua: &str) -> UaProfile {
        if ua.is_empty() {
            return UaProfile::default();
        }

        let mut p = UaProfile::default();
        if let Some(result) = self.parser.parse(ua) {
            if !result.name.is_empty() && result.name != "UNKNOWN" {
                p.browser = result.name.to_string();
            }
            if !result.version.is_empty() && result.version != "UNKNOWN" {
                p.browser_version = result.version.to_string();
            }
            if !result.os.is_empty() && result.os != "UNKNOWN" {
                p.os = result.os.to_string();
            }

            // woothee categories: pc, smartphone, mobilephone, crawler,
            // appliance, misc.
            p.device = match result.category {
                "pc" => "desktop",
                "smartphone" | "mobilephone" => "mobile",
                "appliance" => "tv",
                "crawler" => "bot",
                _ => "",
            }
            .to_string();
            p.is_desktop = result.category == "pc";
            p.is_mobile = matches!(result.category, "smartphone" | "mobilephone");
            p.is_tv = result.category == "appliance";
            p.is_bot = result.category == "crawler";

            p.is_android = result.os == "Android";
            p.is_ios = matches!(result.os, "iPhone" | "iPad" | "iPod");
            p.is_windows = result.os.starts_with("Windows");
            p.is_linux = result.os == "Linux";
            p.is_mac = result.os == "Mac OSX";

            p.is_chrome = p.browser == "Chrome";
            p.is_firefox = p.browser == "Firefox";
            p.is_safari = p.browser == "Safari";
            p.is_edge = p.browser == "Edge";
            p.is_opera = p.browser == "Opera";
        }

        // Families woothee has no category for; classified from raw tokens.
        p.is_tablet = p.is_tablet || ua.contains("iPad") || ua.contains("Tablet");
        p.is_openbsd = p.is_openbsd || ua.contains("OpenBSD");
        p.is_chromeos = p.is_chromeos || ua.contains("CrOS");
        p.is_samsung_browser = ua.contains("SamsungBrowser");
        p.is_vivaldi = ua.contains("Vivaldi");
        p.is_yandex_browser = ua.contains("YaBrowser");

        p
    }
}

impl Default for UaEnricher {
    fn default() -> Self {
        Self::new()
    }
}

/// The in-memory aggregate of all deliveries attributed to one listener over
/// a contiguous active period.
///
/// Everything except `last_active`, `total_bytes` and `duration` is set once
/// at creation and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Session {
    pub sid: Uuid,
    pub uid: Uuid,
    pub source: Source,
    pub mount: String,
    pub start_time: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    /// Set when the session is handed to the sink: `last_active - start_time`.
    pub duration: Duration,
    pub total_bytes: i64,
    pub codec: Codec,
    pub quality: Quality,
    pub ip: Option<IpAddr>,
    pub referer: String,
    /// Icecast client id backing the auxiliary index entry; zero for HLS.
    pub icecast_id: i64,
    pub ua: UaProfile,
}

impl Session {
    /// Builds a session seed from the first event of a listener. This is the
    /// only place the user-agent parser runs.
    pub fn from_event(event: &ChunkEvent, enricher: &UaEnricher) -> Self {
        let (codec, quality) = classify_chunk_path(&event.path);
        let mount = if event.mount.is_empty() {
            mount_from_path(&event.path)
        } else {
            event.mount.clone()
        };

        Self {
            sid: parse_uuid(&event.sid),
            uid: parse_uuid(&event.uid),
            source: event.source,
            mount,
            start_time: event.time,
            last_active: event.time,
            duration: Duration::zero(),
            total_bytes: event.chunk_size,
            codec,
            quality,
            ip: parse_ip(&event.ip),
            referer: event.referer.clone(),
            icecast_id: event.icecast_id,
            ua: enricher.profile(&event.user_agent),
        }
    }
}

/// Parses a textual UUID, mapping failures (and empty strings) to the
/// all-zero sentinel bucket.
pub fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap_or_else(|_| Uuid::nil())
}

/// Strips a trailing `:port` from a remote address by splitting once on `:`
/// and keeping the left side, then parses the remainder.
///
/// IPv6 literals contain `:` themselves and therefore degrade to `None` here.
pub fn parse_ip(addr: &str) -> Option<IpAddr> {
    addr.split(':').next().and_then(|host| host.parse().ok())
}
