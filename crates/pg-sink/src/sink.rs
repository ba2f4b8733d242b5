//! Bulk-copy sink over a single pooled Postgres connection.

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use origin_core::{Error, ListenerSample, Result, Session, SessionSink};
use tokio_postgres::binary_copy::BinaryCopyInWriter;
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;
use tracing::info;
use uuid::Uuid;

use crate::config::PgConfig;
use crate::schema;

/// Postgres adapter implementing the tracker's sink contract.
///
/// The pool is pinned to one connection: every copy is issued serially by the
/// tracker worker, so a single physical connection is both the minimum and
/// the maximum, and there is nothing to contend for during shutdown.
pub struct PgSink {
    pool: Pool,
}

impl PgSink {
    /// Parses the connection string, builds the pool, and verifies the
    /// database is reachable. This is the only fatal path; later copy
    /// failures are counted and logged by the tracker instead.
    pub async fn connect(cfg: &PgConfig) -> Result<Self> {
        let pg_config: tokio_postgres::Config = cfg
            .conn_string
            .parse()
            .map_err(|e: tokio_postgres::Error| Error::config(e.to_string()))?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(manager)
            .max_size(1)
            .build()
            .map_err(|e| Error::config(e.to_string()))?;

        let client = pool.get().await.map_err(|e| Error::sink(e.to_string()))?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| Error::sink(e.to_string()))?;
        drop(client);

        info!("connected to session sink");
        Ok(Self { pool })
    }

    /// Applies the `CREATE TABLE IF NOT EXISTS` DDL. Best-effort at startup;
    /// the tables may already exist or the role may lack DDL rights.
    pub async fn init_schema(&self) -> Result<()> {
        let client = self.pool.get().await.map_err(|e| Error::sink(e.to_string()))?;
        client
            .batch_execute(schema::CREATE_SESSIONS)
            .await
            .map_err(|e| Error::sink(e.to_string()))?;
        client
            .batch_execute(schema::CREATE_LISTENERS_TOTAL)
            .await
            .map_err(|e| Error::sink(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl SessionSink for PgSink {
    async fn copy_sessions(&self, sessions: &[Session]) -> Result<u64> {
        if sessions.is_empty() {
            return Ok(0);
        }

        let client = self.pool.get().await.map_err(|e| Error::sink(e.to_string()))?;
        let copy = client
            .copy_in(schema::copy_sessions_statement().as_str())
            .await
            .map_err(|e| Error::sink(e.to_string()))?;

        let types = schema::session_types();
        let writer = BinaryCopyInWriter::new(copy, &types);
        tokio::pin!(writer);

        for session in sessions {
            let row = SessionRow::from(session);
            writer
                .as_mut()
                .write(&row.values())
                .await
                .map_err(|e| Error::sink(e.to_string()))?;
        }

        writer.finish().await.map_err(|e| Error::sink(e.to_string()))
    }

    async fn copy_listener_counts(&self, samples: &[ListenerSample]) -> Result<u64> {
        if samples.is_empty() {
            return Ok(0);
        }

        let client = self.pool.get().await.map_err(|e| Error::sink(e.to_string()))?;
        let copy = client
            .copy_in(schema::copy_listeners_statement().as_str())
            .await
            .map_err(|e| Error::sink(e.to_string()))?;

        let types = schema::listeners_types();
        let writer = BinaryCopyInWriter::new(copy, &types);
        tokio::pin!(writer);

        for sample in samples {
            let row = ListenerRow::from(sample);
            writer
                .as_mut()
                .write(&row.values())
                .await
                .map_err(|e| Error::sink(e.to_string()))?;
        }

        writer.finish().await.map_err(|e| Error::sink(e.to_string()))
    }

    fn close(&self) {
        self.pool.close();
    }
}

/// Flattened `sessions` row in column order.
#[derive(Debug)]
struct SessionRow {
    sid: Uuid,
    uid: Uuid,
    source: i16,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    total_bytes: i64,
    codec: i16,
    quality: i16,
    ip: Option<IpAddr>,
    referer: String,
    ua_browser: String,
    ua_browser_version: String,
    ua_device: String,
    ua_os: String,
    ua_is_desktop: bool,
    ua_is_mobile: bool,
    ua_is_tablet: bool,
    ua_is_tv: bool,
    ua_is_bot: bool,
    ua_is_android: bool,
    ua_is_ios: bool,
    ua_is_windows: bool,
    ua_is_linux: bool,
    ua_is_mac: bool,
    ua_is_openbsd: bool,
    ua_is_chromeos: bool,
    ua_is_chrome: bool,
    ua_is_firefox: bool,
    ua_is_safari: bool,
    ua_is_edge: bool,
    ua_is_opera: bool,
    ua_is_samsung_browser: bool,
    ua_is_vivaldi: bool,
    ua_is_yandex_browser: bool,
}

impl From<&Session> for SessionRow {
    fn from(s: &Session) -> Self {
        Self {
            sid: s.sid,
            uid: s.uid,
            source: s.source.code(),
            start_time: s.start_time,
            end_time: s.last_active,
            total_bytes: s.total_bytes,
            codec: s.codec.code(),
            quality: s.quality.code(),
            ip: s.ip,
            referer: s.referer.clone(),
            ua_browser: s.ua.browser.clone(),
            ua_browser_version: s.ua.browser_version.clone(),
            ua_device: s.ua.device.clone(),
            ua_os: s.ua.os.clone(),
            ua_is_desktop: s.ua.is_desktop,
            ua_is_mobile: s.ua.is_mobile,
            ua_is_tablet: s.ua.is_tablet,
            ua_is_tv: s.ua.is_tv,
            ua_is_bot: s.ua.is_bot,
            ua_is_android: s.ua.is_android,
            ua_is_ios: s.ua.is_ios,
            ua_is_windows: s.ua.is_windows,
            ua_is_linux: s.ua.is_linux,
            ua_is_mac: s.ua.is_mac,
            ua_is_openbsd: s.ua.is_openbsd,
            ua_is_chromeos: s.ua.is_chromeos,
            ua_is_chrome: s.ua.is_chrome,
            ua_is_firefox: s.ua.is_firefox,
            ua_is_safari: s.ua.is_safari,
            ua_is_edge: s.ua.is_edge,
            ua_is_opera: s.ua.is_opera,
            ua_is_samsung_browser: s.ua.is_samsung_browser,
            ua_is_vivaldi: s.ua.is_vivaldi,
            ua_is_yandex_browser: s.ua.is_yandex_browser,
        }
    }
}

impl SessionRow {
    /// Field references in [`schema::SESSION_COLUMNS`] order.
    fn values(&self) -> [&(dyn ToSql + Sync); 34] {
        [
            &self.sid,
            &self.uid,
            &self.source,
            &self.start_time,
            &self.end_time,
            &self.total_bytes,
            &self.codec,
            &self.quality,
            &self.ip,
            &self.referer,
            &self.ua_browser,
            &self.ua_browser_version,
            &self.ua_device,
            &self.ua_os,
            &self.ua_is_desktop,
            &self.ua_is_mobile,
            &self.ua_is_tablet,
            &self.ua_is_tv,
            &self.ua_is_bot,
            &self.ua_is_android,
            &self.ua_is_ios,
            &self.ua_is_windows,
            &self.ua_is_linux,
            &self.ua_is_mac,
            &self.ua_is_openbsd,
            &self.ua_is_chromeos,
            &self.ua_is_chrome,
            &self.ua_is_firefox,
            &self.ua_is_safari,
            &self.ua_is_edge,
            &self.ua_is_opera,
            &self.ua_is_samsung_browser,
            &self.ua_is_vivaldi,
            &self.ua_is_yandex_browser,
        ]
    }
}

/// Flattened `listeners_total` row in column order.
#[derive(Debug)]
struct ListenerRow {
    timestamp: DateTime<Utc>,
    source: i16,
    mount: String,
    count: i64,
}

impl From<&ListenerSample> for ListenerRow {
    fn from(s: &ListenerSample) -> Self {
        Self {
            timestamp: s.timestamp,
            source: s.source.code(),
            mount: s.mount.clone(),
            count: s.count,
        }
    }
}

impl ListenerRow {
    fn values(&self) -> [&(dyn ToSql + Sync); 4] {
        [&self.timestamp, &self.source, &self.mount, &self.count]
    }
}
