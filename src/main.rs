//! HLS origin server.
//!
//! Serves HLS playlists and media segments from a local directory tree over
//! TLS, attributes each delivered segment to a listening session, and flushes
//! session records and listener-count snapshots into Postgres. An out-of-band
//! endpoint accepts Icecast listener-authentication callbacks and folds them
//! into the same session model.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use api::{router, AppState, ServeConfig};
use pg_sink::{PgConfig, PgSink};
use telemetry::init_tracing_from_env;
use tokio::signal;
use tracker::{SessionTracker, TrackerConfig};
use tracing::{error, info};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_addr")]
    addr: String,
    /// Root directory to serve.
    #[serde(default = "default_root")]
    root: String,
    #[serde(default = "default_sid")]
    sid_param: String,
    #[serde(default = "default_uid")]
    uid_param: String,
    #[serde(default = "default_chunk_ext")]
    chunk_ext: String,
    /// MIME type for segments; derived from the extension when empty.
    #[serde(default)]
    chunk_mime: String,

    #[serde(default = "default_true")]
    tls: bool,
    #[serde(default)]
    tls_cert: String,
    #[serde(default)]
    tls_key: String,

    /// Postgres connection string; empty disables session tracking.
    #[serde(default)]
    database_url: String,
    #[serde(default = "default_session_timeout")]
    session_timeout_secs: u64,
    #[serde(default = "default_icecast_timeout")]
    icecast_session_timeout_secs: u64,
    #[serde(default = "default_queue_capacity")]
    queue_capacity: usize,
    #[serde(default = "default_reaper_interval")]
    reaper_interval_secs: u64,

    /// Upper bound for draining HTTP and flushing sessions on shutdown.
    #[serde(default = "default_shutdown_grace")]
    shutdown_grace_secs: u64,
}

fn default_addr() -> String {
    "0.0.0.0:6443".to_string()
}

fn default_root() -> String {
    ".".to_string()
}

fn default_sid() -> String {
    "sid".to_string()
}

fn default_uid() -> String {
    "uid".to_string()
}

fn default_chunk_ext() -> String {
    ".ts".to_string()
}

fn default_true() -> bool {
    true
}

fn default_session_timeout() -> u64 {
    60
}

fn default_icecast_timeout() -> u64 {
    24 * 3600
}

fn default_queue_capacity() -> usize {
    10_000
}

fn default_reaper_interval() -> u64 {
    10
}

fn default_shutdown_grace() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            root: default_root(),
            sid_param: default_sid(),
            uid_param: default_uid(),
            chunk_ext: default_chunk_ext(),
            chunk_mime: String::new(),
            tls: true,
            tls_cert: String::new(),
            tls_key: String::new(),
            database_url: String::new(),
            session_timeout_secs: default_session_timeout(),
            icecast_session_timeout_secs: default_icecast_timeout(),
            queue_capacity: default_queue_capacity(),
            reaper_interval_secs: default_reaper_interval(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // rustls 0.23+ requires explicit crypto provider selection before any TLS
    // operation.
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing_from_env();

    let config = load_config()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.addr,
        root = %config.root,
        tls = config.tls,
        tracking = !config.database_url.is_empty(),
        "starting hls origin"
    );

    if config.tls && (config.tls_cert.is_empty() || config.tls_key.is_empty()) {
        anyhow::bail!("TLS is enabled but tls_cert and tls_key are not set");
    }

    let tracker = if config.database_url.is_empty() {
        None
    } else {
        let sink = PgSink::connect(&PgConfig {
            conn_string: config.database_url.clone(),
        })
        .await
        .context("failed to connect to the session sink")?;

        if let Err(e) = sink.init_schema().await {
            // Tables may already exist or the role may lack DDL rights.
            error!(error = %e, "failed to initialize sink schema");
        }

        Some(Arc::new(SessionTracker::new(
            TrackerConfig {
                queue_capacity: config.queue_capacity,
                session_timeout: Duration::from_secs(config.session_timeout_secs),
                icecast_session_timeout: Duration::from_secs(config.icecast_session_timeout_secs),
                reaper_interval: Duration::from_secs(config.reaper_interval_secs),
            },
            Arc::new(sink),
        )))
    };

    let root_dir = std::fs::canonicalize(&config.root)
        .with_context(|| format!("root directory {:?}", config.root))?;

    let state = AppState::new(
        ServeConfig {
            root_dir,
            sid_param: config.sid_param.clone(),
            uid_param: config.uid_param.clone(),
            chunk_ext: config.chunk_ext.clone(),
            chunk_mime: config.chunk_mime.clone(),
        },
        tracker.clone(),
    );

    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    let addr: SocketAddr = config.addr.parse().context("invalid listen address")?;
    let grace = Duration::from_secs(config.shutdown_grace_secs);

    // Drain in-flight requests first, then flush the tracker: once the
    // listener is down no new submissions can arrive on the closed ingress.
    let handle = axum_server::Handle::new();
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("shutting down, draining in-flight requests");
            handle.graceful_shutdown(Some(grace));
        });
    }

    if config.tls {
        let tls = api::tls::rustls_config(&config.tls_cert, &config.tls_key)
            .await
            .context("failed to load TLS keypair")?;
        info!("listening on https://{addr}");
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app)
            .await
            .context("server error")?;
    } else {
        info!("listening on http://{addr}");
        axum_server::bind(addr)
            .handle(handle)
            .serve(app)
            .await
            .context("server error")?;
    }

    if let Some(tracker) = tracker {
        tracker.shutdown(grace).await;
        info!(
            dropped = tracker.dropped_count(),
            flush_errors = tracker.flush_error_count(),
            "session tracker stopped"
        );
    }

    info!("shutdown complete");
    Ok(())
}

/// Load configuration from defaults, an optional config file, and
/// `ORIGIN_`-prefixed environment variables.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .prefix("ORIGIN")
                .try_parsing(true),
        )
        .build()
        .context("failed to build configuration")?;

    config
        .try_deserialize()
        .context("failed to deserialize configuration")
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C signal");
        }
        _ = terminate => {
            info!("received terminate signal");
        }
    }
}
