//! TLS keypair loading with SIGHUP hot-reload.

use std::path::PathBuf;

use axum_server::tls_rustls::RustlsConfig;
use origin_core::{Error, Result};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

/// Loads the initial certificate and key, then spawns a task that reloads
/// them on SIGHUP. A failed reload keeps the previous keypair.
pub async fn rustls_config(cert: &str, key: &str) -> Result<RustlsConfig> {
    let cert = PathBuf::from(cert);
    let key = PathBuf::from(key);

    let config = RustlsConfig::from_pem_file(&cert, &key)
        .await
        .map_err(|e| Error::config(format!("failed to load TLS keypair: {e}")))?;

    let reload = config.clone();
    tokio::spawn(async move {
        let mut hup = match signal(SignalKind::hangup()) {
            Ok(hup) => hup,
            Err(e) => {
                error!(error = %e, "failed to install SIGHUP handler");
                return;
            }
        };
        while hup.recv().await.is_some() {
            info!("received SIGHUP, reloading TLS certificate and key");
            if let Err(e) = reload.reload_from_pem_file(&cert, &key).await {
                error!(
                    error = %e,
                    "keeping old TLS certificate because the new one could not be loaded"
                );
            }
        }
    });

    Ok(config)
}
