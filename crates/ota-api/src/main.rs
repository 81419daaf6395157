//! # ota-api — Binary Entry Point
//!
//! Starts the firmware server. HTTPS when `OTA_TLS_CERT` and `OTA_TLS_KEY`
//! are both set, plain HTTP (with a warning) when neither is.

use std::time::Duration;

use ota_api::bootstrap::bootstrap;
use ota_api::state::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuration error: {e}");
        e
    })?;
    let addr = config.socket_addr();
    let tls = config.tls.clone();

    let boot = bootstrap(config).map_err(|e| {
        tracing::error!("Bootstrap failed: {e}");
        e
    })?;

    #[cfg(unix)]
    boot.reloader.spawn_on_sighup()?;

    let app = ota_api::app(boot.state);

    match tls {
        Some(tls) => {
            let rustls = axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .map_err(|e| {
                    tracing::error!(cert = %tls.cert.display(), "Failed to load TLS material: {e}");
                    e
                })?;

            let handle = axum_server::Handle::new();
            let shutdown = handle.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                shutdown.graceful_shutdown(Some(Duration::from_secs(10)));
            });

            tracing::info!("OTA firmware server listening on https://{addr}");
            axum_server::bind_rustls(addr, rustls)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            tracing::warn!(
                "OTA_TLS_CERT/OTA_TLS_KEY not set; serving plain HTTP. The API key travels in cleartext."
            );
            tracing::info!("OTA firmware server listening on http://{addr}");
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    tracing::info!("OTA firmware server stopped");
    Ok(())
}

/// Structured logging. `RUST_LOG` filters (default `info`); `LOG_FORMAT=json`
/// switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
