pub mod auth;
pub mod config;
pub mod middleware;
pub mod search;
pub mod server;

use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Server error: {0}")]
    Server(String),
}

/// How long in-flight requests get to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub async fn run(config_path: Option<&str>, debug_logs: bool) -> Result<(), ServerError> {
    let mut config = match config_path {
        Some(path) => {
            info!("Using config file: {}", path);
            config::Config::from_file(path)?
        }
        None => config::Config::default(),
    };
    config.apply_env();

    if debug_logs {
        info!("Debug logging enabled");
    }
    if config.development {
        warn!("Development mode: upstream errors are returned to clients");
    }

    let state = server::AppState::from_config(config.clone())?;
    info!(
        "Proxying searches to {}",
        config.upstream.baseurl.as_deref().unwrap_or_default()
    );

    let address = config.listen.address.as_deref().unwrap_or("[::]");
    let port = &config.listen.port;
    let addr: SocketAddr = format!("{}:{}", address, port)
        .parse()
        .map_err(|e| ServerError::Server(format!("Invalid address: {}", e)))?;

    let app = server::build_router(state);

    match (&config.listen.tlscert, &config.listen.tlskey) {
        (Some(cert_path), Some(key_path)) => {
            info!("Loading TLS certificate from {}", cert_path);
            info!("Loading TLS key from {}", key_path);

            install_crypto_provider();

            let tls_config =
                axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path)
                    .await
                    .map_err(|e| ServerError::Server(format!("Failed to load TLS config: {}", e)))?;

            let handle = shutdown_handle();

            info!("Serving HTTPS on {}", addr);

            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;
        }
        _ => {
            info!("Serving HTTP on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|e| ServerError::Server(format!("Failed to bind: {}", e)))?;

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;
        }
    }

    info!("Server stopped");
    Ok(())
}

/// rustls needs a process-wide crypto provider before the TLS config is built.
fn install_crypto_provider() {
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }
}

/// Handle for the TLS server that starts a graceful shutdown on SIGINT/SIGTERM.
fn shutdown_handle() -> axum_server::Handle<SocketAddr> {
    let handle = axum_server::Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });
    handle
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down gracefully...");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_crypto_provider_twice() {
        install_crypto_provider();
        install_crypto_provider();
        assert!(rustls::crypto::CryptoProvider::get_default().is_some());
    }

    #[tokio::test]
    async fn test_shutdown_handle() {
        let handle = shutdown_handle();
        assert_eq!(handle.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_run_rejects_missing_config_file() {
        let result = run(Some("/nonexistent/moviegate.yaml"), false).await;
        assert!(matches!(
            result,
            Err(ServerError::Config(config::ConfigError::ReadError(..)))
        ));
    }
}
