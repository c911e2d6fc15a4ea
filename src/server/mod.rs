pub mod api;

use crate::cli::Args;
use crate::relay::ChatRelay;
use self::api::{ build_router, AppState };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use log::{ error, info, warn };

pub struct Server {
    addr: SocketAddr,
    relay: Arc<ChatRelay>,
    args: Args,
}

impl Server {
    pub fn new(relay: Arc<ChatRelay>, args: Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let addr = format!("{}:{}", args.host, args.port)
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid listen address {}:{}: {}", args.host, args.port, e))?;
        Ok(Self { addr, relay, args })
    }

    fn tls_paths(&self) -> Result<Option<(&str, &str)>, Box<dyn Error + Send + Sync>> {
        if !self.args.enable_tls {
            info!("TLS not enabled. Serving plain HTTP.");
            return Ok(None);
        }
        match (&self.args.tls_cert_path, &self.args.tls_key_path) {
            (Some(cert_path), Some(key_path)) => Ok(Some((cert_path.as_str(), key_path.as_str()))),
            (Some(_), None) | (None, Some(_)) => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                Err("Missing TLS certificate or key path".into())
            }
            (None, None) => {
                error!("--enable-tls was set but no certificate/key paths provided.");
                Err("TLS enabled without cert/key".into())
            }
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let state = AppState::new(self.relay.clone(), self.args.requests_per_second);
        let app = build_router(state, &self.args.allowed_origins)?;

        if let Some((cert_path, key_path)) = self.tls_paths()? {
            info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);
            if rustls::crypto::ring::default_provider().install_default().is_err() {
                warn!("A rustls crypto provider was already installed; keeping it.");
            }
            let tls_config = axum_server::tls_rustls::RustlsConfig
                ::from_pem_file(cert_path, key_path).await?;

            info!("Server is running on https://{}", self.addr);
            axum_server::bind_rustls(self.addr, tls_config).serve(app.into_make_service()).await?;
        } else {
            let listener = tokio::net::TcpListener
                ::bind(self.addr).await
                .map_err(|e| format!("Failed to bind HTTP server to {}: {}. Try a different port.", self.addr, e))?;

            info!("Server is running on http://{}", self.addr);
            axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
        }

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
