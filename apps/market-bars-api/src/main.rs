//! Market Bars API Binary
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin market-bars-api
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `ALPACA_KEY`: Alpaca API key
//! - `ALPACA_SECRET`: Alpaca API secret
//!
//! ## Optional
//! - `ALPACA_DATA_URL`: market data base URL (default: <https://data.alpaca.markets>)
//! - `ALPACA_FEED`: `sip` or `iex`
//! - `BARS_API_PORT`: listener port (default: 8000)
//! - `OTEL_ENABLED`, `OTEL_EXPORTER_OTLP_ENDPOINT`, `OTEL_SERVICE_NAME`
//! - `RUST_LOG`: log filter

use std::sync::Arc;

use anyhow::Context;
use market_bars_api::infrastructure::telemetry;
use market_bars_api::{AlpacaBarsClient, ApiConfig, ApiServer, AppState};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();

    let _telemetry_guard = telemetry::init();

    let config = ApiConfig::from_env()?;
    tracing::info!(
        port = config.port,
        data_url = %config.data_api.base_url,
        feed = ?config.data_api.feed,
        "Starting market bars API"
    );

    let client = AlpacaBarsClient::new(config.credentials.clone(), &config.data_api)
        .context("failed to build market data client")?;
    let state = AppState::new(Arc::new(client));

    let shutdown_token = CancellationToken::new();
    let server = ApiServer::new(config.port, state, shutdown_token.clone());
    let mut server_handle = tokio::spawn(server.run());

    let finished = tokio::select! {
        () = await_shutdown(shutdown_token) => None,
        result = &mut server_handle => Some(result),
    };
    match finished {
        Some(result) => result??,
        None => server_handle.await??,
    }

    Ok(())
}

/// Load `.env` from the current directory or the nearest ancestor.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        for dir in cwd.ancestors().skip(1) {
            let env_path = dir.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
        }
    }
}

/// Cancel `shutdown_token` on SIGINT/SIGTERM.
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, initiating shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, initiating shutdown"),
    }

    shutdown_token.cancel();
}
