//! Crypto Stream Ingestor Binary
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin crypto-stream-ingestor
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `ALPACA_KEY`: Alpaca API key
//! - `ALPACA_SECRET`: Alpaca API secret
//! - `INFLUXDB_TOKEN`: InfluxDB API token
//!
//! ## Optional
//! - `ALPACA_CRYPTO_STREAM_URL`: crypto feed URL
//! - `INGESTOR_HEALTH_PORT`: health/metrics HTTP port (default: 8083)
//! - `INGESTOR_QUEUE_CAPACITY`: feed-to-writer queue size (default: 1024)
//! - `INGESTOR_WRITE_MAX_ATTEMPTS`: write retries per point, 0 = unlimited (default: 0)
//! - `INGESTOR_HEARTBEAT_INTERVAL_SECS` / `INGESTOR_HEARTBEAT_TIMEOUT_SECS` (default: 20 / 20)
//! - `INGESTOR_RECONNECT_DELAY_INITIAL_MS` / `INGESTOR_RECONNECT_DELAY_MAX_SECS` (default: 1000 / 64)
//! - `INGESTOR_RECONNECT_MAX_ATTEMPTS`: 0 = unlimited (default: 0)
//! - `OTEL_ENABLED`, `OTEL_EXPORTER_OTLP_ENDPOINT`, `OTEL_SERVICE_NAME`
//! - `RUST_LOG`: log filter

use std::sync::Arc;

use anyhow::Context;
use crypto_stream_ingestor::infrastructure::telemetry;
use crypto_stream_ingestor::{
    CryptoStreamClient, CryptoStreamConfig, FeedState, HealthServer, HealthServerState,
    InfluxWriter, IngestPipeline, IngestWorker, IngestorConfig, StreamEvent, init_metrics,
};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting crypto stream ingestor");

    let _metrics_handle = init_metrics().context("failed to install Prometheus recorder")?;

    let config = IngestorConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();
    let feed_state = Arc::new(FeedState::new());

    let health_server = HealthServer::new(
        config.health_port,
        Arc::new(HealthServerState::new(
            env!("CARGO_PKG_VERSION").to_string(),
            Arc::clone(&feed_state),
        )),
        shutdown_token.clone(),
    );

    let sink =
        Arc::new(InfluxWriter::new(&config.influx).context("failed to build InfluxDB client")?);

    let (event_tx, event_rx) = mpsc::channel::<StreamEvent>(config.ingest.queue_capacity);

    let client = Arc::new(CryptoStreamClient::new(
        CryptoStreamConfig::from_ingestor_config(&config),
        event_tx,
        shutdown_token.clone(),
    ));

    let worker = IngestWorker::new(
        sink,
        Arc::clone(&feed_state),
        config.ingest.write_retry.clone(),
        shutdown_token.clone(),
    );

    let pipeline = IngestPipeline::new(client, worker, event_rx, shutdown_token.clone());

    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    tracing::info!(symbol = %config.symbol, "Ingestor ready");

    let result = pipeline.run(await_shutdown()).await;
    tracing::info!(counters = ?feed_state.counters(), "Ingestor stopped");
    result?;
    Ok(())
}

fn log_config(config: &IngestorConfig) {
    tracing::info!(
        symbol = %config.symbol,
        stream_url = %config.websocket.url,
        influx_host = %config.influx.host,
        influx_org = %config.influx.org,
        influx_database = %config.influx.database,
        health_port = config.health_port,
        queue_capacity = config.ingest.queue_capacity,
        write_max_attempts = config.ingest.write_retry.max_attempts,
        "Configuration loaded"
    );
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

/// Resolve on SIGINT/SIGTERM.
async fn await_shutdown() {
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
}
