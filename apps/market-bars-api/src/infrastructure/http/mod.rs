//! HTTP Surface
//!
//! - `GET /stocks/bars?symbols=..&timeframe=..&start=..&end=..`
//! - `GET /health`

pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::ports::HistoricalBarsPort;
use crate::application::services::BarsQueryService;

pub use error::ApiError;

/// Shared request context, immutable after startup.
#[derive(Clone)]
pub struct AppState {
    /// Bars query service.
    pub bars: Arc<BarsQueryService<dyn HistoricalBarsPort>>,
}

impl AppState {
    /// Build state over a data source.
    #[must_use]
    pub fn new(source: Arc<dyn HistoricalBarsPort>) -> Self {
        Self {
            bars: Arc::new(BarsQueryService::new(source)),
        }
    }
}

/// Create the router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/stocks/bars", get(handlers::get_stock_bars))
        .with_state(state)
}

/// API server.
pub struct ApiServer {
    port: u16,
    state: AppState,
    cancel: CancellationToken,
}

impl ApiServer {
    /// Create a server.
    #[must_use]
    pub const fn new(port: u16, state: AppState, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Serve on `0.0.0.0:<port>` until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if binding fails or the server stops with an
    /// error.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Market bars API listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| ServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Market bars API stopped");
        Ok(())
    }
}

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}
