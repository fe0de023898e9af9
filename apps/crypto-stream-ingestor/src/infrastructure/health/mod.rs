//! Health Check and Metrics Endpoint
//!
//! # Endpoints
//!
//! - `GET /health` - JSON status with feed state and ingest counters
//! - `GET /healthz` - liveness probe
//! - `GET /readyz` - readiness probe (feed connected)
//! - `GET /metrics` - Prometheus text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::feed_state::{ConnectionState, FeedState, IngestCounters};
use crate::infrastructure::metrics::get_metrics_handle;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Ingestor version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Feed connection state.
    pub feed: ConnectionState,
    /// Last successful authentication.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Last feed error, if any.
    pub error: Option<String>,
    /// Ingest counters.
    pub ingest: IngestCounters,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Feed connected.
    Healthy,
    /// Feed reconnecting.
    Degraded,
    /// Feed down or in error.
    Unhealthy,
}

impl From<ConnectionState> for HealthStatus {
    fn from(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Connected => Self::Healthy,
            ConnectionState::Reconnecting => Self::Degraded,
            ConnectionState::Disconnected | ConnectionState::Error => Self::Unhealthy,
        }
    }
}

/// Shared state for the health server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    feed: Arc<FeedState>,
}

impl HealthServerState {
    /// Create new health server state.
    #[must_use]
    pub fn new(version: String, feed: Arc<FeedState>) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            feed,
        }
    }

    fn snapshot(&self) -> HealthResponse {
        let state = self.feed.state();
        HealthResponse {
            status: state.into(),
            version: self.version.clone(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            current_time: Utc::now(),
            feed: state,
            last_connected_at: self.feed.last_connected_at(),
            error: self.feed.error_message(),
            ingest: self.feed.counters(),
        }
    }
}

/// Build the health router.
pub fn router(state: Arc<HealthServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Health check HTTP server.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Serve until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the server stops with
    /// an error.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Health server listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = state.snapshot();
    let code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if state.feed.is_connected() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    fn app(feed: &Arc<FeedState>) -> Router {
        router(Arc::new(HealthServerState::new(
            "0.1.0".to_string(),
            Arc::clone(feed),
        )))
    }

    async fn get_status(app: Router, uri: &str) -> StatusCode {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[test]
    fn status_follows_connection_state() {
        assert_eq!(
            HealthStatus::from(ConnectionState::Connected),
            HealthStatus::Healthy
        );
        assert_eq!(
            HealthStatus::from(ConnectionState::Reconnecting),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::from(ConnectionState::Error),
            HealthStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn health_is_unavailable_until_connected() {
        let feed = Arc::new(FeedState::new());
        assert_eq!(
            get_status(app(&feed), "/health").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(app(&feed), "/readyz").await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        feed.set_state(ConnectionState::Connected);
        assert_eq!(get_status(app(&feed), "/health").await, StatusCode::OK);
        assert_eq!(get_status(app(&feed), "/readyz").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn liveness_always_ok() {
        let feed = Arc::new(FeedState::new());
        assert_eq!(get_status(app(&feed), "/healthz").await, StatusCode::OK);
    }

    #[test]
    fn snapshot_carries_counters() {
        let feed = Arc::new(FeedState::new());
        feed.increment_received();
        feed.increment_written();
        let state = HealthServerState::new("1.2.3".to_string(), Arc::clone(&feed));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.version, "1.2.3");
        assert_eq!(snapshot.ingest.records_received, 1);
        assert_eq!(snapshot.ingest.points_written, 1);
        assert_eq!(snapshot.feed, ConnectionState::Disconnected);
    }
}
