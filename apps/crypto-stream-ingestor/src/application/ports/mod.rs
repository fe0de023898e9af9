//! Port Interfaces
//!
//! Contracts between the ingest pipeline and the outside world.
//!
//! ## Driven Ports (Outbound)
//!
//! - `PointSink`: writes one point to the time-series store
//!
//! ## Driver Ports (Inbound)
//!
//! - `StreamEvent`: what the feed client pushes onto the ingest queue

use async_trait::async_trait;

use crate::domain::market_data::MarketRecord;
use crate::domain::point::{LineProtocolError, Point};

/// Errors returned by a point sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Point could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] LineProtocolError),

    /// Transport-level failure talking to the store.
    #[error("transport error: {0}")]
    Transport(String),

    /// Store answered with a non-success status.
    #[error("store rejected write ({status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
}

impl SinkError {
    /// Whether retrying the same point can succeed.
    ///
    /// Encoding errors and 4xx rejections (other than 408/429) are permanent.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Encode(_) => false,
            Self::Transport(_) => true,
            Self::Rejected { status, .. } => {
                !(*status >= 400 && *status < 500) || *status == 408 || *status == 429
            }
        }
    }
}

/// Time-series sink accepting one point per call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PointSink: Send + Sync {
    /// Write a single point.
    async fn write(&self, point: &Point) -> Result<(), SinkError>;
}

/// Events pushed by the feed client onto the ingest queue.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Connected and authenticated.
    Connected,
    /// Connection lost.
    Disconnected,
    /// Waiting before the next connection attempt.
    Reconnecting {
        /// Reconnection attempt number.
        attempt: u32,
    },
    /// Server confirmed the active subscriptions.
    Subscribed {
        /// Quote symbols.
        quotes: Vec<String>,
        /// Bar symbols.
        bars: Vec<String>,
    },
    /// Normalized market record.
    Record(MarketRecord),
    /// Error reported by the feed after authentication.
    Error(String),
}
