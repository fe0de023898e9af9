//! Application Services
//!
//! - `IngestWorker`: drains feed events and writes points in order
//! - `FeedState`: connection status shared with the health server
//! - `BackoffPolicy`: retry timing for reconnects and writes

pub mod backoff;
pub mod feed_state;
pub mod ingest;

pub use backoff::{BackoffConfig, BackoffPolicy};
pub use feed_state::{ConnectionState, FeedState, IngestCounters};
pub use ingest::{IngestWorker, WriteOutcome};
