//! Feed State
//!
//! Connection status and counters shared between the ingest worker (writer)
//! and the health server (reader).

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// Connection state of the upstream feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Not connected.
    #[default]
    Disconnected,
    /// Connected and authenticated.
    Connected,
    /// Waiting to reconnect.
    Reconnecting,
    /// Feed reported an error.
    Error,
}

impl ConnectionState {
    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Error => "error",
        }
    }
}

/// Shared feed status and ingest counters.
#[derive(Debug, Default)]
pub struct FeedState {
    state: RwLock<ConnectionState>,
    last_connected_at: RwLock<Option<DateTime<Utc>>>,
    error_message: RwLock<Option<String>>,
    reconnect_attempts: AtomicU32,
    records_received: AtomicU64,
    points_written: AtomicU64,
    write_failures: AtomicU64,
    records_dropped: AtomicU64,
}

impl FeedState {
    /// Create a disconnected state with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection state.
    pub fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
        if state == ConnectionState::Connected {
            *self.last_connected_at.write() = Some(Utc::now());
            self.reconnect_attempts.store(0, Ordering::Relaxed);
            *self.error_message.write() = None;
        }
    }

    /// Set an error state with message.
    pub fn set_error(&self, message: String) {
        *self.state.write() = ConnectionState::Error;
        *self.error_message.write() = Some(message);
    }

    /// Record a reconnect attempt.
    pub fn increment_reconnect_attempts(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an inbound record.
    pub fn increment_received(&self) {
        self.records_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful write.
    pub fn increment_written(&self) {
        self.points_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed write attempt.
    pub fn increment_write_failures(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a record that was given up on.
    pub fn increment_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Whether the feed is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Time of the last successful authentication.
    #[must_use]
    pub fn last_connected_at(&self) -> Option<DateTime<Utc>> {
        *self.last_connected_at.read()
    }

    /// Last error message reported by the feed.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error_message.read().clone()
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn counters(&self) -> IngestCounters {
        IngestCounters {
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            records_received: self.records_received.load(Ordering::Relaxed),
            points_written: self.points_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the ingest counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct IngestCounters {
    /// Reconnect attempts since the last successful connection.
    pub reconnect_attempts: u32,
    /// Records received from the feed.
    pub records_received: u64,
    /// Points accepted by the store.
    pub points_written: u64,
    /// Failed write attempts (including retried ones).
    pub write_failures: u64,
    /// Records dropped after the retry budget ran out.
    pub records_dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_resets_error_and_attempts() {
        let state = FeedState::new();
        state.increment_reconnect_attempts();
        state.set_error("boom".to_string());
        assert_eq!(state.state(), ConnectionState::Error);
        assert_eq!(state.error_message().as_deref(), Some("boom"));

        state.set_state(ConnectionState::Connected);
        assert!(state.is_connected());
        assert!(state.error_message().is_none());
        assert!(state.last_connected_at().is_some());
        assert_eq!(state.counters().reconnect_attempts, 0);
    }

    #[test]
    fn counters_accumulate() {
        let state = FeedState::new();
        state.increment_received();
        state.increment_received();
        state.increment_written();
        state.increment_write_failures();
        state.increment_dropped();

        let counters = state.counters();
        assert_eq!(counters.records_received, 2);
        assert_eq!(counters.points_written, 1);
        assert_eq!(counters.write_failures, 1);
        assert_eq!(counters.records_dropped, 1);
    }

    #[test]
    fn state_labels() {
        assert_eq!(ConnectionState::Connected.as_str(), "connected");
        assert_eq!(ConnectionState::Reconnecting.as_str(), "reconnecting");
        assert_eq!(
            serde_json::to_string(&ConnectionState::Disconnected).unwrap(),
            "\"disconnected\""
        );
    }
}
