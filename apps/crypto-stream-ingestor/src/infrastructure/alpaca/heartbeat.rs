//! Connection Liveness
//!
//! Pings on a fixed interval and declares the connection dead when nothing
//! has arrived within the timeout after a ping.

use std::time::{Duration, Instant};

/// Heartbeat timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Interval between pings.
    pub ping_interval: Duration,
    /// Silence tolerated after a ping.
    pub pong_timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(20),
            pong_timeout: Duration::from_secs(20),
        }
    }
}

impl HeartbeatConfig {
    /// Create a configuration.
    #[must_use]
    pub const fn new(ping_interval: Duration, pong_timeout: Duration) -> Self {
        Self {
            ping_interval,
            pong_timeout,
        }
    }
}

/// Action to take on an interval tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Send a ping frame.
    SendPing,
    /// Connection is dead.
    Timeout,
}

/// Per-connection heartbeat state, driven by the connection's select loop.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    config: HeartbeatConfig,
    last_activity: Instant,
    ping_sent_at: Option<Instant>,
}

impl HeartbeatMonitor {
    /// Start monitoring a fresh connection.
    #[must_use]
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            last_activity: Instant::now(),
            ping_sent_at: None,
        }
    }

    /// Ping interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.config.ping_interval
    }

    /// Record any inbound frame (data, pong, ping).
    pub fn record_activity(&mut self) {
        self.last_activity = Instant::now();
        self.ping_sent_at = None;
    }

    /// Decide what to do on a tick.
    pub fn on_tick(&mut self) -> HeartbeatAction {
        self.on_tick_at(Instant::now())
    }

    fn on_tick_at(&mut self, now: Instant) -> HeartbeatAction {
        if let Some(sent) = self.ping_sent_at
            && now.saturating_duration_since(sent) > self.config.pong_timeout
            && now.saturating_duration_since(self.last_activity) > self.config.pong_timeout
        {
            tracing::warn!(
                silent_secs = now.saturating_duration_since(self.last_activity).as_secs(),
                timeout_secs = self.config.pong_timeout.as_secs(),
                "Heartbeat timeout detected"
            );
            return HeartbeatAction::Timeout;
        }
        if self.ping_sent_at.is_none() {
            self.ping_sent_at = Some(now);
        }
        HeartbeatAction::SendPing
    }
}
