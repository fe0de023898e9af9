//! Ingest Worker
//!
//! Drains the feed event queue in arrival order. Every record becomes one
//! point written through the [`PointSink`]; a failed write is retried with
//! backoff before the next record is taken off the queue, so writes never
//! reorder and a transient store outage does not lose data.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{PointSink, SinkError, StreamEvent};
use crate::application::services::backoff::{BackoffConfig, BackoffPolicy};
use crate::application::services::feed_state::{ConnectionState, FeedState};
use crate::domain::market_data::MarketRecord;
use crate::infrastructure::metrics;

/// Outcome of writing one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Store accepted the point.
    Written,
    /// Point was given up on after a permanent error or exhausted retries.
    Dropped,
    /// Shutdown interrupted the retry loop.
    Cancelled,
}

/// Consumes [`StreamEvent`]s and writes records to a sink.
pub struct IngestWorker<S: PointSink + ?Sized> {
    sink: Arc<S>,
    state: Arc<FeedState>,
    retry: BackoffConfig,
    shutdown: CancellationToken,
}

impl<S: PointSink + ?Sized> IngestWorker<S> {
    /// Create a worker.
    pub const fn new(
        sink: Arc<S>,
        state: Arc<FeedState>,
        retry: BackoffConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            sink,
            state,
            retry,
            shutdown,
        }
    }

    /// Run until every sender of the queue is gone.
    ///
    /// Shutdown does not stop the drain: records already queued are still
    /// written in order once the feed client drops its sender. Cancellation
    /// only cuts short a retry against an unavailable store, which ends the
    /// run with the remaining events undelivered.
    pub async fn run(&self, mut rx: mpsc::Receiver<StreamEvent>) {
        while let Some(event) = rx.recv().await {
            if self.handle_event(event).await == Some(WriteOutcome::Cancelled) {
                rx.close();
                let mut abandoned = 0usize;
                while rx.recv().await.is_some() {
                    abandoned += 1;
                }
                tracing::warn!(abandoned, "Ingest worker stopped during write retry");
                return;
            }
        }
        tracing::info!("Feed event queue closed");
    }

    /// Apply one event. Returns the write outcome for record events.
    pub async fn handle_event(&self, event: StreamEvent) -> Option<WriteOutcome> {
        match event {
            StreamEvent::Connected => {
                self.state.set_state(ConnectionState::Connected);
                metrics::set_feed_connected(true);
                tracing::info!("Crypto feed connected");
                None
            }
            StreamEvent::Disconnected => {
                self.state.set_state(ConnectionState::Disconnected);
                metrics::set_feed_connected(false);
                tracing::warn!("Crypto feed disconnected");
                None
            }
            StreamEvent::Reconnecting { attempt } => {
                self.state.set_state(ConnectionState::Reconnecting);
                self.state.increment_reconnect_attempts();
                metrics::record_reconnect();
                tracing::info!(attempt, "Crypto feed reconnecting");
                None
            }
            StreamEvent::Subscribed { quotes, bars } => {
                tracing::info!(?quotes, ?bars, "Crypto subscriptions confirmed");
                None
            }
            StreamEvent::Error(msg) => {
                self.state.set_error(msg.clone());
                metrics::record_feed_error();
                tracing::error!(error = %msg, "Crypto feed error");
                None
            }
            StreamEvent::Record(record) => Some(self.write_record(&record).await),
        }
    }

    /// Write one record, retrying transient failures.
    pub async fn write_record(&self, record: &MarketRecord) -> WriteOutcome {
        self.state.increment_received();
        metrics::record_received(record.kind());

        let point = record.to_point();
        let mut policy = BackoffPolicy::new(self.retry.clone());

        loop {
            let started = Instant::now();
            let result = self.sink.write(&point).await;
            metrics::record_write_duration(started.elapsed());

            let err = match result {
                Ok(()) => {
                    self.state.increment_written();
                    metrics::record_written(record.kind());
                    tracing::debug!(
                        kind = record.kind(),
                        symbol = record.symbol(),
                        timestamp = %record.timestamp(),
                        "Point written"
                    );
                    return WriteOutcome::Written;
                }
                Err(err) => err,
            };

            self.state.increment_write_failures();
            metrics::record_write_failure(failure_reason(&err));

            if !err.is_retryable() {
                return self.drop_record(record, &err);
            }

            let Some(delay) = policy.next_delay() else {
                return self.drop_record(record, &err);
            };

            tracing::warn!(
                kind = record.kind(),
                attempt = policy.attempt_count(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "Write failed, retrying"
            );

            tokio::select! {
                () = self.shutdown.cancelled() => {
                    tracing::warn!(kind = record.kind(), "Shutdown during write retry, record not stored");
                    return WriteOutcome::Cancelled;
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn drop_record(&self, record: &MarketRecord, err: &SinkError) -> WriteOutcome {
        self.state.increment_dropped();
        metrics::record_dropped(record.kind());
        tracing::error!(
            kind = record.kind(),
            symbol = record.symbol(),
            timestamp = %record.timestamp(),
            error = %err,
            "Dropping record"
        );
        WriteOutcome::Dropped
    }
}

const fn failure_reason(err: &SinkError) -> &'static str {
    match err {
        SinkError::Encode(_) => "encode",
        SinkError::Transport(_) => "transport",
        SinkError::Rejected { .. } => "rejected",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use mockall::Sequence;

    use super::*;
    use crate::application::ports::MockPointSink;
    use crate::domain::market_data::{Bar, Quote};
    use crate::domain::point::Point;

    fn quick_retry(max_attempts: u32) -> BackoffConfig {
        BackoffConfig::new(
            Duration::from_millis(1),
            Duration::from_millis(2),
            2.0,
            0.0,
            max_attempts,
        )
    }

    fn quote(bid: f64) -> MarketRecord {
        MarketRecord::Quote(Quote {
            symbol: "BTC/USD".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            bid_price: bid,
            bid_size: 0.5,
            ask_price: bid + 1.0,
            ask_size: 0.75,
        })
    }

    fn bar() -> MarketRecord {
        MarketRecord::Bar(Bar {
            symbol: "BTC/USD".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap(),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 10.0,
            trade_count: None,
            vwap: None,
        })
    }

    fn worker(sink: MockPointSink, max_attempts: u32) -> (IngestWorker<MockPointSink>, Arc<FeedState>) {
        let state = Arc::new(FeedState::new());
        let worker = IngestWorker::new(
            Arc::new(sink),
            Arc::clone(&state),
            quick_retry(max_attempts),
            CancellationToken::new(),
        );
        (worker, state)
    }

    #[tokio::test]
    async fn writes_quote_as_point() {
        let mut sink = MockPointSink::new();
        sink.expect_write()
            .withf(|p: &Point| {
                p.measurement() == "btc_quotes"
                    && p.tag_value("symbol") == Some("BTC/USD")
                    && p.field_value("bid_price") == Some(100.0)
            })
            .times(1)
            .returning(|_| Ok(()));

        let (worker, state) = worker(sink, 3);
        assert_eq!(worker.write_record(&quote(100.0)).await, WriteOutcome::Written);

        let counters = state.counters();
        assert_eq!(counters.records_received, 1);
        assert_eq!(counters.points_written, 1);
    }

    #[tokio::test]
    async fn retries_transient_failure_then_succeeds() {
        let mut seq = Sequence::new();
        let mut sink = MockPointSink::new();
        sink.expect_write()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(SinkError::Transport("connection reset".to_string())));
        sink.expect_write()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let (worker, state) = worker(sink, 5);
        assert_eq!(worker.write_record(&bar()).await, WriteOutcome::Written);

        let counters = state.counters();
        assert_eq!(counters.write_failures, 2);
        assert_eq!(counters.points_written, 1);
        assert_eq!(counters.records_dropped, 0);
    }

    #[tokio::test]
    async fn permanent_rejection_is_not_retried() {
        let mut sink = MockPointSink::new();
        sink.expect_write().times(1).returning(|_| {
            Err(SinkError::Rejected {
                status: 400,
                body: "unable to parse".to_string(),
            })
        });

        let (worker, state) = worker(sink, 5);
        assert_eq!(worker.write_record(&bar()).await, WriteOutcome::Dropped);
        assert_eq!(state.counters().records_dropped, 1);
    }

    #[tokio::test]
    async fn exhausted_retries_drop_record() {
        let mut sink = MockPointSink::new();
        sink.expect_write()
            .times(3)
            .returning(|_| Err(SinkError::Transport("timeout".to_string())));

        let (worker, state) = worker(sink, 2);
        assert_eq!(worker.write_record(&quote(1.0)).await, WriteOutcome::Dropped);
        assert_eq!(state.counters().write_failures, 3);
    }

    #[tokio::test]
    async fn records_are_written_in_arrival_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_sink = Arc::clone(&seen);

        let mut sink = MockPointSink::new();
        sink.expect_write().times(3).returning(move |p| {
            seen_in_sink
                .lock()
                .unwrap()
                .push(p.field_value("bid_price").unwrap_or(-1.0));
            Ok(())
        });

        let (worker, state) = worker(sink, 3);
        let (tx, rx) = mpsc::channel(8);
        tx.send(StreamEvent::Connected).await.unwrap();
        for bid in [3.0, 1.0, 2.0] {
            tx.send(StreamEvent::Record(quote(bid))).await.unwrap();
        }
        drop(tx);

        worker.run(rx).await;

        assert_eq!(*seen.lock().unwrap(), vec![3.0, 1.0, 2.0]);
        assert!(state.is_connected());
    }

    #[tokio::test]
    async fn queued_records_are_drained_after_shutdown() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_sink = Arc::clone(&seen);

        let mut sink = MockPointSink::new();
        sink.expect_write().times(3).returning(move |p| {
            seen_in_sink
                .lock()
                .unwrap()
                .push(p.field_value("bid_price").unwrap_or(-1.0));
            Ok(())
        });

        let state = Arc::new(FeedState::new());
        let shutdown = CancellationToken::new();
        let worker = IngestWorker::new(
            Arc::new(sink),
            Arc::clone(&state),
            quick_retry(3),
            shutdown.clone(),
        );

        let (tx, rx) = mpsc::channel(8);
        for bid in [7.0, 8.0, 9.0] {
            tx.send(StreamEvent::Record(quote(bid))).await.unwrap();
        }
        drop(tx);
        shutdown.cancel();

        worker.run(rx).await;

        assert_eq!(*seen.lock().unwrap(), vec![7.0, 8.0, 9.0]);
        assert_eq!(state.counters().points_written, 3);
    }

    #[tokio::test]
    async fn cancelled_retry_stops_run_without_touching_rest_of_queue() {
        let mut sink = MockPointSink::new();
        sink.expect_write()
            .times(1)
            .returning(|_| Err(SinkError::Transport("down".to_string())));

        let state = Arc::new(FeedState::new());
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let worker = IngestWorker::new(
            Arc::new(sink),
            Arc::clone(&state),
            quick_retry(0),
            shutdown,
        );

        let (tx, rx) = mpsc::channel(8);
        tx.send(StreamEvent::Record(quote(1.0))).await.unwrap();
        tx.send(StreamEvent::Record(quote(2.0))).await.unwrap();
        drop(tx);

        tokio::time::timeout(Duration::from_secs(5), worker.run(rx))
            .await
            .unwrap();
        assert_eq!(state.counters().records_received, 1);
        assert_eq!(state.counters().points_written, 0);
    }

    #[tokio::test]
    async fn control_events_update_state() {
        let (worker, state) = worker(MockPointSink::new(), 1);

        assert!(worker.handle_event(StreamEvent::Reconnecting { attempt: 1 }).await.is_none());
        assert_eq!(state.state(), ConnectionState::Reconnecting);
        assert_eq!(state.counters().reconnect_attempts, 1);

        worker
            .handle_event(StreamEvent::Error("auth timeout".to_string()))
            .await;
        assert_eq!(state.state(), ConnectionState::Error);
        assert_eq!(state.error_message().as_deref(), Some("auth timeout"));
    }

    #[tokio::test]
    async fn shutdown_interrupts_retry_loop() {
        let mut sink = MockPointSink::new();
        sink.expect_write()
            .returning(|_| Err(SinkError::Transport("down".to_string())));

        let state = Arc::new(FeedState::new());
        let shutdown = CancellationToken::new();
        let retry = BackoffConfig::new(
            Duration::from_secs(30),
            Duration::from_secs(30),
            2.0,
            0.0,
            0,
        );
        let worker = IngestWorker::new(Arc::new(sink), state, retry, shutdown.clone());

        let record = quote(5.0);
        let write = worker.write_record(&record);
        tokio::pin!(write);

        tokio::select! {
            _ = &mut write => panic!("write should be waiting on backoff"),
            () = tokio::time::sleep(Duration::from_millis(20)) => {}
        }
        shutdown.cancel();
        assert_eq!(write.await, WriteOutcome::Cancelled);
    }
}
