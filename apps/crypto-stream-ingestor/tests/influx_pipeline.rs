//! InfluxDB Pipeline Integration Tests
//!
//! Drives `IngestWorker` into a real `InfluxWriter` against a mock
//! InfluxDB v2 write endpoint.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crypto_stream_ingestor::{
    BackoffConfig, Bar, ConnectionState, FeedState, InfluxSettings, InfluxWriter, IngestWorker,
    MarketRecord, PointSink, Quote, SinkError, StreamEvent, WriteOutcome,
};

fn ts() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-03-12T11:59:38.897261568Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn quote() -> Quote {
    Quote {
        symbol: "BTC/USD".to_string(),
        timestamp: ts(),
        bid_price: 42000.5,
        bid_size: 0.25,
        ask_price: 42001.0,
        ask_size: 1.5,
    }
}

fn bar() -> Bar {
    Bar {
        symbol: "BTC/USD".to_string(),
        timestamp: ts(),
        open: 100.0,
        high: 101.5,
        low: 99.0,
        close: 100.8,
        volume: 12.5,
        trade_count: Some(42.0),
        vwap: None,
    }
}

fn writer_for(server: &MockServer) -> Arc<InfluxWriter> {
    let settings = InfluxSettings::new("test-token".to_string()).with_host(server.uri());
    Arc::new(InfluxWriter::new(&settings).unwrap())
}

fn fast_retry(max_attempts: u32) -> BackoffConfig {
    BackoffConfig::new(
        Duration::from_millis(1),
        Duration::from_millis(5),
        2.0,
        0.0,
        max_attempts,
    )
}

const QUOTE_LINE: &str = "btc_quotes,symbol=BTC/USD bid_price=42000.5,bid_size=0.25,ask_price=42001,ask_size=1.5 1710244778897261568";
const BAR_LINE: &str = "btc_bars,symbol=BTC/USD open=100,high=101.5,low=99,close=100.8,volume=12.5,trade_count=42 1710244778897261568";

#[tokio::test]
async fn writer_posts_line_protocol_with_org_bucket_and_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/write"))
        .and(query_param("org", "Dev"))
        .and(query_param("bucket", "Bitcoin"))
        .and(query_param("precision", "ns"))
        .and(header("Authorization", "Token test-token"))
        .and(body_string(QUOTE_LINE))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let writer = writer_for(&server);
    writer.write(&quote().to_point()).await.unwrap();
}

#[tokio::test]
async fn writer_reports_rejection_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("partial write: field type conflict"))
        .mount(&server)
        .await;

    let writer = writer_for(&server);
    let err = writer.write(&bar().to_point()).await.unwrap_err();

    match err {
        SinkError::Rejected { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("field type conflict"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_host_is_transport_error() {
    let settings =
        InfluxSettings::new("test-token".to_string()).with_host("http://127.0.0.1:1");
    let writer = InfluxWriter::new(&settings).unwrap();

    let err = writer.write(&quote().to_point()).await.unwrap_err();
    assert!(matches!(err, SinkError::Transport(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn worker_retries_unavailable_store_until_written() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/write"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v2/write"))
        .and(body_string(BAR_LINE))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let state = Arc::new(FeedState::new());
    let worker = IngestWorker::new(
        writer_for(&server),
        Arc::clone(&state),
        fast_retry(0),
        CancellationToken::new(),
    );

    let outcome = worker.write_record(&MarketRecord::Bar(bar())).await;
    assert_eq!(outcome, WriteOutcome::Written);

    let counters = state.counters();
    assert_eq!(counters.points_written, 1);
    assert_eq!(counters.write_failures, 2);
    assert_eq!(counters.records_dropped, 0);
}

#[tokio::test]
async fn worker_drains_queue_in_arrival_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/write"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let state = Arc::new(FeedState::new());
    let worker = IngestWorker::new(
        writer_for(&server),
        Arc::clone(&state),
        fast_retry(3),
        CancellationToken::new(),
    );

    let (tx, rx) = mpsc::channel(16);
    tx.send(StreamEvent::Connected).await.unwrap();
    tx.send(StreamEvent::Record(MarketRecord::Quote(quote())))
        .await
        .unwrap();
    tx.send(StreamEvent::Record(MarketRecord::Bar(bar())))
        .await
        .unwrap();
    drop(tx);

    tokio::time::timeout(Duration::from_secs(5), worker.run(rx))
        .await
        .expect("worker should stop when the queue closes");

    let bodies: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .map(|r| String::from_utf8(r.body).unwrap())
        .collect();
    assert_eq!(bodies, vec![QUOTE_LINE.to_string(), BAR_LINE.to_string()]);

    assert_eq!(state.state(), ConnectionState::Connected);
    assert_eq!(state.counters().records_received, 2);
    assert_eq!(state.counters().points_written, 2);
}
