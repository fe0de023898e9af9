//! Historical Bars Integration Tests
//!
//! Runs the router over a real `AlpacaBarsClient` pointed at a mock
//! market data API.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use market_bars_api::{
    AlpacaBarsClient, AppState, BarsRequest, Credentials, DataApiSettings, HistoricalBarsPort,
    HistoricalDataError, TimeFrame, TimeFrameUnit, router,
};

fn settings(server: &MockServer, feed: Option<&str>) -> DataApiSettings {
    DataApiSettings {
        base_url: server.uri(),
        feed: feed.map(str::to_string),
        timeout: Duration::from_secs(5),
        page_limit: 10_000,
    }
}

fn client(server: &MockServer, feed: Option<&str>) -> AlpacaBarsClient {
    AlpacaBarsClient::new(
        Credentials::new("test-key".to_string(), "test-secret".to_string()),
        &settings(server, feed),
    )
    .unwrap()
}

fn app(server: &MockServer) -> Router {
    router(AppState::new(Arc::new(client(server, None))))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn bar(t: &str, o: f64, c: f64) -> Value {
    json!({"t": t, "o": o, "h": o.max(c) + 1.0, "l": o.min(c) - 1.0, "c": c, "v": 1000, "n": 10, "vw": o})
}

fn request() -> BarsRequest {
    BarsRequest {
        symbols: vec!["AAPL".to_string(), "MSFT".to_string()],
        timeframe: TimeFrame::new(1, TimeFrameUnit::Day),
        start: chrono::DateTime::from_timestamp_millis(1_704_067_200_000).unwrap(),
        end: chrono::DateTime::from_timestamp_millis(1_704_326_400_000).unwrap(),
    }
}

#[tokio::test]
async fn client_sends_wire_parameters_and_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/stocks/bars"))
        .and(query_param("symbols", "AAPL,MSFT"))
        .and(query_param("timeframe", "1Day"))
        .and(query_param("start", "2024-01-01T00:00:00+00:00"))
        .and(query_param("end", "2024-01-04T00:00:00+00:00"))
        .and(query_param("limit", "10000"))
        .and(query_param("feed", "iex"))
        .and(query_param_is_missing("page_token"))
        .and(header("APCA-API-KEY-ID", "test-key"))
        .and(header("APCA-API-SECRET-KEY", "test-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bars": {"AAPL": [bar("2024-01-02T05:00:00Z", 187.15, 185.64)]},
            "next_page_token": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let table = client(&server, Some("iex")).get_bars(&request()).await.unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.rows()[0].symbol, "AAPL");
}

#[tokio::test]
async fn pages_are_followed_and_merged_by_symbol_then_time() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/stocks/bars"))
        .and(query_param_is_missing("page_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bars": {
                "AAPL": [bar("2024-01-02T05:00:00Z", 1.0, 2.0)],
                "MSFT": [bar("2024-01-02T05:00:00Z", 10.0, 11.0)]
            },
            "next_page_token": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/stocks/bars"))
        .and(query_param("page_token", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bars": {
                "AAPL": [bar("2024-01-03T05:00:00Z", 2.0, 3.0)],
                "MSFT": [bar("2024-01-03T05:00:00Z", 11.0, 12.0)]
            },
            "next_page_token": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = get(
        app(&server),
        "/stocks/bars?symbols=MSFT&symbols=AAPL&timeframe=1Day&start=1704067200000&end=1704326400000",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let opens: Vec<f64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["o"].as_f64().unwrap())
        .collect();
    assert_eq!(opens, vec![1.0, 2.0, 10.0, 11.0]);
    assert_eq!(body[0]["t"], json!(1_704_171_600_000_i64));
    assert_eq!(body[1]["t"], json!(1_704_258_000_000_i64));
}

#[tokio::test]
async fn repeated_page_token_ends_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/stocks/bars"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bars": {"AAPL": [bar("2024-01-02T05:00:00Z", 1.0, 2.0)]},
            "next_page_token": "stuck"
        })))
        .expect(4)
        .mount(&server)
        .await;

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        client(&server, None).get_bars(&request()),
    )
    .await
    .expect("pagination should stop")
    .unwrap_err();
    assert!(matches!(err, HistoricalDataError::Decode(ref msg) if msg.contains("stuck")));

    let (status, body) = get(
        app(&server),
        "/stocks/bars?symbols=AAPL&timeframe=1Day&start=1704067200000&end=1704153600000",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("repeated"));
}

#[tokio::test]
async fn empty_result_is_empty_array() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/stocks/bars"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"bars": {}, "next_page_token": null})),
        )
        .mount(&server)
        .await;

    let (status, body) = get(
        app(&server),
        "/stocks/bars?symbols=AAPL&timeframe=15Min&start=1704067200000&end=1704153600000",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn upstream_rejection_is_bad_request_with_error_text() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/stocks/bars"))
        .respond_with(ResponseTemplate::new(403).set_body_string(r#"{"message":"forbidden."}"#))
        .mount(&server)
        .await;

    let (status, body) = get(
        app(&server),
        "/stocks/bars?symbols=AAPL&timeframe=1Day&start=1704067200000&end=1704153600000",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("403"), "{detail}");
    assert!(detail.contains("forbidden."), "{detail}");
}

#[tokio::test]
async fn undecodable_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/stocks/bars"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client(&server, None).get_bars(&request()).await.unwrap_err();
    assert!(matches!(err, HistoricalDataError::Decode(_)));
}

#[tokio::test]
async fn bogus_timeframe_never_reaches_upstream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (status, body) = get(
        app(&server),
        "/stocks/bars?symbols=AAPL&timeframe=bogus&start=1704067200000&end=1704153600000",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"],
        "timeframe must look like '1Day', '1Hour', or '15Min'."
    );
}

#[tokio::test]
async fn epoch_past_year_9999_is_rejected_locally() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (status, body) = get(
        app(&server),
        "/stocks/bars?symbols=AAPL&timeframe=1Day&start=1704067200000&end=253402300800000",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"],
        "Invalid epoch milliseconds: 253402300800000"
    );
}

#[tokio::test]
async fn health_ignores_upstream_state() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (status, body) = get(app(&server), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}
