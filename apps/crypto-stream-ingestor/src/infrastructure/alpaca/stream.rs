//! Crypto WebSocket Client
//!
//! Connects to `wss://stream.data.alpaca.markets/v1beta3/crypto/us`,
//! authenticates, subscribes quotes and bars, and pushes normalized records
//! onto the ingest queue. Reconnects with backoff on any connection error and
//! replays the subscription after every successful authentication.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::auth::{AUTH_TIMEOUT, AuthError, AuthHandler, AuthStep};
use super::codec::{CodecError, JsonCodec};
use super::heartbeat::{HeartbeatAction, HeartbeatConfig, HeartbeatMonitor};
use super::messages::{AlpacaMessage, SubscriptionRequest};
use crate::application::ports::StreamEvent;
use crate::application::services::backoff::{BackoffConfig, BackoffPolicy};
use crate::domain::market_data::MarketRecord;
use crate::infrastructure::config::{Credentials, IngestorConfig};
use crate::infrastructure::metrics;

/// Errors from the crypto stream client.
#[derive(Debug, thiserror::Error)]
pub enum StreamClientError {
    /// WebSocket transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Authentication failed.
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),

    /// Outbound request could not be encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// No pong or data within the heartbeat timeout.
    #[error("heartbeat timeout")]
    HeartbeatTimeout,

    /// Server closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// Ingest queue receiver is gone.
    #[error("ingest queue closed")]
    QueueClosed,

    /// Reconnect budget exhausted.
    #[error("maximum reconnection attempts exceeded")]
    MaxReconnectAttemptsExceeded,
}

/// Symbols to subscribe per channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscriptions {
    /// Quote symbols.
    pub quotes: Vec<String>,
    /// Bar symbols.
    pub bars: Vec<String>,
}

impl Subscriptions {
    /// Quotes and bars for one symbol.
    #[must_use]
    pub fn quotes_and_bars(symbol: &str) -> Self {
        Self {
            quotes: vec![symbol.to_string()],
            bars: vec![symbol.to_string()],
        }
    }

    /// Request restoring these subscriptions, if any.
    #[must_use]
    pub fn to_subscribe_request(&self) -> Option<SubscriptionRequest> {
        if self.quotes.is_empty() && self.bars.is_empty() {
            return None;
        }
        Some(
            SubscriptionRequest::subscribe()
                .with_quotes(self.quotes.clone())
                .with_bars(self.bars.clone()),
        )
    }
}

/// Crypto stream client configuration.
#[derive(Debug, Clone)]
pub struct CryptoStreamConfig {
    /// WebSocket URL.
    pub url: String,
    /// API credentials.
    pub credentials: Credentials,
    /// Channels to subscribe.
    pub subscriptions: Subscriptions,
    /// Reconnect backoff.
    pub reconnect: BackoffConfig,
    /// Heartbeat timing.
    pub heartbeat: HeartbeatConfig,
}

impl CryptoStreamConfig {
    /// Build from the ingestor configuration.
    #[must_use]
    pub fn from_ingestor_config(config: &IngestorConfig) -> Self {
        Self {
            url: config.websocket.url.clone(),
            credentials: config.credentials.clone(),
            subscriptions: Subscriptions::quotes_and_bars(&config.symbol),
            reconnect: config.websocket.reconnect.clone(),
            heartbeat: HeartbeatConfig::new(
                config.websocket.heartbeat_interval,
                config.websocket.heartbeat_timeout,
            ),
        }
    }
}

/// Crypto market data client.
pub struct CryptoStreamClient {
    config: CryptoStreamConfig,
    codec: JsonCodec,
    event_tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
}

impl CryptoStreamClient {
    /// Create a client pushing onto `event_tx`.
    #[must_use]
    pub const fn new(
        config: CryptoStreamConfig,
        event_tx: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            codec: JsonCodec::new(),
            event_tx,
            cancel,
        }
    }

    /// Connection loop. Returns on cancellation, when the ingest queue
    /// closes, or when the reconnect budget is spent.
    ///
    /// # Errors
    ///
    /// Returns `QueueClosed` or `MaxReconnectAttemptsExceeded`.
    pub async fn run(self: Arc<Self>) -> Result<(), StreamClientError> {
        let mut reconnect = BackoffPolicy::new(self.config.reconnect.clone());

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Crypto stream client cancelled");
                return Ok(());
            }

            let err = match self.connect_and_run(&mut reconnect).await {
                Ok(()) => {
                    tracing::info!("Crypto stream closed gracefully");
                    return Ok(());
                }
                Err(StreamClientError::QueueClosed) => return Err(StreamClientError::QueueClosed),
                Err(e) => e,
            };

            tracing::warn!(error = %err, "Crypto stream connection error");
            self.emit(StreamEvent::Disconnected).await?;

            let Some(delay) = reconnect.next_delay() else {
                return Err(StreamClientError::MaxReconnectAttemptsExceeded);
            };
            let attempt = reconnect.attempt_count();
            tracing::info!(
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Reconnecting to crypto stream"
            );
            self.emit(StreamEvent::Reconnecting { attempt }).await?;

            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::info!("Crypto stream client cancelled during reconnect delay");
                    return Ok(());
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn connect_and_run(&self, reconnect: &mut BackoffPolicy) -> Result<(), StreamClientError> {
        tracing::info!(url = %self.config.url, "Connecting to crypto stream");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(&self.config.url).await?;
        let (mut write, mut read) = ws_stream.split();

        let mut auth = AuthHandler::new(self.config.credentials.clone());
        let mut heartbeat = HeartbeatMonitor::new(self.config.heartbeat);
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + heartbeat.interval(),
            heartbeat.interval(),
        );
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let auth_deadline = tokio::time::sleep(AUTH_TIMEOUT);
        tokio::pin!(auth_deadline);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
                () = &mut auth_deadline, if !auth.is_authenticated() => {
                    return Err(AuthError::Timeout.into());
                }
                _ = ticker.tick() => {
                    match heartbeat.on_tick() {
                        HeartbeatAction::SendPing => write.send(Message::Ping(Default::default())).await?,
                        HeartbeatAction::Timeout => return Err(StreamClientError::HeartbeatTimeout),
                    }
                }
                msg = read.next() => {
                    let Some(msg) = msg else {
                        tracing::info!("WebSocket stream ended");
                        return Err(StreamClientError::ConnectionClosed);
                    };
                    heartbeat.record_activity();
                    match msg? {
                        Message::Text(text) => {
                            for outbound in self.handle_text(&text, &mut auth, reconnect).await? {
                                write.send(Message::Text(outbound.into())).await?;
                            }
                        }
                        Message::Ping(data) => write.send(Message::Pong(data)).await?,
                        Message::Close(frame) => {
                            tracing::info!(?frame, "Server sent close frame");
                            return Err(StreamClientError::ConnectionClosed);
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    /// Process one text frame. Returns encoded frames to send back.
    async fn handle_text(
        &self,
        text: &str,
        auth: &mut AuthHandler,
        reconnect: &mut BackoffPolicy,
    ) -> Result<Vec<String>, StreamClientError> {
        let decoded = match self.codec.decode(text) {
            Ok(decoded) => decoded,
            Err(e) => {
                metrics::record_rejected_message();
                tracing::error!(error = %e, "Skipping undecodable frame");
                return Ok(Vec::new());
            }
        };

        let mut outbound = Vec::new();
        for msg in decoded {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    metrics::record_rejected_message();
                    tracing::error!(error = %e, "Skipping undecodable message");
                    continue;
                }
            };
            match msg {
                AlpacaMessage::Success(success) => match auth.on_success(&success) {
                    AuthStep::SendAuth(request) => outbound.push(self.codec.encode(&request)?),
                    AuthStep::Authenticated => {
                        tracing::info!("Crypto stream authenticated");
                        reconnect.reset();
                        self.emit(StreamEvent::Connected).await?;
                        if let Some(request) = self.config.subscriptions.to_subscribe_request() {
                            tracing::debug!(
                                quotes = ?request.quotes,
                                bars = ?request.bars,
                                "Sending subscribe request"
                            );
                            outbound.push(self.codec.encode(&request)?);
                        }
                    }
                },
                AlpacaMessage::Error(error) => {
                    tracing::error!(code = error.code, msg = %error.msg, "Crypto stream error");
                    if !auth.is_authenticated() {
                        return Err(auth.on_error(&error).into());
                    }
                    self.emit(StreamEvent::Error(error.msg)).await?;
                }
                AlpacaMessage::Subscription(sub) => {
                    self.emit(StreamEvent::Subscribed {
                        quotes: sub.quotes,
                        bars: sub.bars,
                    })
                    .await?;
                }
                AlpacaMessage::Quote(quote) => {
                    self.emit(StreamEvent::Record(MarketRecord::from(quote)))
                        .await?;
                }
                AlpacaMessage::Bar(bar) => {
                    self.emit(StreamEvent::Record(MarketRecord::from(bar))).await?;
                }
                AlpacaMessage::Ignored(kind) => {
                    tracing::trace!(kind, "Ignoring message");
                }
            }
        }
        Ok(outbound)
    }

    /// Push an event, waiting for queue capacity.
    async fn emit(&self, event: StreamEvent) -> Result<(), StreamClientError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| StreamClientError::QueueClosed)
    }
}
