//! Alpaca Crypto Stream Adapter
//!
//! WebSocket client for the crypto market data feed (JSON codec).

pub mod auth;
pub mod codec;
pub mod heartbeat;
pub mod messages;
pub mod stream;

pub use auth::{AuthError, AuthHandler, AuthState, AuthStep};
pub use codec::{CodecError, JsonCodec};
pub use heartbeat::{HeartbeatAction, HeartbeatConfig, HeartbeatMonitor};
pub use messages::{AlpacaMessage, CryptoBarMessage, CryptoQuoteMessage};
pub use stream::{
    CryptoStreamClient, CryptoStreamConfig, StreamClientError, Subscriptions,
};
