//! JSON Codec for the Crypto Stream
//!
//! Frames are JSON arrays of messages; a few control frames arrive as a single
//! object. Each message is dispatched on its `T` field and decoded on its own,
//! so one malformed entry does not take the rest of the frame with it.

use serde_json::Value;

use super::messages::{
    AlpacaMessage, CryptoBarMessage, CryptoQuoteMessage, ErrorMessage, SubscriptionMessage,
    SuccessMessage,
};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unknown message type.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// Message without a `T` field.
    #[error("message missing type discriminator")]
    MissingType,

    /// Frame is neither an array nor an object.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for the crypto stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one text frame into per-message results, in frame order.
    ///
    /// # Errors
    ///
    /// Fails when the frame is not JSON or is neither an array nor an
    /// object. A message with a missing or unknown `T`, or a body that does
    /// not match its type, is an `Err` entry in the returned list.
    pub fn decode(
        &self,
        text: &str,
    ) -> Result<Vec<Result<AlpacaMessage, CodecError>>, CodecError> {
        let value: Value = serde_json::from_str(text.trim())?;
        match value {
            Value::Array(items) => Ok(items.into_iter().map(decode_message).collect()),
            Value::Object(_) => Ok(vec![decode_message(value)]),
            other => {
                let preview: String = other.to_string().chars().take(50).collect();
                Err(CodecError::InvalidFormat(format!(
                    "expected JSON array or object, got: {preview}"
                )))
            }
        }
    }

    /// Encode an outbound request.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode<T: serde::Serialize>(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }
}

fn decode_message(value: Value) -> Result<AlpacaMessage, CodecError> {
    let msg_type = value
        .get("T")
        .and_then(Value::as_str)
        .ok_or(CodecError::MissingType)?
        .to_string();

    let message = match msg_type.as_str() {
        "success" => AlpacaMessage::Success(serde_json::from_value::<SuccessMessage>(value)?),
        "error" => AlpacaMessage::Error(serde_json::from_value::<ErrorMessage>(value)?),
        "subscription" => {
            AlpacaMessage::Subscription(serde_json::from_value::<SubscriptionMessage>(value)?)
        }
        "q" => AlpacaMessage::Quote(serde_json::from_value::<CryptoQuoteMessage>(value)?),
        "b" | "d" | "u" => AlpacaMessage::Bar(serde_json::from_value::<CryptoBarMessage>(value)?),
        "t" | "o" => AlpacaMessage::Ignored(msg_type),
        _ => return Err(CodecError::UnknownMessageType(msg_type)),
    };
    Ok(message)
}
