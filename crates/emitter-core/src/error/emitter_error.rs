//! Emitter errors
//!
//! A coordinated command that runs out of time is *not* an error: it resolves to a
//! partial result. Replies for unknown or already resolved requests are discarded
//! and never surface here either.

use thiserror::Error;

/// Failure to turn a packet or request into bytes, or to read a frame back
#[derive(Debug, Error)]
pub enum EncodingError {
    /// A value could not be converted to or from MessagePack (e.g. a non-serializable argument)
    #[error("Value conversion error: {0}")]
    Value(#[from] rmpv::ext::Error),

    #[error("MessagePack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("MessagePack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("Unknown packet type: {0}")]
    UnknownPacketType(u64),

    #[error("Malformed frame: {0}")]
    Malformed(String),
}

/// Transport failure while publishing to Redis
#[derive(Debug, Error)]
pub enum PublishError {
    /// No connection could be acquired within the pool wait timeout
    #[error("Failed to acquire connection: {0}")]
    Pool(String),

    #[error("Publish failed: {0}")]
    Transport(String),
}

/// Failure while (un)subscribing to reply channels
#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("Subscribe failed: {0}")]
    Transport(String),

    #[error("Subscriber closed")]
    Closed,
}

/// Caller-facing error for every emitter operation
#[derive(Debug, Error)]
pub enum EmitterError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Subscribe(#[from] SubscribeError),

    /// The emitter was shut down while the operation was in flight
    #[error("Emitter closed")]
    Closed,
}

impl EmitterError {
    /// Get an error code string for logs and metrics
    pub fn code(&self) -> &'static str {
        match self {
            Self::Encoding(_) => "ENCODING_ERROR",
            Self::Publish(_) => "PUBLISH_ERROR",
            Self::Subscribe(_) => "SUBSCRIBE_ERROR",
            Self::Closed => "EMITTER_CLOSED",
        }
    }

    /// Check if the caller may retry the operation under its own policy
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Publish(_) | Self::Subscribe(SubscribeError::Transport(_)))
    }
}

/// Result type for emitter operations
pub type EmitterResult<T> = Result<T, EmitterError>;
