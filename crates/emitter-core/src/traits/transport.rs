//! Pub/sub transport traits

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{PublishError, SubscribeError};

/// Publishes raw payloads to channels
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish a payload, returning how many subscribers received it
    ///
    /// Delivery is at-most-once; implementations never retry.
    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<u32, PublishError>;

    /// Release the underlying connections; later publishes fail
    fn close(&self) {}
}

/// Receives messages delivered on a subscribed pattern
///
/// Called from the subscriber's listener task; must not block.
pub trait MessageHandler: Send + Sync {
    fn on_message(&self, channel: &str, payload: &[u8]);
}

/// Manages pattern subscriptions
#[async_trait]
pub trait MessageSubscriber: Send + Sync {
    /// Subscribe to a glob pattern
    ///
    /// Returns once the subscription is active, so that a request published
    /// afterwards cannot miss its replies.
    async fn psubscribe(
        &self,
        pattern: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), SubscribeError>;

    /// Drop a pattern subscription and its handler
    async fn punsubscribe(&self, pattern: &str) -> Result<(), SubscribeError>;

    /// Stop listening altogether
    async fn close(&self) -> Result<(), SubscribeError> {
        Ok(())
    }
}
