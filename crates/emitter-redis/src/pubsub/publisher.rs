//! Redis Pub/Sub publisher.

use async_trait::async_trait;
use emitter_core::{MessagePublisher, PublishError};
use redis::AsyncCommands;

use crate::pool::RedisPool;

/// Publishes encoded frames through pooled connections
#[derive(Debug, Clone)]
pub struct RedisPublisher {
    pool: RedisPool,
}

impl RedisPublisher {
    /// Create a new publisher
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &RedisPool {
        &self.pool
    }
}

#[async_trait]
impl MessagePublisher for RedisPublisher {
    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<u32, PublishError> {
        let mut conn = self.pool.get().await?;

        let receivers: u32 = conn
            .publish(channel, payload)
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        tracing::debug!(
            channel = %channel,
            bytes = payload.len(),
            receivers = receivers,
            "Published frame"
        );

        Ok(receivers)
    }

    fn close(&self) {
        self.pool.close();
        tracing::info!("Redis publisher closed");
    }
}
