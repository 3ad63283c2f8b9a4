//! Redis Pub/Sub pattern subscriber.
//!
//! One background task owns the Redis pub/sub connection. Subscription changes are
//! sent to it over a control channel and acknowledged once Redis confirmed them.

use async_trait::async_trait;
use emitter_core::{MessageHandler, MessageSubscriber, SubscribeError};
use futures_util::StreamExt;
use parking_lot::RwLock;
use redis::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::pool::redact;

type Handlers = Arc<RwLock<HashMap<String, Arc<dyn MessageHandler>>>>;
type Ack = oneshot::Sender<Result<(), SubscribeError>>;

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// Redis connection URL
    pub redis_url: String,
    /// Reconnection delay in milliseconds
    pub reconnect_delay_ms: u64,
    /// How long a (un)subscribe call waits for Redis to confirm
    pub command_timeout_ms: u64,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            reconnect_delay_ms: 1000,
            command_timeout_ms: 5000,
        }
    }
}

impl From<&emitter_common::RedisConfig> for SubscriberConfig {
    fn from(config: &emitter_common::RedisConfig) -> Self {
        Self {
            redis_url: config.url.clone(),
            reconnect_delay_ms: config.reconnect_delay_ms,
            ..Self::default()
        }
    }
}

/// Commands for subscription management
enum SubscriberCommand {
    Subscribe(String, Arc<dyn MessageHandler>, Ack),
    Unsubscribe(String, Ack),
    Shutdown,
}

fn confirmation(result: &redis::RedisResult<()>) -> Result<(), SubscribeError> {
    match result {
        Ok(()) => Ok(()),
        Err(e) => Err(SubscribeError::Transport(e.to_string())),
    }
}

/// Redis pattern subscriber
pub struct RedisSubscriber {
    config: SubscriberConfig,
    /// Active patterns and the handler each one dispatches to
    handlers: Handlers,
    /// Control channel for subscription management
    control_tx: mpsc::Sender<SubscriberCommand>,
}

impl RedisSubscriber {
    /// Create a new subscriber and start the background listener
    pub async fn new(config: SubscriberConfig) -> Result<Self, SubscribeError> {
        let client = Client::open(config.redis_url.as_str())
            .map_err(|e| SubscribeError::Transport(e.to_string()))?;
        let (control_tx, control_rx) = mpsc::channel(32);
        let handlers: Handlers = Arc::new(RwLock::new(HashMap::new()));

        tokio::spawn(Self::listener_loop(
            client,
            config.clone(),
            handlers.clone(),
            control_rx,
        ));

        Ok(Self {
            config,
            handlers,
            control_tx,
        })
    }

    /// Background listener loop
    async fn listener_loop(
        client: Client,
        config: SubscriberConfig,
        handlers: Handlers,
        mut control_rx: mpsc::Receiver<SubscriberCommand>,
    ) {
        loop {
            match Self::run_listener(&client, &handlers, &mut control_rx).await {
                Ok(true) => {
                    tracing::info!("Subscriber shutting down");
                    break;
                }
                Ok(false) => {
                    tracing::warn!(url = %redact(&config.redis_url), "Pub/Sub stream ended, reconnecting");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Subscriber error, reconnecting...");
                }
            }
            tokio::time::sleep(Duration::from_millis(config.reconnect_delay_ms)).await;
        }

        handlers.write().clear();
    }

    /// Run the listener until error or shutdown; `Ok(true)` means shutdown
    async fn run_listener(
        client: &Client,
        handlers: &Handlers,
        control_rx: &mut mpsc::Receiver<SubscriberCommand>,
    ) -> redis::RedisResult<bool> {
        let mut pubsub = client.get_async_pubsub().await?;

        // Restore patterns from before a reconnect
        let patterns: Vec<String> = handlers.read().keys().cloned().collect();
        for pattern in &patterns {
            pubsub.psubscribe(pattern).await?;
        }

        tracing::info!(patterns = patterns.len(), "Subscriber connected to Redis");

        let mut stream = pubsub.on_message();

        loop {
            tokio::select! {
                msg = stream.next() => {
                    let Some(msg) = msg else {
                        return Ok(false);
                    };
                    let Ok(pattern) = msg.get_pattern::<String>() else {
                        continue;
                    };
                    let handler = handlers.read().get(&pattern).cloned();
                    if let Some(handler) = handler {
                        tracing::trace!(
                            channel = %msg.get_channel_name(),
                            pattern = %pattern,
                            "Received Pub/Sub message"
                        );
                        handler.on_message(msg.get_channel_name(), msg.get_payload_bytes());
                    }
                }

                cmd = control_rx.recv() => {
                    match cmd {
                        Some(SubscriberCommand::Subscribe(pattern, handler, ack)) => {
                            // Need to drop stream to access pubsub
                            drop(stream);
                            handlers.write().insert(pattern.clone(), handler);
                            let result = pubsub.psubscribe(&pattern).await;
                            if let Err(e) = &result {
                                handlers.write().remove(&pattern);
                                tracing::error!(pattern = %pattern, error = %e, "Failed to subscribe");
                            } else {
                                tracing::debug!(pattern = %pattern, "Subscribed to pattern");
                            }
                            let _ = ack.send(confirmation(&result));
                            result?;
                            stream = pubsub.on_message();
                        }
                        Some(SubscriberCommand::Unsubscribe(pattern, ack)) => {
                            drop(stream);
                            handlers.write().remove(&pattern);
                            let result = pubsub.punsubscribe(&pattern).await;
                            let _ = ack.send(confirmation(&result));
                            result?;
                            tracing::debug!(pattern = %pattern, "Unsubscribed from pattern");
                            stream = pubsub.on_message();
                        }
                        Some(SubscriberCommand::Shutdown) | None => {
                            return Ok(true);
                        }
                    }
                }
            }
        }
    }

    async fn send_command<F>(&self, build: F) -> Result<(), SubscribeError>
    where
        F: FnOnce(Ack) -> SubscriberCommand,
    {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.control_tx
            .send(build(ack_tx))
            .await
            .map_err(|_| SubscribeError::Closed)?;

        let timeout = Duration::from_millis(self.config.command_timeout_ms);
        match tokio::time::timeout(timeout, ack_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SubscribeError::Closed),
            Err(_) => Err(SubscribeError::Transport(format!(
                "Redis did not confirm within {}ms",
                self.config.command_timeout_ms
            ))),
        }
    }

    /// Get currently subscribed patterns
    pub fn patterns(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }

    /// Shutdown the subscriber
    pub async fn shutdown(&self) -> Result<(), SubscribeError> {
        self.control_tx
            .send(SubscriberCommand::Shutdown)
            .await
            .map_err(|_| SubscribeError::Closed)
    }
}

#[async_trait]
impl MessageSubscriber for RedisSubscriber {
    async fn psubscribe(
        &self,
        pattern: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), SubscribeError> {
        let pattern = pattern.to_string();
        self.send_command(|ack| SubscriberCommand::Subscribe(pattern, handler, ack))
            .await
    }

    async fn punsubscribe(&self, pattern: &str) -> Result<(), SubscribeError> {
        let pattern = pattern.to_string();
        self.send_command(|ack| SubscriberCommand::Unsubscribe(pattern, ack))
            .await
    }

    async fn close(&self) -> Result<(), SubscribeError> {
        self.shutdown().await
    }
}

/// Builder for subscriber
pub struct SubscriberBuilder {
    config: SubscriberConfig,
}

impl SubscriberBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SubscriberConfig::default(),
        }
    }

    /// Set Redis URL
    #[must_use]
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.config.redis_url = url.into();
        self
    }

    /// Set reconnection delay
    #[must_use]
    pub fn reconnect_delay_ms(mut self, delay: u64) -> Self {
        self.config.reconnect_delay_ms = delay;
        self
    }

    /// Set how long (un)subscribe calls wait for confirmation
    #[must_use]
    pub fn command_timeout_ms(mut self, timeout: u64) -> Self {
        self.config.command_timeout_ms = timeout;
        self
    }

    /// Build and start the subscriber
    pub async fn build(self) -> Result<RedisSubscriber, SubscribeError> {
        RedisSubscriber::new(self.config).await
    }
}

impl Default for SubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}
