//! Emitter

use emitter_common::{AppConfig, EmitterSettings};
use emitter_core::{
    encode, BroadcastOptions, ChannelRouter, Command, EmitterResult, MessagePublisher,
    MessageSubscriber, Packet, PublishError, Request, ServerId, SocketDescriptor, Value,
    DEFAULT_NAMESPACE,
};
use emitter_redis::{RedisPool, RedisPublisher, RedisSubscriber, SubscriberConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use super::BroadcastOperator;
use crate::coordinator::{ClusterReply, Coordinator, Outcome, Resolution};

/// How long to collect replies, and how many to wait for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplyWindow {
    /// Collection window (the emitter default when `None`)
    pub timeout: Option<Duration>,
    /// Resolve as soon as this many nodes replied (unknown when `None`)
    pub expected_replies: Option<usize>,
}

impl ReplyWindow {
    #[must_use]
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            expected_replies: None,
        }
    }

    #[must_use]
    pub fn expect_replies(mut self, expected: usize) -> Self {
        self.expected_replies = Some(expected);
        self
    }
}

/// Broadcasts events and cluster commands to socket.io gateways through Redis
///
/// Holds the process-wide server id, publisher and coordinator; clone it to share.
#[derive(Clone)]
pub struct Emitter {
    inner: Arc<EmitterInner>,
}

struct EmitterInner {
    server_id: ServerId,
    router: ChannelRouter,
    publisher: Arc<dyn MessagePublisher>,
    subscriber: Arc<dyn MessageSubscriber>,
    coordinator: Coordinator,
    settings: EmitterSettings,
}

impl Emitter {
    /// Create an emitter with a freshly generated server id
    pub fn new(
        publisher: Arc<dyn MessagePublisher>,
        subscriber: Arc<dyn MessageSubscriber>,
        settings: EmitterSettings,
    ) -> Self {
        Self::with_server_id(ServerId::generate(), publisher, subscriber, settings)
    }

    /// Create an emitter with an explicit server id
    pub fn with_server_id(
        server_id: ServerId,
        publisher: Arc<dyn MessagePublisher>,
        subscriber: Arc<dyn MessageSubscriber>,
        settings: EmitterSettings,
    ) -> Self {
        let router = ChannelRouter::new(settings.key.clone());
        let coordinator = Coordinator::new(
            server_id.clone(),
            router.clone(),
            publisher.clone(),
            subscriber.clone(),
        );

        tracing::info!(server_id = %server_id, prefix = %router.prefix(), "Emitter created");

        Self {
            inner: Arc::new(EmitterInner {
                server_id,
                router,
                publisher,
                subscriber,
                coordinator,
                settings,
            }),
        }
    }

    /// Connect to Redis using the application configuration
    pub async fn connect(config: &AppConfig) -> EmitterResult<Self> {
        let pool = RedisPool::from_config(&config.redis).map_err(PublishError::from)?;
        let publisher = Arc::new(RedisPublisher::new(pool));
        let subscriber = Arc::new(RedisSubscriber::new(SubscriberConfig::from(&config.redis)).await?);

        Ok(Self::new(publisher, subscriber, config.emitter.clone()))
    }

    #[must_use]
    pub fn server_id(&self) -> &ServerId {
        &self.inner.server_id
    }

    #[must_use]
    pub fn router(&self) -> &ChannelRouter {
        &self.inner.router
    }

    #[must_use]
    pub fn coordinator(&self) -> &Coordinator {
        &self.inner.coordinator
    }

    #[must_use]
    pub fn settings(&self) -> &EmitterSettings {
        &self.inner.settings
    }

    /// Start a broadcast in a namespace
    #[must_use]
    pub fn of(&self, namespace: impl Into<String>) -> BroadcastOperator {
        BroadcastOperator::new(self.clone(), namespace.into())
    }

    /// Start a broadcast to a room of the default namespace
    #[must_use]
    pub fn to(&self, room: impl Into<String>) -> BroadcastOperator {
        self.of(DEFAULT_NAMESPACE).to(room)
    }

    /// Start a broadcast to the default namespace, excluding a room
    #[must_use]
    pub fn except(&self, room: impl Into<String>) -> BroadcastOperator {
        self.of(DEFAULT_NAMESPACE).except(room)
    }

    /// Broadcast an event; fire-and-forget
    ///
    /// Returns the number of Redis subscribers that received the frame, which is
    /// not a delivery guarantee to any client.
    pub async fn emit(
        &self,
        namespace: &str,
        event: &str,
        args: Vec<Value>,
        options: BroadcastOptions,
    ) -> EmitterResult<u32> {
        let packet = Packet::new(event)
            .of(namespace)
            .with_args(args)
            .with_options(options);
        self.emit_packet(&packet).await
    }

    /// Broadcast a prepared packet
    #[instrument(skip(self, packet), fields(namespace = %packet.namespace, event = %packet.event))]
    pub async fn emit_packet(&self, packet: &Packet) -> EmitterResult<u32> {
        let frame = encode(&self.inner.server_id, packet)?;
        let channel = self
            .inner
            .router
            .channel_for(&packet.namespace, packet.options.single_room());

        let receivers = self.inner.publisher.publish(&channel, &frame).await?;
        Ok(receivers)
    }

    /// Broadcast an event and collect every node's acknowledgements
    pub async fn emit_with_ack(
        &self,
        namespace: &str,
        event: &str,
        args: Vec<Value>,
        options: BroadcastOptions,
        window: ReplyWindow,
    ) -> EmitterResult<ClusterReply<Vec<Value>>> {
        let command = Command::EmitWithAck {
            event: event.to_string(),
            args,
        };
        let timeout = window.timeout.unwrap_or(self.inner.settings.ack_timeout());
        let resolution = self.run(namespace, command, options, window, timeout).await?;
        Ok(values(resolution))
    }

    /// Describe the sockets matching `options` across the cluster
    pub async fn fetch_sockets(
        &self,
        namespace: &str,
        options: BroadcastOptions,
        window: ReplyWindow,
    ) -> EmitterResult<ClusterReply<Vec<SocketDescriptor>>> {
        let resolution = self
            .run_request(namespace, Command::FetchSockets, options, window)
            .await?;

        let responders = resolution.replies.len();
        let mut sockets = Vec::new();
        for reply in resolution.replies {
            let Some(data) = reply.data else { continue };
            match SocketDescriptor::list_from(data) {
                Ok(list) => sockets.extend(list),
                Err(e) => {
                    tracing::warn!(
                        request_id = %resolution.request_id,
                        node = ?reply.uid,
                        error = %e,
                        "Ignoring malformed fetch-sockets reply"
                    );
                }
            }
        }

        Ok(ClusterReply::new(resolution.outcome, sockets, responders))
    }

    /// Make the sockets matching `options` join `rooms`
    ///
    /// Target individual sockets by passing their ids as rooms in `options`.
    pub async fn sockets_join(
        &self,
        namespace: &str,
        options: BroadcastOptions,
        rooms: Vec<String>,
        window: ReplyWindow,
    ) -> EmitterResult<ClusterReply<usize>> {
        let resolution = self
            .run_request(namespace, Command::RemoteJoin { rooms }, options, window)
            .await?;
        Ok(acknowledgements(&resolution))
    }

    /// Make the sockets matching `options` leave `rooms`
    pub async fn sockets_leave(
        &self,
        namespace: &str,
        options: BroadcastOptions,
        rooms: Vec<String>,
        window: ReplyWindow,
    ) -> EmitterResult<ClusterReply<usize>> {
        let resolution = self
            .run_request(namespace, Command::RemoteLeave { rooms }, options, window)
            .await?;
        Ok(acknowledgements(&resolution))
    }

    /// Disconnect the sockets matching `options`
    pub async fn disconnect_sockets(
        &self,
        namespace: &str,
        options: BroadcastOptions,
        close: bool,
        window: ReplyWindow,
    ) -> EmitterResult<ClusterReply<usize>> {
        let resolution = self
            .run_request(namespace, Command::RemoteDisconnect { close }, options, window)
            .await?;
        Ok(acknowledgements(&resolution))
    }

    /// Send an event to the other servers of the cluster and collect their answers
    pub async fn server_side_emit(
        &self,
        namespace: &str,
        event: &str,
        args: Vec<Value>,
        window: ReplyWindow,
    ) -> EmitterResult<ClusterReply<Vec<Value>>> {
        let command = Command::ServerSideEmit {
            event: event.to_string(),
            args,
        };
        let resolution = self
            .run_request(namespace, command, BroadcastOptions::default(), window)
            .await?;
        Ok(values(resolution))
    }

    /// Number of cluster requests still collecting replies
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.inner.coordinator.pending_count()
    }

    /// Replies dropped because they were late, unknown or repeated
    #[must_use]
    pub fn discarded_replies(&self) -> u64 {
        self.inner.coordinator.discarded_replies()
    }

    /// Cancel pending requests, stop listening for replies and release the
    /// publisher's connections
    pub async fn shutdown(&self) {
        self.inner.coordinator.shutdown().await;
        if let Err(e) = self.inner.subscriber.close().await {
            tracing::warn!(error = %e, "Failed to close subscriber");
        }
        self.inner.publisher.close();
    }

    async fn run_request(
        &self,
        namespace: &str,
        command: Command,
        options: BroadcastOptions,
        window: ReplyWindow,
    ) -> EmitterResult<Resolution> {
        let timeout = window
            .timeout
            .unwrap_or(self.inner.settings.request_timeout());
        self.run(namespace, command, options, window, timeout).await
    }

    async fn run(
        &self,
        namespace: &str,
        command: Command,
        options: BroadcastOptions,
        window: ReplyWindow,
        timeout: Duration,
    ) -> EmitterResult<Resolution> {
        let request = Request::new(namespace, command, options, timeout)
            .expect_replies(window.expected_replies);
        let resolution = self.inner.coordinator.request(request).await?;

        if resolution.outcome == Outcome::TimedOut {
            tracing::debug!(
                request_id = %resolution.request_id,
                kind = %resolution.kind,
                replies = resolution.replies.len(),
                "Reply window closed"
            );
        }

        Ok(resolution)
    }
}

fn values(resolution: Resolution) -> ClusterReply<Vec<Value>> {
    let responders = resolution.replies.len();
    let values = resolution
        .replies
        .into_iter()
        .map(|reply| reply.data.unwrap_or(Value::Nil))
        .collect();
    ClusterReply::new(resolution.outcome, values, responders)
}

fn acknowledgements(resolution: &Resolution) -> ClusterReply<usize> {
    let count = resolution.replies.len();
    ClusterReply::new(resolution.outcome, count, count)
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("server_id", &self.inner.server_id)
            .field("prefix", &self.inner.router.prefix())
            .field("pending", &self.inner.coordinator.pending_count())
            .finish()
    }
}
