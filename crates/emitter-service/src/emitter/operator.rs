use emitter_core::{
    BroadcastFlags, BroadcastOptions, EmitterResult, Packet, SocketDescriptor, Value,
};
use std::time::Duration;

use super::{Emitter, ReplyWindow};
use crate::coordinator::ClusterReply;

/// Immutable broadcast builder
///
/// Every modifier returns a new operator, so a partially built target can be
/// reused for several emits without leaking rooms or flags between them.
#[derive(Debug, Clone)]
#[must_use]
pub struct BroadcastOperator {
    emitter: Emitter,
    namespace: String,
    options: BroadcastOptions,
    window: ReplyWindow,
}

impl BroadcastOperator {
    pub(crate) fn new(emitter: Emitter, namespace: String) -> Self {
        Self {
            emitter,
            namespace,
            options: BroadcastOptions::default(),
            window: ReplyWindow::default(),
        }
    }

    /// Switch to another namespace, keeping rooms and flags
    pub fn of(&self, namespace: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.namespace = namespace.into();
        next
    }

    /// Target a room (cumulative)
    pub fn to(&self, room: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.options = next.options.to(room);
        next
    }

    /// Alias of [`to`](Self::to)
    pub fn in_room(&self, room: impl Into<String>) -> Self {
        self.to(room)
    }

    /// Exclude a room (cumulative)
    pub fn except(&self, room: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.options = next.options.except(room);
        next
    }

    /// The event may be dropped for clients that are not ready
    pub fn volatile(&self) -> Self {
        self.flag(BroadcastFlags::VOLATILE)
    }

    /// Whether the gateway should compress the event
    pub fn compress(&self, compress: bool) -> Self {
        let mut next = self.clone();
        next.options.flags.set(BroadcastFlags::COMPRESS, compress);
        next
    }

    /// Deliver to every node even when the gateway would scope it locally
    pub fn broadcast(&self) -> Self {
        self.flag(BroadcastFlags::BROADCAST_ALL)
    }

    /// Reply collection window for cluster commands
    pub fn timeout(&self, timeout: Duration) -> Self {
        let mut next = self.clone();
        next.window.timeout = Some(timeout);
        next
    }

    /// Resolve cluster commands once this many nodes replied
    pub fn expect_replies(&self, expected: usize) -> Self {
        let mut next = self.clone();
        next.window.expected_replies = Some(expected);
        next
    }

    fn flag(&self, flag: BroadcastFlags) -> Self {
        let mut next = self.clone();
        next.options.flags.insert(flag);
        next
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn options(&self) -> &BroadcastOptions {
        &self.options
    }

    #[must_use]
    pub fn window(&self) -> ReplyWindow {
        self.window
    }

    /// Build the packet this operator would publish
    pub fn packet(&self, event: &str, args: Vec<Value>) -> Packet {
        Packet::new(event)
            .of(self.namespace.as_str())
            .with_args(args)
            .with_options(self.options.clone())
    }

    /// Fire-and-forget broadcast
    pub async fn emit(&self, event: &str, args: Vec<Value>) -> EmitterResult<u32> {
        self.emitter.emit_packet(&self.packet(event, args)).await
    }

    pub async fn emit_with_ack(
        &self,
        event: &str,
        args: Vec<Value>,
    ) -> EmitterResult<ClusterReply<Vec<Value>>> {
        self.emitter
            .emit_with_ack(&self.namespace, event, args, self.options.clone(), self.window)
            .await
    }

    pub async fn fetch_sockets(&self) -> EmitterResult<ClusterReply<Vec<SocketDescriptor>>> {
        self.emitter
            .fetch_sockets(&self.namespace, self.options.clone(), self.window)
            .await
    }

    pub async fn sockets_join<I, S>(&self, rooms: I) -> EmitterResult<ClusterReply<usize>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rooms = rooms.into_iter().map(Into::into).collect();
        self.emitter
            .sockets_join(&self.namespace, self.options.clone(), rooms, self.window)
            .await
    }

    pub async fn sockets_leave<I, S>(&self, rooms: I) -> EmitterResult<ClusterReply<usize>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rooms = rooms.into_iter().map(Into::into).collect();
        self.emitter
            .sockets_leave(&self.namespace, self.options.clone(), rooms, self.window)
            .await
    }

    pub async fn disconnect_sockets(&self, close: bool) -> EmitterResult<ClusterReply<usize>> {
        self.emitter
            .disconnect_sockets(&self.namespace, self.options.clone(), close, self.window)
            .await
    }

    /// Server-side emit ignores rooms and flags
    pub async fn server_side_emit(
        &self,
        event: &str,
        args: Vec<Value>,
    ) -> EmitterResult<ClusterReply<Vec<Value>>> {
        self.emitter
            .server_side_emit(&self.namespace, event, args, self.window)
            .await
    }
}
