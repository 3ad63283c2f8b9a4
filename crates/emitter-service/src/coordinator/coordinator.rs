//! Request/response coordinator

use dashmap::DashMap;
use emitter_core::{
    ChannelRouter, EmitterError, EmitterResult, MessageHandler, MessagePublisher,
    MessageSubscriber, Request, RequestId, ResponseMessage, ServerId,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{oneshot, Mutex};
use tokio::time::Instant;

use super::outcome::{Outcome, Resolution};
use super::pending::{PendingReply, PendingRequest, Recorded};

/// Issues cluster requests and aggregates the replies of every gateway node
///
/// Cloning is cheap; all clones share the same pending map and subscriptions.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

pub(crate) struct CoordinatorInner {
    server_id: ServerId,
    router: ChannelRouter,
    publisher: Arc<dyn MessagePublisher>,
    subscriber: Arc<dyn MessageSubscriber>,
    /// Live requests by id
    pending: DashMap<RequestId, PendingRequest>,
    /// Namespaces whose response pattern is subscribed
    namespaces: Mutex<HashSet<String>>,
    /// Replies that matched no live request, or repeated a node
    discarded: AtomicU64,
    closed: AtomicBool,
}

impl Coordinator {
    #[must_use]
    pub fn new(
        server_id: ServerId,
        router: ChannelRouter,
        publisher: Arc<dyn MessagePublisher>,
        subscriber: Arc<dyn MessageSubscriber>,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                server_id,
                router,
                publisher,
                subscriber,
                pending: DashMap::new(),
                namespaces: Mutex::new(HashSet::new()),
                discarded: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Publish a request and start collecting its replies
    ///
    /// On error nothing is left behind: no pending record, and the request was
    /// published at most once.
    #[tracing::instrument(skip(self, request), fields(request_id = %request.id, kind = %request.kind()))]
    pub async fn issue(&self, request: Request) -> EmitterResult<PendingReply> {
        let inner = &self.inner;
        if inner.closed.load(Ordering::Acquire) {
            return Err(EmitterError::Closed);
        }

        let payload = request.encode(&inner.server_id)?;
        self.ensure_subscribed(&request.namespace).await?;

        let channel = inner.router.request_channel_for(&request.namespace);
        let deadline = Instant::now() + request.timeout;
        let (tx, rx) = oneshot::channel();
        let reply = PendingReply {
            id: request.id.clone(),
            kind: request.kind(),
            deadline,
            rx,
            coordinator: Arc::downgrade(inner),
        };

        inner
            .pending
            .insert(request.id.clone(), PendingRequest::new(request, deadline, tx));

        // shutdown() may have drained the map between the check above and the insert
        if inner.closed.load(Ordering::Acquire) {
            return Err(EmitterError::Closed);
        }

        // The deadline runs whether or not the caller is waiting yet
        let timer = tokio::spawn(expire_at(
            Arc::downgrade(inner),
            reply.id.clone(),
            deadline,
        ));
        match inner.pending.get_mut(&reply.id) {
            Some(mut pending) => pending.arm(timer.abort_handle()),
            None => timer.abort(),
        }

        // `reply` removes the record when dropped on the error path
        inner.publisher.publish(&channel, &payload).await?;

        tracing::debug!(channel = %channel, "Request published");

        inner.complete_if_satisfied(&reply.id);
        Ok(reply)
    }

    /// Issue a request and wait for its resolution
    pub async fn request(&self, request: Request) -> EmitterResult<Resolution> {
        self.issue(request).await?.wait().await
    }

    async fn ensure_subscribed(&self, namespace: &str) -> EmitterResult<()> {
        let mut namespaces = self.inner.namespaces.lock().await;
        // shutdown() sets the flag before it takes this lock to release the patterns
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(EmitterError::Closed);
        }
        if namespaces.contains(namespace) {
            return Ok(());
        }

        let pattern = self.inner.router.response_pattern_for(namespace);
        let handler: Arc<dyn MessageHandler> = Arc::new(ReplyDispatch {
            inner: Arc::downgrade(&self.inner),
        });
        self.inner.subscriber.psubscribe(&pattern, handler).await?;
        namespaces.insert(namespace.to_string());

        tracing::debug!(namespace = %namespace, pattern = %pattern, "Listening for replies");
        Ok(())
    }

    /// Feed a raw reply payload (what the subscriber delivers)
    pub fn handle_reply(&self, payload: &[u8]) {
        self.inner.handle_payload(payload);
    }

    /// Number of unresolved requests
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Number of replies dropped as unknown, late, duplicate or undecodable
    #[must_use]
    pub fn discarded_replies(&self) -> u64 {
        self.inner.discarded.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Cancel every pending request and release the reply subscriptions
    ///
    /// Waiting callers get [`EmitterError::Closed`]; new requests are refused.
    pub async fn shutdown(&self) -> usize {
        let inner = &self.inner;
        if inner.closed.swap(true, Ordering::AcqRel) {
            return 0;
        }

        let ids: Vec<RequestId> = inner.pending.iter().map(|e| e.key().clone()).collect();
        let cancelled = ids
            .iter()
            .filter(|id| inner.pending.remove(*id).is_some())
            .count();

        let namespaces = std::mem::take(&mut *inner.namespaces.lock().await);
        for namespace in namespaces {
            let pattern = inner.router.response_pattern_for(&namespace);
            if let Err(e) = inner.subscriber.punsubscribe(&pattern).await {
                tracing::warn!(pattern = %pattern, error = %e, "Failed to unsubscribe");
            }
        }

        tracing::info!(cancelled = cancelled, "Coordinator shut down");
        cancelled
    }
}

impl CoordinatorInner {
    fn handle_payload(&self, payload: &[u8]) {
        match ResponseMessage::decode(payload) {
            Ok(response) => self.accept(response),
            Err(e) => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(error = %e, "Discarded undecodable reply");
            }
        }
    }

    fn accept(&self, response: ResponseMessage) {
        let id = response.request_id.clone();

        let recorded = match self.pending.get_mut(&id) {
            Some(mut pending) => pending.record(response),
            None => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(request_id = %id, "Discarded reply for unknown or resolved request");
                return;
            }
        };

        match recorded {
            Recorded::Accepted { complete: true } => self.resolve(&id, Outcome::Complete),
            Recorded::Accepted { complete: false } => {}
            Recorded::Duplicate => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(request_id = %id, "Discarded second reply from the same node");
            }
            Recorded::Late => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(request_id = %id, "Discarded reply past the deadline");
                self.resolve(&id, Outcome::TimedOut);
            }
        }
    }

    fn complete_if_satisfied(&self, id: &RequestId) {
        let complete = self.pending.get(id).is_some_and(|p| p.is_complete());
        if complete {
            self.resolve(id, Outcome::Complete);
        }
    }

    /// Resolution barrier: only the caller that removes the record delivers it
    fn resolve(&self, id: &RequestId, outcome: Outcome) {
        if let Some((_, pending)) = self.pending.remove(id) {
            let (resolution, sink) = pending.resolve(outcome);
            // The receiver is gone if the caller abandoned the request
            let _ = sink.send(resolution);
        }
    }

    /// Deadline path: take the record with whatever it collected
    pub(crate) fn expire(&self, id: &RequestId) -> Option<Resolution> {
        self.pending
            .remove(id)
            .map(|(_, pending)| pending.resolve(Outcome::TimedOut).0)
    }

    pub(crate) fn abandon(&self, id: &RequestId) {
        if self.pending.remove(id).is_some() {
            tracing::debug!(request_id = %id, "Request abandoned before resolution");
        }
    }
}

/// Deadline task of one request
async fn expire_at(inner: Weak<CoordinatorInner>, id: RequestId, deadline: Instant) {
    tokio::time::sleep_until(deadline).await;
    if let Some(inner) = inner.upgrade() {
        inner.resolve(&id, Outcome::TimedOut);
    }
}

/// Subscriber callback; holds the coordinator weakly so the subscription never
/// keeps a shut-down coordinator alive
struct ReplyDispatch {
    inner: Weak<CoordinatorInner>,
}

impl MessageHandler for ReplyDispatch {
    fn on_message(&self, channel: &str, payload: &[u8]) {
        if let Some(inner) = self.inner.upgrade() {
            tracing::trace!(channel = %channel, bytes = payload.len(), "Reply received");
            inner.handle_payload(payload);
        }
    }
}
