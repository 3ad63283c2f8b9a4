//! In-process bus for unit tests

use async_trait::async_trait;
use emitter_core::{
    MessageHandler, MessagePublisher, MessageSubscriber, PublishError, RequestId, RequestMessage,
    ResponseMessage, SubscribeError, Value,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Records publishes and lets a test play the gateway side
#[derive(Default)]
pub(crate) struct FakeBus {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    handlers: Mutex<HashMap<String, Arc<dyn MessageHandler>>>,
    psubscribes: AtomicUsize,
    fail_publish: AtomicBool,
    closed: AtomicBool,
    publisher_closed: AtomicBool,
}

impl FakeBus {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn fail_publishes(&self) {
        self.fail_publish.store(true, Ordering::SeqCst);
    }

    pub(crate) fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().clone()
    }

    pub(crate) fn psubscribe_count(&self) -> usize {
        self.psubscribes.load(Ordering::SeqCst)
    }

    pub(crate) fn patterns(&self) -> Vec<String> {
        self.handlers.lock().keys().cloned().collect()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn is_publisher_closed(&self) -> bool {
        self.publisher_closed.load(Ordering::SeqCst)
    }

    /// Last request published on a request channel
    pub(crate) fn last_request(&self) -> RequestMessage {
        let published = self.published.lock();
        let (_, payload) = published
            .iter()
            .rev()
            .find(|(channel, _)| channel.contains("-request#"))
            .expect("no request published");
        RequestMessage::decode(payload).expect("request decodes")
    }

    /// Deliver a reply to every registered handler, as the transport would
    pub(crate) fn reply(&self, request_id: &RequestId, uid: &str, data: Option<Value>) {
        let mut response = ResponseMessage::new(request_id.clone()).with_uid(uid);
        if let Some(data) = data {
            response = response.with_data(data);
        }
        let payload = response.encode().expect("response encodes");
        self.deliver(request_id, &payload);
    }

    pub(crate) fn deliver(&self, request_id: &RequestId, payload: &[u8]) {
        let handlers: Vec<_> = self.handlers.lock().values().cloned().collect();
        let channel = format!("socket.io-request#/#{request_id}#");
        for handler in handlers {
            handler.on_message(&channel, payload);
        }
    }
}

#[async_trait]
impl MessagePublisher for FakeBus {
    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<u32, PublishError> {
        self.published
            .lock()
            .push((channel.to_string(), payload.to_vec()));
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(PublishError::Transport("connection refused".to_string()));
        }
        Ok(1)
    }

    fn close(&self) {
        self.publisher_closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageSubscriber for FakeBus {
    async fn psubscribe(
        &self,
        pattern: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), SubscribeError> {
        self.psubscribes.fetch_add(1, Ordering::SeqCst);
        self.handlers.lock().insert(pattern.to_string(), handler);
        Ok(())
    }

    async fn punsubscribe(&self, pattern: &str) -> Result<(), SubscribeError> {
        self.handlers.lock().remove(pattern);
        Ok(())
    }

    async fn close(&self) -> Result<(), SubscribeError> {
        self.closed.store(true, Ordering::SeqCst);
        self.handlers.lock().clear();
        Ok(())
    }
}
