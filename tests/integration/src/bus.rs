//! In-memory pub/sub bus
//!
//! Delivers synchronously to every subscription whose glob pattern matches the
//! channel, like Redis `PSUBSCRIBE`. Each participant talks to the bus through
//! its own [`BusClient`] so closing one client leaves the others subscribed.

use async_trait::async_trait;
use emitter_core::{
    MessageHandler, MessagePublisher, MessageSubscriber, PublishError, SubscribeError,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

struct Subscription {
    client: u64,
    pattern: String,
    handler: Arc<dyn MessageHandler>,
}

/// Shared bus state
#[derive(Default)]
pub struct MemoryBus {
    subscriptions: Mutex<Vec<Subscription>>,
    log: Mutex<Vec<(String, Vec<u8>)>>,
    failing: AtomicBool,
    next_client: AtomicU64,
}

impl MemoryBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Open a new participant
    pub fn client(self: &Arc<Self>) -> Arc<BusClient> {
        Arc::new(BusClient {
            id: self.next_client.fetch_add(1, Ordering::SeqCst),
            bus: self.clone(),
        })
    }

    /// Make every publish fail until reset
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every payload successfully published, in order
    pub fn log(&self) -> Vec<(String, Vec<u8>)> {
        self.log.lock().clone()
    }

    /// Payloads published on exactly `channel`
    pub fn published_on(&self, channel: &str) -> Vec<Vec<u8>> {
        self.log
            .lock()
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    fn publish(&self, channel: &str, payload: &[u8]) -> Result<u32, PublishError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Transport("bus unavailable".to_string()));
        }

        self.log.lock().push((channel.to_string(), payload.to_vec()));

        // Handlers may publish again, so none is called under the lock
        let targets: Vec<Arc<dyn MessageHandler>> = self
            .subscriptions
            .lock()
            .iter()
            .filter(|s| glob_match(&s.pattern, channel))
            .map(|s| s.handler.clone())
            .collect();

        for handler in &targets {
            handler.on_message(channel, payload);
        }

        Ok(u32::try_from(targets.len()).unwrap_or(u32::MAX))
    }
}

/// One participant's connection to a [`MemoryBus`]
pub struct BusClient {
    id: u64,
    bus: Arc<MemoryBus>,
}

impl BusClient {
    pub fn bus(&self) -> &Arc<MemoryBus> {
        &self.bus
    }

    pub fn patterns(&self) -> Vec<String> {
        self.bus
            .subscriptions
            .lock()
            .iter()
            .filter(|s| s.client == self.id)
            .map(|s| s.pattern.clone())
            .collect()
    }
}

#[async_trait]
impl MessagePublisher for BusClient {
    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<u32, PublishError> {
        self.bus.publish(channel, payload)
    }
}

#[async_trait]
impl MessageSubscriber for BusClient {
    async fn psubscribe(
        &self,
        pattern: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), SubscribeError> {
        let mut subscriptions = self.bus.subscriptions.lock();
        subscriptions.retain(|s| !(s.client == self.id && s.pattern == pattern));
        subscriptions.push(Subscription {
            client: self.id,
            pattern: pattern.to_string(),
            handler,
        });
        Ok(())
    }

    async fn punsubscribe(&self, pattern: &str) -> Result<(), SubscribeError> {
        self.bus
            .subscriptions
            .lock()
            .retain(|s| !(s.client == self.id && s.pattern == pattern));
        Ok(())
    }

    async fn close(&self) -> Result<(), SubscribeError> {
        self.bus
            .subscriptions
            .lock()
            .retain(|s| s.client != self.id);
        Ok(())
    }
}

/// Redis-style glob matching: `*`, `?` and backslash escapes
pub fn glob_match(pattern: &str, text: &str) -> bool {
    matches(pattern.as_bytes(), text.as_bytes())
}

fn matches(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some(b'*') => (0..=text.len()).any(|skip| matches(&pattern[1..], &text[skip..])),
        Some(b'?') => !text.is_empty() && matches(&pattern[1..], &text[1..]),
        Some(b'\\') if pattern.len() > 1 => {
            text.first() == Some(&pattern[1]) && matches(&pattern[2..], &text[1..])
        }
        Some(c) => text.first() == Some(c) && matches(&pattern[1..], &text[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("socket.io#/#*", "socket.io#/#"));
        assert!(glob_match("socket.io#/#*", "socket.io#/#room1#"));
        assert!(glob_match("socket.io-request#/#*#", "socket.io-request#/#abc#"));
        assert!(!glob_match("socket.io-request#/#*#", "socket.io-request#/chat#abc#"));
        assert!(glob_match("a\\*b", "a*b"));
        assert!(!glob_match("a\\*b", "axb"));
        assert!(glob_match("a?c", "abc"));
    }
}
