//! Redis-backed emitter tests
//!
//! These tests require:
//! - Running Redis instance
//! - Environment variable: REDIS_URL
//!
//! Run with: cargo test -p integration-tests --test redis_tests

use emitter_common::AppConfig;
use emitter_core::{
    decode, ChannelRouter, MessageHandler, MessagePublisher, MessageSubscriber, RequestMessage,
    RequestType, ResponseMessage, Value,
};
use emitter_redis::{RedisPool, RedisPublisher, RedisSubscriber, SubscriberConfig};
use emitter_service::{Emitter, Outcome};
use integration_tests::{check_redis_env, test_config};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

static COUNTER: AtomicU32 = AtomicU32::new(1);

/// Configuration with a channel prefix no other test run shares
fn isolated_config() -> AppConfig {
    let mut config = test_config().expect("valid configuration");
    config.emitter.key = format!(
        "emitter-it-{}-{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    );
    config
}

struct Collector(mpsc::UnboundedSender<(String, Vec<u8>)>);

impl MessageHandler for Collector {
    fn on_message(&self, channel: &str, payload: &[u8]) {
        let _ = self.0.send((channel.to_string(), payload.to_vec()));
    }
}

/// Answers fetch-sockets requests with one socket, like a gateway node
struct Responder {
    uid: String,
    router: ChannelRouter,
    publisher: Arc<RedisPublisher>,
}

impl MessageHandler for Responder {
    fn on_message(&self, _channel: &str, payload: &[u8]) {
        let Ok(request) = RequestMessage::decode(payload) else {
            return;
        };
        if request.kind != RequestType::FetchSockets {
            return;
        }

        let socket = Value::Map(vec![
            (Value::from("id"), Value::from("s1")),
            (Value::from("rooms"), Value::Array(vec![Value::from("s1")])),
        ]);
        let reply = ResponseMessage::new(request.request_id.clone())
            .with_uid(self.uid.as_str())
            .with_data(Value::Array(vec![socket]))
            .encode()
            .expect("reply encodes");
        let channel = self.router.response_channel_for("/", &request.request_id);
        let publisher = self.publisher.clone();

        tokio::spawn(async move {
            publisher.publish(&channel, &reply).await.expect("reply published");
        });
    }
}

#[tokio::test]
async fn test_broadcast_over_redis() {
    if !check_redis_env().await {
        return;
    }

    let config = isolated_config();
    let listener = RedisSubscriber::new(SubscriberConfig::from(&config.redis))
        .await
        .unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    listener
        .psubscribe(&format!("{}#/#*", config.emitter.key), Arc::new(Collector(tx)))
        .await
        .unwrap();

    let emitter = Emitter::connect(&config).await.unwrap();
    let receivers = emitter
        .of("/")
        .emit("chat", vec![Value::from("hello")])
        .await
        .unwrap();
    assert_eq!(receivers, 1);

    let (channel, payload) = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("frame delivered")
        .unwrap();
    assert_eq!(channel, format!("{}#/#", config.emitter.key));

    let frame = decode(&payload).unwrap();
    assert_eq!(frame.uid, emitter.server_id().as_str());
    assert_eq!(frame.packet.event, "chat");

    emitter.shutdown().await;
    listener.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_fetch_sockets_over_redis() {
    if !check_redis_env().await {
        return;
    }

    let config = isolated_config();
    let router = ChannelRouter::new(config.emitter.key.clone());
    let pool = RedisPool::from_config(&config.redis).unwrap();
    let node = RedisSubscriber::new(SubscriberConfig::from(&config.redis))
        .await
        .unwrap();
    node.psubscribe(
        &router.request_channel_for("/"),
        Arc::new(Responder {
            uid: "node-a".to_string(),
            router: router.clone(),
            publisher: Arc::new(RedisPublisher::new(pool)),
        }),
    )
    .await
    .unwrap();

    let emitter = Emitter::connect(&config).await.unwrap();
    let reply = emitter
        .of("/")
        .expect_replies(1)
        .timeout(Duration::from_secs(2))
        .fetch_sockets()
        .await
        .unwrap();

    assert_eq!(reply.outcome(), Outcome::Complete);
    assert_eq!(reply.value().len(), 1);
    assert_eq!(reply.value()[0].id, "s1");

    emitter.shutdown().await;
    node.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_request_without_nodes_times_out() {
    if !check_redis_env().await {
        return;
    }

    let emitter = Emitter::connect(&isolated_config()).await.unwrap();

    let reply = emitter
        .of("/")
        .timeout(Duration::from_millis(300))
        .fetch_sockets()
        .await
        .unwrap();

    assert_eq!(reply.outcome(), Outcome::TimedOut);
    assert_eq!(reply.responders(), 0);
    assert_eq!(emitter.pending_requests(), 0);

    emitter.shutdown().await;
}
