//! Redis Pub/Sub module.
//!
//! Publishes encoded frames and listens on reply patterns.

mod publisher;
mod subscriber;

pub use publisher::RedisPublisher;
pub use subscriber::{RedisSubscriber, SubscriberBuilder, SubscriberConfig};
