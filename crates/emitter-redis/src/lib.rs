//! # emitter-redis
//!
//! Redis transport for the emitter.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool and a bounded wait
//! - **Publisher**: Fire-and-forget `PUBLISH` of encoded frames
//! - **Subscriber**: Pattern subscriptions for request replies, with automatic reconnect
//!
//! ## Example
//!
//! ```ignore
//! use emitter_redis::{RedisPool, RedisPoolConfig, RedisPublisher, RedisSubscriber, SubscriberConfig};
//!
//! let pool = RedisPool::new(RedisPoolConfig::default())?;
//! let publisher = RedisPublisher::new(pool.clone());
//! let subscriber = RedisSubscriber::new(SubscriberConfig::default()).await?;
//!
//! publisher.publish("socket.io#/#", &frame).await?;
//! subscriber.psubscribe("socket.io-request#/#*#", handler).await?;
//! ```

pub mod pool;
pub mod pubsub;

// Re-export pool types
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};

// Re-export pubsub types
pub use pubsub::{RedisPublisher, RedisSubscriber, SubscriberBuilder, SubscriberConfig};
