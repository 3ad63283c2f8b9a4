//! Transport traits (ports)
//!
//! The domain layer defines what it needs from pub/sub; the Redis crate (and the
//! in-memory test bus) provide the implementations.

mod transport;

pub use transport::{MessageHandler, MessagePublisher, MessageSubscriber};
