//! # emitter-core
//!
//! Domain layer for the socket.io Redis emitter: packet model, MessagePack wire codec,
//! channel naming, request/response messages, and the transport traits implemented
//! by the infrastructure crates.
//! This crate has zero dependencies on Redis or an async runtime.

pub mod channel;
pub mod codec;
pub mod error;
pub mod ids;
pub mod packet;
pub mod protocol;
pub mod traits;

// Re-export commonly used types at crate root
pub use channel::{ChannelRouter, DEFAULT_PREFIX};
pub use codec::{binary, count_attachments, decode, encode, has_binary, to_arg, DecodedBroadcast};
pub use error::{EmitterError, EmitterResult, EncodingError, PublishError, SubscribeError};
pub use ids::{RequestId, ServerId};
pub use packet::{BroadcastFlags, BroadcastOptions, Packet, PacketType, DEFAULT_NAMESPACE};
pub use protocol::{
    Command, Request, RequestMessage, RequestType, ResponseMessage, SocketDescriptor, WireFlags,
    WireOptions,
};
pub use traits::{MessageHandler, MessagePublisher, MessageSubscriber};

/// Dynamic MessagePack value used for event arguments and reply payloads
pub use rmpv::Value;
