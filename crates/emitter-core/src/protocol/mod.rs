//! Cluster request/response protocol
//!
//! Requests are published on the namespace request channel as MessagePack maps;
//! every gateway node answers at most once on the request's response channel.

mod request;
mod request_type;
mod response;
mod wire;

pub use request::{Command, Request, RequestMessage};
pub use request_type::RequestType;
pub use response::{ResponseMessage, SocketDescriptor};
pub use wire::{WireFlags, WireOptions};
