//! Packet model - the event to emit and how to target it

mod flags;
mod opcode;
mod packet;

pub use flags::BroadcastFlags;
pub use opcode::PacketType;
pub use packet::{BroadcastOptions, Packet, DEFAULT_NAMESPACE};
