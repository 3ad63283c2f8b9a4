//! MessagePack wire codec
//!
//! Broadcast frames are positional arrays:
//! `[uid, [opcode, namespace, event, ...args], {rooms, except, flags?, attachments?}]`

mod args;
mod frame;

pub use args::{binary, count_attachments, has_binary, to_arg};
pub use frame::{decode, encode, DecodedBroadcast};

pub(crate) use frame::{packet_array, parse_packet_array};
