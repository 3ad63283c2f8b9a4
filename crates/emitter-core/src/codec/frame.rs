//! Broadcast frame encoding

use rmpv::Value;

use super::args::count_attachments;
use crate::error::EncodingError;
use crate::ids::ServerId;
use crate::packet::{Packet, PacketType};
use crate::protocol::WireOptions;

/// A broadcast frame read back from the wire
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBroadcast {
    /// Id of the process that emitted the frame
    pub uid: String,
    pub packet_type: PacketType,
    pub packet: Packet,
}

/// Build `[opcode, namespace, event, ...args]` and return it with its attachment count
pub(crate) fn packet_array(namespace: &str, event: &str, args: &[Value]) -> (Vec<Value>, usize) {
    let attachments = count_attachments(args);
    let packet_type = PacketType::event(attachments > 0);

    let mut data = Vec::with_capacity(args.len() + 3);
    data.push(Value::from(packet_type.as_u8()));
    data.push(Value::from(namespace));
    data.push(Value::from(event));
    data.extend(args.iter().cloned());

    (data, attachments)
}

/// Split `[opcode, namespace, event, ...args]` back into its parts
pub(crate) fn parse_packet_array(
    data: Vec<Value>,
) -> Result<(PacketType, String, String, Vec<Value>), EncodingError> {
    let mut items = data.into_iter();

    let raw_type = items
        .next()
        .and_then(|v| v.as_u64())
        .ok_or_else(|| EncodingError::Malformed("missing packet type".to_string()))?;
    let packet_type =
        PacketType::from_u64(raw_type).ok_or(EncodingError::UnknownPacketType(raw_type))?;
    if !packet_type.is_event() {
        return Err(EncodingError::UnknownPacketType(raw_type));
    }

    let namespace = next_string(&mut items, "namespace")?;
    let event = next_string(&mut items, "event name")?;

    Ok((packet_type, namespace, event, items.collect()))
}

fn next_string(
    items: &mut impl Iterator<Item = Value>,
    what: &str,
) -> Result<String, EncodingError> {
    match items.next() {
        Some(Value::String(s)) => s
            .into_str()
            .ok_or_else(|| EncodingError::Malformed(format!("{what} is not valid UTF-8"))),
        _ => Err(EncodingError::Malformed(format!("missing {what}"))),
    }
}

/// Encode a packet into a broadcast frame
///
/// Pure and deterministic: the same server id and packet always give the same bytes.
pub fn encode(server_id: &ServerId, packet: &Packet) -> Result<Vec<u8>, EncodingError> {
    let (data, attachments) = packet_array(&packet.namespace, &packet.event, &packet.args);
    let opts = WireOptions::from_options(&packet.options, attachments);

    Ok(rmp_serde::to_vec_named(&(server_id.as_str(), data, opts))?)
}

/// Decode a broadcast frame
pub fn decode(bytes: &[u8]) -> Result<DecodedBroadcast, EncodingError> {
    let (uid, data, opts): (String, Vec<Value>, WireOptions) = rmp_serde::from_slice(bytes)?;
    let (packet_type, namespace, event, args) = parse_packet_array(data)?;

    let attachments = count_attachments(&args);
    if packet_type.is_binary() != (attachments > 0) {
        return Err(EncodingError::Malformed(format!(
            "{packet_type} with {attachments} binary attachment(s)"
        )));
    }

    Ok(DecodedBroadcast {
        uid,
        packet_type,
        packet: Packet {
            namespace,
            event,
            args,
            options: opts.to_options(),
        },
    })
}
