//! Cluster requests

use chrono::{DateTime, Utc};
use rmpv::Value;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{RequestType, WireOptions};
use crate::codec::{packet_array, parse_packet_array};
use crate::error::EncodingError;
use crate::ids::{RequestId, ServerId};
use crate::packet::{BroadcastOptions, Packet, PacketType, DEFAULT_NAMESPACE};

/// Command-specific part of a request
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    EmitWithAck { event: String, args: Vec<Value> },
    FetchSockets,
    ServerSideEmit { event: String, args: Vec<Value> },
    RemoteJoin { rooms: Vec<String> },
    RemoteLeave { rooms: Vec<String> },
    RemoteDisconnect { close: bool },
}

impl Command {
    #[must_use]
    pub fn kind(&self) -> RequestType {
        match self {
            Self::EmitWithAck { .. } => RequestType::EmitWithAck,
            Self::FetchSockets => RequestType::FetchSockets,
            Self::ServerSideEmit { .. } => RequestType::ServerSideEmit,
            Self::RemoteJoin { .. } => RequestType::RemoteJoin,
            Self::RemoteLeave { .. } => RequestType::RemoteLeave,
            Self::RemoteDisconnect { .. } => RequestType::RemoteDisconnect,
        }
    }
}

/// A cluster-wide command awaiting replies
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: RequestId,
    pub command: Command,
    pub namespace: String,
    /// Which sockets the command applies to
    pub options: BroadcastOptions,
    /// Stop collecting once this many nodes replied (unknown when `None`)
    pub expected_replies: Option<usize>,
    pub timeout: Duration,
    pub created_at: DateTime<Utc>,
}

impl Request {
    /// Create a request with a fresh id
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        command: Command,
        options: BroadcastOptions,
        timeout: Duration,
    ) -> Self {
        let namespace = namespace.into();
        Self {
            id: RequestId::generate(),
            command,
            namespace: if namespace.is_empty() {
                DEFAULT_NAMESPACE.to_string()
            } else {
                namespace
            },
            options,
            expected_replies: None,
            timeout,
            created_at: Utc::now(),
        }
    }

    /// Set the number of replies after which the request is complete
    #[must_use]
    pub fn expect_replies(mut self, expected: Option<usize>) -> Self {
        self.expected_replies = expected;
        self
    }

    #[must_use]
    pub fn kind(&self) -> RequestType {
        self.command.kind()
    }

    /// Wire message for this request
    #[must_use]
    pub fn to_message(&self, uid: &ServerId) -> RequestMessage {
        let mut attachments = 0;
        let mut message = RequestMessage {
            uid: uid.to_string(),
            request_id: self.id.clone(),
            kind: self.kind(),
            opts: WireOptions::default(),
            rooms: Vec::new(),
            close: false,
            packet: None,
            data: None,
        };

        match &self.command {
            Command::EmitWithAck { event, args } => {
                let (packet, count) = packet_array(&self.namespace, event, args);
                attachments = count;
                message.packet = Some(packet);
            }
            Command::ServerSideEmit { event, args } => {
                let mut data = Vec::with_capacity(args.len() + 1);
                data.push(Value::from(event.as_str()));
                data.extend(args.iter().cloned());
                message.data = Some(data);
            }
            Command::RemoteJoin { rooms } | Command::RemoteLeave { rooms } => {
                message.rooms.clone_from(rooms);
            }
            Command::RemoteDisconnect { close } => message.close = *close,
            Command::FetchSockets => {}
        }

        message.opts = WireOptions::from_options(&self.options, attachments);
        message
    }

    /// Encode the request for the request channel
    pub fn encode(&self, uid: &ServerId) -> Result<Vec<u8>, EncodingError> {
        self.to_message(uid).encode()
    }
}

/// Request as carried on the request channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    /// Id of the emitting process
    pub uid: String,
    pub request_id: RequestId,
    #[serde(rename = "type")]
    pub kind: RequestType,
    #[serde(default)]
    pub opts: WireOptions,
    /// Rooms to join or leave
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rooms: Vec<String>,
    /// Close the underlying connection on disconnect
    #[serde(default, skip_serializing_if = "is_false")]
    pub close: bool,
    /// `[opcode, namespace, event, ...args]` for emit-with-ack
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet: Option<Vec<Value>>,
    /// `[event, ...args]` for server-side emit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Value>>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

impl RequestMessage {
    pub fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EncodingError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// The event carried by an emit-with-ack request
    pub fn packet(&self) -> Result<Option<(PacketType, Packet)>, EncodingError> {
        let Some(data) = self.packet.clone() else {
            return Ok(None);
        };
        let (packet_type, namespace, event, args) = parse_packet_array(data)?;
        let packet = Packet {
            namespace,
            event,
            args,
            options: self.opts.to_options(),
        };
        Ok(Some((packet_type, packet)))
    }
}
