//! Request type codes
//!
//! Numbering follows the socket.io Redis adapter request types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Kind of cluster-wide command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestType {
    /// Make matching sockets join rooms
    RemoteJoin = 2,
    /// Make matching sockets leave rooms
    RemoteLeave = 3,
    /// Disconnect matching sockets
    RemoteDisconnect = 4,
    /// Collect descriptors of matching sockets
    FetchSockets = 5,
    /// Event delivered to the other servers, not to clients
    ServerSideEmit = 6,
    /// Broadcast that collects client acknowledgements
    EmitWithAck = 7,
}

impl RequestType {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            2 => Some(Self::RemoteJoin),
            3 => Some(Self::RemoteLeave),
            4 => Some(Self::RemoteDisconnect),
            5 => Some(Self::FetchSockets),
            6 => Some(Self::ServerSideEmit),
            7 => Some(Self::EmitWithAck),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether replies only acknowledge the command and carry no payload
    #[must_use]
    pub const fn is_acknowledgement(self) -> bool {
        matches!(self, Self::RemoteJoin | Self::RemoteLeave | Self::RemoteDisconnect)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RemoteJoin => "remote-join",
            Self::RemoteLeave => "remote-leave",
            Self::RemoteDisconnect => "remote-disconnect",
            Self::FetchSockets => "fetch-sockets",
            Self::ServerSideEmit => "server-side-emit",
            Self::EmitWithAck => "emit-with-ack",
        }
    }
}

impl Serialize for RequestType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for RequestType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Self::from_u8(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid request type: {value}")))
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
