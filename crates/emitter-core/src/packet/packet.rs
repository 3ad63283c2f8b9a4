//! Packet and broadcast options

use rmpv::Value;
use serde::Serialize;

use super::BroadcastFlags;
use crate::codec::to_arg;
use crate::error::EncodingError;

/// Namespace used when none is given
pub const DEFAULT_NAMESPACE: &str = "/";

/// Room targeting and flags of an emit or cluster request
///
/// Rooms keep insertion order and never contain duplicates. A room that is both
/// included and excluded is excluded; the gateway applies that rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BroadcastOptions {
    /// Rooms to deliver to (empty means every socket of the namespace)
    pub rooms: Vec<String>,
    /// Rooms to skip
    pub except: Vec<String>,
    pub flags: BroadcastFlags,
}

impl BroadcastOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target room
    #[must_use]
    pub fn to(mut self, room: impl Into<String>) -> Self {
        push_unique(&mut self.rooms, room.into());
        self
    }

    /// Add several target rooms
    #[must_use]
    pub fn to_all<I, S>(mut self, rooms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for room in rooms {
            push_unique(&mut self.rooms, room.into());
        }
        self
    }

    /// Exclude a room
    #[must_use]
    pub fn except(mut self, room: impl Into<String>) -> Self {
        push_unique(&mut self.except, room.into());
        self
    }

    /// Set additional flags
    #[must_use]
    pub fn with_flags(mut self, flags: BroadcastFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// The room when exactly one is targeted
    #[must_use]
    pub fn single_room(&self) -> Option<&str> {
        match self.rooms.as_slice() {
            [room] => Some(room.as_str()),
            _ => None,
        }
    }
}

/// One event to emit
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub namespace: String,
    pub event: String,
    pub args: Vec<Value>,
    pub options: BroadcastOptions,
}

impl Packet {
    /// Create an event in the default namespace with no arguments
    #[must_use]
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            event: event.into(),
            args: Vec::new(),
            options: BroadcastOptions::default(),
        }
    }

    /// Set the namespace
    #[must_use]
    pub fn of(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Append an already converted argument
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Append any serializable value as an argument
    pub fn try_arg<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, EncodingError> {
        self.args.push(to_arg(value)?);
        Ok(self)
    }

    /// Replace the arguments
    #[must_use]
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// Replace the targeting options
    #[must_use]
    pub fn with_options(mut self, options: BroadcastOptions) -> Self {
        self.options = options;
        self
    }

    /// Add a target room
    #[must_use]
    pub fn to(mut self, room: impl Into<String>) -> Self {
        self.options = self.options.to(room);
        self
    }

    /// Exclude a room
    #[must_use]
    pub fn except(mut self, room: impl Into<String>) -> Self {
        self.options = self.options.except(room);
        self
    }

    /// Set additional flags
    #[must_use]
    pub fn with_flags(mut self, flags: BroadcastFlags) -> Self {
        self.options = self.options.with_flags(flags);
        self
    }
}

fn push_unique(list: &mut Vec<String>, room: String) {
    if !list.contains(&room) {
        list.push(room);
    }
}
