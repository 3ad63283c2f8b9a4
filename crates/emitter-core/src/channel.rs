//! Redis channel naming
//!
//! Gateways subscribe to these names, so every string produced here is part of the
//! wire protocol and must match byte for byte (case-sensitive).
//!
//! - broadcast: `<prefix>#<nsp>#` or `<prefix>#<nsp>#<room>#`
//! - request:   `<prefix>-request#<nsp>#`
//! - response:  `<prefix>-request#<nsp>#<requestId>#`

use crate::ids::RequestId;
use crate::packet::DEFAULT_NAMESPACE;

/// Default channel prefix (the socket.io Redis adapter key)
pub const DEFAULT_PREFIX: &str = "socket.io";

/// Derives channel names from a fixed prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRouter {
    prefix: String,
}

impl Default for ChannelRouter {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl ChannelRouter {
    /// Create a router for the given prefix
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Broadcast channel for a namespace, optionally narrowed to a single room
    #[must_use]
    pub fn channel_for(&self, namespace: &str, room: Option<&str>) -> String {
        let nsp = normalize(namespace);
        match room {
            Some(room) => format!("{}#{nsp}#{room}#", self.prefix),
            None => format!("{}#{nsp}#", self.prefix),
        }
    }

    /// Channel every gateway of a namespace listens on for requests
    #[must_use]
    pub fn request_channel_for(&self, namespace: &str) -> String {
        format!("{}-request#{}#", self.prefix, normalize(namespace))
    }

    /// Channel the gateways answer a given request on
    #[must_use]
    pub fn response_channel_for(&self, namespace: &str, request_id: &RequestId) -> String {
        format!("{}-request#{}#{request_id}#", self.prefix, normalize(namespace))
    }

    /// Glob pattern matching every response channel of a namespace
    ///
    /// Glob metacharacters in the prefix and namespace are escaped so they only match
    /// themselves. The request channel itself is not matched.
    #[must_use]
    pub fn response_pattern_for(&self, namespace: &str) -> String {
        format!(
            "{}-request#{}#*#",
            escape_glob(&self.prefix),
            escape_glob(normalize(namespace))
        )
    }

    /// Recover the request id embedded in a response channel name
    #[must_use]
    pub fn request_id_from_channel(&self, namespace: &str, channel: &str) -> Option<RequestId> {
        let head = self.request_channel_for(namespace);
        let id = channel.strip_prefix(&head)?.strip_suffix('#')?;
        if id.is_empty() || id.contains('#') {
            return None;
        }
        Some(RequestId::from(id))
    }
}

fn normalize(namespace: &str) -> &str {
    if namespace.is_empty() {
        DEFAULT_NAMESPACE
    } else {
        namespace
    }
}

fn escape_glob(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
