//! Replies sent by gateway nodes

use rmpv::Value;
use serde::{Deserialize, Serialize};

use crate::error::EncodingError;
use crate::ids::RequestId;

/// One node's reply to a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    pub request_id: RequestId,
    /// Id of the replying node; used to ignore a second reply from the same node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Command-specific payload (absent for acknowledgements)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseMessage {
    #[must_use]
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            uid: None,
            data: None,
        }
    }

    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EncodingError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// A socket as reported by a fetch-sockets reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketDescriptor {
    pub id: String,
    #[serde(default)]
    pub rooms: Vec<String>,
    #[serde(default)]
    pub handshake: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl SocketDescriptor {
    /// Read the socket list carried by one fetch-sockets reply
    pub fn list_from(data: Value) -> Result<Vec<Self>, EncodingError> {
        if data.is_nil() {
            return Ok(Vec::new());
        }
        Ok(rmpv::ext::from_value(data)?)
    }
}
