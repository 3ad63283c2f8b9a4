//! Wire rendering of broadcast options

use serde::{Deserialize, Serialize};

use crate::packet::{BroadcastFlags, BroadcastOptions};

/// `{rooms, except, flags?, attachments?}` as sent to the gateways
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WireOptions {
    #[serde(default)]
    pub rooms: Vec<String>,
    #[serde(default)]
    pub except: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<WireFlags>,
    /// Number of binary blobs in the packet arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<u32>,
}

/// Flag map; only flags that are set are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WireFlags {
    #[serde(default, skip_serializing_if = "is_false")]
    pub volatile: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub compress: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub broadcast: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

impl From<BroadcastFlags> for WireFlags {
    fn from(flags: BroadcastFlags) -> Self {
        Self {
            volatile: flags.is_volatile(),
            compress: flags.is_compress(),
            broadcast: flags.is_broadcast_all(),
        }
    }
}

impl From<WireFlags> for BroadcastFlags {
    fn from(flags: WireFlags) -> Self {
        let mut result = BroadcastFlags::empty();
        result.set(BroadcastFlags::VOLATILE, flags.volatile);
        result.set(BroadcastFlags::COMPRESS, flags.compress);
        result.set(BroadcastFlags::BROADCAST_ALL, flags.broadcast);
        result
    }
}

impl WireOptions {
    /// Render options, attaching the binary attachment count when non-zero
    #[must_use]
    pub fn from_options(options: &BroadcastOptions, attachments: usize) -> Self {
        Self {
            rooms: options.rooms.clone(),
            except: options.except.clone(),
            flags: (!options.flags.is_empty()).then(|| WireFlags::from(options.flags)),
            attachments: (attachments > 0).then_some(attachments as u32),
        }
    }

    #[must_use]
    pub fn to_options(&self) -> BroadcastOptions {
        BroadcastOptions {
            rooms: self.rooms.clone(),
            except: self.except.clone(),
            flags: self.flags.map(BroadcastFlags::from).unwrap_or_default(),
        }
    }
}
