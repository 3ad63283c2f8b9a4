//! Broadcast flags

use bitflags::bitflags;

bitflags! {
    /// Per-emit delivery flags forwarded to the gateways
    ///
    /// Whether a flag is honoured is up to the receiving gateway.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BroadcastFlags: u8 {
        /// The event may be dropped if the client is not ready to receive it
        const VOLATILE      = 1 << 0;
        /// Deliver to every socket of the namespace, including the origin
        const BROADCAST_ALL = 1 << 1;
        /// Allow the transport to compress the payload
        const COMPRESS      = 1 << 2;
    }
}

impl BroadcastFlags {
    #[inline]
    pub fn is_volatile(self) -> bool {
        self.contains(Self::VOLATILE)
    }

    #[inline]
    pub fn is_compress(self) -> bool {
        self.contains(Self::COMPRESS)
    }

    #[inline]
    pub fn is_broadcast_all(self) -> bool {
        self.contains(Self::BROADCAST_ALL)
    }

    /// Names of the flags that are set, in wire order
    pub fn list(self) -> Vec<&'static str> {
        let mut result = Vec::new();
        if self.is_volatile() {
            result.push("volatile");
        }
        if self.is_compress() {
            result.push("compress");
        }
        if self.is_broadcast_all() {
            result.push("broadcast");
        }
        result
    }
}
