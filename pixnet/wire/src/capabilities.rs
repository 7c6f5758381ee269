//! Capability negotiation flags.

use crate::error::WireError;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Feature bits exchanged during the handshake.
    ///
    /// The negotiated set is the bitwise intersection of both peers'
    /// advertisements. Bits 4..15 are reserved and must be zero.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Capabilities: u16 {
        /// Rendering-frame pixel data may be zlib-deflated
        const COMPRESSION = 1 << 0;
        /// Partial (rectangle diff) frames
        const PARTIAL_FRAMES = 1 << 1;
        /// Animation frames
        const ANIMATION = 1 << 2;
        /// Audio streaming
        const AUDIO = 1 << 3;
    }
}

impl Capabilities {
    /// Decode from the wire, rejecting reserved bits.
    pub fn decode(raw: u16) -> Result<Self, WireError> {
        Self::from_bits(raw).ok_or(WireError::Reserved)
    }

    /// Intersection with a peer's advertised set.
    pub fn negotiate(self, peer: Capabilities) -> Capabilities {
        self & peer
    }
}
