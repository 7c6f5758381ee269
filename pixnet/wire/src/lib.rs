//! Wire protocol framing, typed messages and codec primitives for PIXNET.
//!
//! This crate implements the transport-facing half of the protocol: the
//! eleven magic-tagged message types, the rendering-frame codec with CRC
//! integrity, capability negotiation flags, and the bounded byte-level
//! primitives shared with the PXNT container codec.
//!
//! ## Wire format
//!
//! ```text
//! +---------------------+------------------------------------+
//! | magic (6B ASCII)    | message type tag                   |
//! +---------------------+------------------------------------+
//! | typed envelope      | fixed fields per message type      |
//! +---------------------+------------------------------------+
//! | variable payload    | length-prefixed strings / sections |
//! +---------------------+------------------------------------+
//! ```
//!
//! All multi-byte integers on the wire are big-endian. Messages are
//! self-delimiting; [`MessageDecoder`] consumes them incrementally from a
//! read buffer and returns `None` until a complete message is available.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod capabilities;
pub mod compress;
pub mod error;
pub mod frame;
pub mod message;
pub mod primitives;

pub use capabilities::Capabilities;
pub use compress::{
    lz4_compress, lz4_decompress, zlib_compress, zlib_decompress, DEFAULT_DECOMPRESS_CEILING,
};
pub use error::{WireError, WireErrorCode};
pub use frame::{
    FrameEncoder, FrameFlags, FrameType, PixelFormat, RenderFrame, WireCategory,
    RENDER_HEADER_SIZE,
};
pub use message::{
    ByeReason, DragAction, Message, MessageDecoder, SessionId, DEFAULT_MAX_MESSAGE_SIZE,
    MAGIC_LEN,
};
pub use primitives::{crc32, BoundedReader};

/// Wire protocol version.
pub const WIRE_VERSION: u8 = 1;

/// Default TCP port for `pixnet://` connections.
pub const DEFAULT_PORT: u16 = 7621;
