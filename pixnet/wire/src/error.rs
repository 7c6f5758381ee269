//! Wire protocol error types.

use thiserror::Error;

/// Wire protocol errors
#[derive(Error, Debug)]
pub enum WireError {
    /// Incomplete message (need more data)
    #[error("incomplete message")]
    Incomplete,

    /// Unknown message magic
    #[error("unknown magic {0:?}")]
    Magic([u8; 6]),

    /// Unsupported protocol version
    #[error("version unsupported: {0}")]
    Version(u8),

    /// Size limit exceeded
    #[error("size limit exceeded: {0}")]
    Size(usize),

    /// Payload checksum mismatch
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    Checksum {
        /// Checksum declared in the frame header
        expected: u32,
        /// Checksum computed over the received payload
        actual: u32,
    },

    /// Reserved bits nonzero
    #[error("reserved bits nonzero")]
    Reserved,

    /// Unknown enum discriminant
    #[error("unknown {kind} value {value}")]
    Discriminant {
        /// Which field carried the value
        kind: &'static str,
        /// The rejected value
        value: u16,
    },

    /// Declared length runs past the message body
    #[error("truncated field: {0}")]
    Truncated(&'static str),

    /// Invalid UTF-8 in a length-prefixed string
    #[error("invalid utf-8 in {0}")]
    Utf8(&'static str),

    /// Non-ASCII byte in an ASCII-only field
    #[error("non-ascii byte in {0}")]
    Ascii(&'static str),

    /// Width or height outside [1, 65535]
    #[error("invalid dimensions {width}x{height}")]
    Dimensions {
        /// Declared width
        width: u16,
        /// Declared height
        height: u16,
    },

    /// Declared and actual buffer sizes disagree
    #[error("{section} size mismatch: declared {declared}, got {actual}")]
    SizeMismatch {
        /// Section name
        section: &'static str,
        /// Size implied by the header
        declared: usize,
        /// Size actually present
        actual: usize,
    },

    /// Compression or decompression failure
    #[error("compression: {0}")]
    Compress(String),

    /// Decompressed output would exceed the configured ceiling
    #[error("decompressed size {0} exceeds ceiling")]
    DecompressBomb(usize),
}

/// Protocol error codes carried in `PIXERR` messages.
///
/// The numeric value is a serialization detail of the wire format; these
/// never mix with the PXNT container's error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum WireErrorCode {
    /// Framing violated, sequence gap, or unknown magic
    ProtocolError = 1000,
    /// Peer offered a version this implementation does not speak
    UnsupportedVersion = 1001,
    /// Message carried a session ID that does not match any session
    InvalidSession = 1002,
    /// Message exceeded the inbound size limit
    FrameTooLarge = 1003,
    /// Frame payload failed its CRC check
    ChecksumMismatch = 1004,
    /// Keepalive deadline passed without a PONG
    Timeout = 1005,
    /// Inbound event rate or session limit exceeded
    RateLimited = 1006,
    /// Pointer event resolved to a category absent from the page
    InvalidZone = 1007,
    /// Input zone submission failed validation
    ValidationFailed = 1008,
}

impl TryFrom<u16> for WireErrorCode {
    type Error = WireError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1000 => Ok(WireErrorCode::ProtocolError),
            1001 => Ok(WireErrorCode::UnsupportedVersion),
            1002 => Ok(WireErrorCode::InvalidSession),
            1003 => Ok(WireErrorCode::FrameTooLarge),
            1004 => Ok(WireErrorCode::ChecksumMismatch),
            1005 => Ok(WireErrorCode::Timeout),
            1006 => Ok(WireErrorCode::RateLimited),
            1007 => Ok(WireErrorCode::InvalidZone),
            1008 => Ok(WireErrorCode::ValidationFailed),
            _ => Err(WireError::Discriminant {
                kind: "error code",
                value,
            }),
        }
    }
}
