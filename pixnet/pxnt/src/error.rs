//! PXNT container error types.
//!
//! The numeric codes are a serialization detail kept separate from the wire
//! protocol's error namespace.

use pixnet_page::PageError;
use pixnet_wire::WireError;
use thiserror::Error;

/// PXNT container errors.
#[derive(Error, Debug)]
pub enum PxntError {
    /// Header magic is not `PXNT` or footer magic is not `TNXP`
    #[error("invalid magic")]
    InvalidMagic,

    /// Container version this implementation does not read
    #[error("unsupported version {0}")]
    UnsupportedVersion(u16),

    /// A CRC-32 check failed
    #[error("{which} crc mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        /// Which checksum failed ("data" or "header")
        which: &'static str,
        /// Stored value
        expected: u32,
        /// Computed value
        actual: u32,
    },

    /// Width or height outside (0, 65535]
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions {
        /// Declared width
        width: u16,
        /// Declared height
        height: u16,
    },

    /// Unknown pixel format value
    #[error("invalid pixel format {0}")]
    InvalidPixelFormat(u8),

    /// File ends before a declared field or section
    #[error("truncated file: {0}")]
    TruncatedFile(&'static str),

    /// Unknown compression algorithm value
    #[error("invalid compression {0}")]
    InvalidCompression(u8),

    /// Decompression failed on a compressed section
    #[error("section decompression failed: {0}")]
    Decompress(String),

    /// A declared section size exceeds the file or the configured ceiling
    #[error("section overflow: {declared} bytes declared, limit {limit}")]
    SectionOverflow {
        /// Declared size
        declared: usize,
        /// Applicable limit
        limit: usize,
    },

    /// Reserved header bits or bytes are nonzero
    #[error("reserved bits nonzero")]
    Reserved,

    /// Invalid UTF-8 in a string field
    #[error("invalid utf-8 in {0}")]
    Utf8(&'static str),

    /// Unknown extended-property value type
    #[error("unknown property type {0}")]
    UnknownPropertyType(u8),

    /// The decoded sections do not form a valid page
    #[error(transparent)]
    Page(#[from] PageError),

    /// Underlying I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PxntError {
    /// The container's numeric error code for this failure.
    pub fn code(&self) -> u16 {
        match self {
            PxntError::InvalidMagic => 1000,
            PxntError::UnsupportedVersion(_) => 1001,
            PxntError::ChecksumMismatch { .. } => 1002,
            PxntError::InvalidDimensions { .. } | PxntError::InvalidPixelFormat(_) => 1003,
            PxntError::TruncatedFile(_)
            | PxntError::Utf8(_)
            | PxntError::Reserved
            | PxntError::UnknownPropertyType(_) => 1004,
            PxntError::InvalidCompression(_) | PxntError::Decompress(_) => 1005,
            PxntError::SectionOverflow { .. } => 1006,
            PxntError::Page(_) | PxntError::Io(_) => 1004,
        }
    }
}

impl From<WireError> for PxntError {
    fn from(e: WireError) -> Self {
        match e {
            WireError::Truncated(what) => PxntError::TruncatedFile(what),
            WireError::Utf8(what) => PxntError::Utf8(what),
            WireError::DecompressBomb(n) => PxntError::SectionOverflow {
                declared: n,
                limit: 0,
            },
            WireError::SizeMismatch {
                declared, actual, ..
            } => PxntError::SectionOverflow {
                declared: actual,
                limit: declared,
            },
            WireError::Compress(msg) => PxntError::Decompress(msg),
            other => PxntError::Decompress(other.to_string()),
        }
    }
}
