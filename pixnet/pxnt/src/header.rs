//! PXNT header and footer layouts.

use crate::error::PxntError;
use bitflags::bitflags;
use bytes::{BufMut, BytesMut};
use pixnet_wire::PixelFormat;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 32;

/// Footer size in bytes.
pub const FOOTER_SIZE: usize = 16;

/// Header magic.
pub const PXNT_MAGIC: &[u8; 4] = b"PXNT";

/// Footer magic.
pub const FOOTER_MAGIC: &[u8; 4] = b"TNXP";

/// Container version this implementation reads and writes.
pub const PXNT_VERSION: u16 = 1;

bitflags! {
    /// Header flags. Bits 4..15 are reserved and must be zero.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PxntFlags: u16 {
        /// Pixel and category-map sections are compressed
        const COMPRESSED = 1 << 0;
        /// An animation section follows the category definitions
        const HAS_ANIMATION = 1 << 1;
        /// An audio section is present
        const HAS_AUDIO = 1 << 2;
        /// An extended-metadata section is present
        const HAS_EXTENDED_META = 1 << 3;
    }
}

/// Compression algorithms legal in a PXNT container.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Sections stored raw
    None = 0,
    /// zlib (RFC 1950)
    Zlib = 1,
    /// LZ4 block format
    Lz4 = 2,
}

impl TryFrom<u8> for Compression {
    type Error = PxntError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Zlib),
            2 => Ok(Compression::Lz4),
            other => Err(PxntError::InvalidCompression(other)),
        }
    }
}

/// The 32-byte container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Container version (=1)
    pub version: u16,
    /// Section presence and compression flags
    pub flags: PxntFlags,
    /// Total file size in bytes, echoed in the footer
    pub file_size: u32,
    /// Creation time, Unix seconds
    pub created: u32,
    /// Last modification time, Unix seconds
    pub modified: u32,
    /// CRC-32 over the data region (post-header, pre-footer)
    pub data_crc: u32,
    /// Page width in pixels
    pub width: u16,
    /// Page height in pixels
    pub height: u16,
    /// Pixel storage format
    pub format: PixelFormat,
    /// Section compression algorithm
    pub compression: Compression,
}

impl Header {
    /// Encode to the 32-byte layout.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE);
        buf.put_slice(PXNT_MAGIC);
        buf.put_u16_le(self.version);
        buf.put_u16_le(self.flags.bits());
        buf.put_u32_le(self.file_size);
        buf.put_u32_le(self.created);
        buf.put_u32_le(self.modified);
        buf.put_u32_le(self.data_crc);
        buf.put_u16_le(self.width);
        buf.put_u16_le(self.height);
        buf.put_u8(self.format as u8);
        buf.put_u8(self.compression as u8);
        buf.put_u16_le(0); // reserved

        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(&buf);
        out
    }

    /// Decode and validate a 32-byte header.
    pub fn decode(raw: &[u8]) -> Result<Self, PxntError> {
        if raw.len() < HEADER_SIZE {
            return Err(PxntError::TruncatedFile("header"));
        }
        if &raw[0..4] != PXNT_MAGIC {
            return Err(PxntError::InvalidMagic);
        }

        let version = u16::from_le_bytes([raw[4], raw[5]]);
        if version != PXNT_VERSION {
            return Err(PxntError::UnsupportedVersion(version));
        }

        let flags = PxntFlags::from_bits(u16::from_le_bytes([raw[6], raw[7]]))
            .ok_or(PxntError::Reserved)?;
        let file_size = u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]);
        let created = u32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]);
        let modified = u32::from_le_bytes([raw[16], raw[17], raw[18], raw[19]]);
        let data_crc = u32::from_le_bytes([raw[20], raw[21], raw[22], raw[23]]);
        let width = u16::from_le_bytes([raw[24], raw[25]]);
        let height = u16::from_le_bytes([raw[26], raw[27]]);

        if width == 0 || height == 0 {
            return Err(PxntError::InvalidDimensions { width, height });
        }

        let format =
            PixelFormat::try_from(raw[28]).map_err(|_| PxntError::InvalidPixelFormat(raw[28]))?;
        let compression = Compression::try_from(raw[29])?;

        if raw[30] != 0 || raw[31] != 0 {
            return Err(PxntError::Reserved);
        }

        Ok(Self {
            version,
            flags,
            file_size,
            created,
            modified,
            data_crc,
            width,
            height,
            format,
            compression,
        })
    }
}

/// The 16-byte container footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    /// CRC-32 over the data region; must match the header's `data_crc`
    pub data_crc: u32,
    /// CRC-32 over the final 32-byte header
    pub header_crc: u32,
    /// Echo of the header's `file_size`
    pub file_size: u32,
}

impl Footer {
    /// Encode to the 16-byte layout.
    pub fn encode(&self) -> [u8; FOOTER_SIZE] {
        let mut buf = BytesMut::with_capacity(FOOTER_SIZE);
        buf.put_slice(FOOTER_MAGIC);
        buf.put_u32_le(self.data_crc);
        buf.put_u32_le(self.header_crc);
        buf.put_u32_le(self.file_size);

        let mut out = [0u8; FOOTER_SIZE];
        out.copy_from_slice(&buf);
        out
    }

    /// Decode a 16-byte footer.
    pub fn decode(raw: &[u8]) -> Result<Self, PxntError> {
        if raw.len() < FOOTER_SIZE {
            return Err(PxntError::TruncatedFile("footer"));
        }
        if &raw[0..4] != FOOTER_MAGIC {
            return Err(PxntError::InvalidMagic);
        }
        Ok(Self {
            data_crc: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
            header_crc: u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]),
            file_size: u32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        Header {
            version: PXNT_VERSION,
            flags: PxntFlags::COMPRESSED,
            file_size: 1234,
            created: 1_700_000_000,
            modified: 1_700_000_100,
            data_crc: 0xDEADBEEF,
            width: 640,
            height: 480,
            format: PixelFormat::Rgba8,
            compression: Compression::Zlib,
        }
    }

    #[test]
    fn test_header_roundtrip() {
        let header = sample_header();
        let raw = header.encode();
        assert_eq!(raw.len(), HEADER_SIZE);
        assert_eq!(Header::decode(&raw).unwrap(), header);
    }

    #[test]
    fn test_header_bad_magic() {
        let mut raw = sample_header().encode();
        raw[0] = b'X';
        assert!(matches!(
            Header::decode(&raw),
            Err(PxntError::InvalidMagic)
        ));
    }

    #[test]
    fn test_header_bad_version() {
        let mut raw = sample_header().encode();
        raw[4] = 2;
        assert!(matches!(
            Header::decode(&raw),
            Err(PxntError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_header_zero_dimensions() {
        let mut raw = sample_header().encode();
        raw[24] = 0;
        raw[25] = 0;
        assert!(matches!(
            Header::decode(&raw),
            Err(PxntError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_header_reserved_bytes() {
        let mut raw = sample_header().encode();
        raw[31] = 1;
        assert!(matches!(Header::decode(&raw), Err(PxntError::Reserved)));
    }

    #[test]
    fn test_header_bad_compression() {
        let mut raw = sample_header().encode();
        raw[29] = 3;
        assert!(matches!(
            Header::decode(&raw),
            Err(PxntError::InvalidCompression(3))
        ));
    }

    #[test]
    fn test_footer_roundtrip() {
        let footer = Footer {
            data_crc: 1,
            header_crc: 2,
            file_size: 3,
        };
        assert_eq!(Footer::decode(&footer.encode()).unwrap(), footer);
    }
}
