//! Rendering-frame codec.
//!
//! A `PIXNET` frame carries a complete page: pixel raster, category map and
//! category definitions, guarded by a CRC-32 over the payload exactly as it
//! appears on the wire. Compression is negotiated at handshake and applied
//! only through [`FrameEncoder`], so a sender can never emit a compressed
//! frame on a session that did not negotiate the capability.
//!
//! ## Frame layout
//!
//! ```text
//! +----------------------+--------------------------------------+
//! | header (31B)         | magic·type·seq·ts·flags·ver·dims·crc |
//! +----------------------+--------------------------------------+
//! | pixel section        | raw, or u32 len + zlib when flagged  |
//! +----------------------+--------------------------------------+
//! | category map         | width·height u16 IDs, raw            |
//! +----------------------+--------------------------------------+
//! | category definitions | u16 count + records                  |
//! +----------------------+--------------------------------------+
//! ```

use crate::capabilities::Capabilities;
use crate::compress::{zlib_compress, zlib_decompress};
use crate::error::WireError;
use crate::message::MAGIC_FRAME;
use crate::primitives::{crc32, BoundedReader};
use crate::WIRE_VERSION;
use bitflags::bitflags;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

/// Rendering-frame header size in bytes.
pub const RENDER_HEADER_SIZE: usize = 31;

/// Frame types carried in the rendering-frame header.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameType {
    /// Complete page replacement
    Full = 0,
    /// Rectangle diff (reserved in v1; parsed, not interpreted)
    Partial = 1,
    /// Animation frame
    Animation = 2,
}

impl TryFrom<u8> for FrameType {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FrameType::Full),
            1 => Ok(FrameType::Partial),
            2 => Ok(FrameType::Animation),
            _ => Err(WireError::Discriminant {
                kind: "frame type",
                value: value as u16,
            }),
        }
    }
}

/// Pixel storage formats.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGBA, 4 bytes per pixel
    Rgba8 = 0,
    /// 8-bit RGB, 3 bytes per pixel
    Rgb8 = 1,
    /// 16-bit RGBA, 8 bytes per pixel
    Rgba16 = 2,
}

impl PixelFormat {
    /// Bytes per pixel for this format.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba16 => 8,
        }
    }
}

impl TryFrom<u8> for PixelFormat {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PixelFormat::Rgba8),
            1 => Ok(PixelFormat::Rgb8),
            2 => Ok(PixelFormat::Rgba16),
            _ => Err(WireError::Discriminant {
                kind: "pixel format",
                value: value as u16,
            }),
        }
    }
}

bitflags! {
    /// Rendering-frame flags. Bits 1..15 are reserved and must be zero.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct FrameFlags: u16 {
        /// Pixel section is zlib-deflated
        const COMPRESSED = 1 << 0;
    }
}

impl FrameFlags {
    /// Decode from the wire, rejecting reserved bits.
    pub fn decode(raw: u16) -> Result<Self, WireError> {
        Self::from_bits(raw).ok_or(WireError::Reserved)
    }
}

/// A category definition as transmitted in a rendering frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireCategory {
    /// Category ID (1..65535)
    pub id: u16,
    /// Category name (≤255 bytes on the wire)
    pub name: String,
    /// Behavior discriminant
    pub behavior_id: u8,
    /// Resolution priority
    pub priority: u8,
    /// Opaque behavior payload
    pub data: Bytes,
}

/// A decoded rendering frame. Pixel data is held decompressed.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    /// Frame type
    pub frame_type: FrameType,
    /// Server→client sequence number
    pub sequence: u32,
    /// Server timestamp in microseconds (informational)
    pub timestamp_us: u64,
    /// Frame flags as received / to be sent
    pub flags: FrameFlags,
    /// Page width in pixels
    pub width: u16,
    /// Page height in pixels
    pub height: u16,
    /// Pixel storage format
    pub format: PixelFormat,
    /// Decompressed pixel buffer, exactly `width·height·bpp` bytes
    pub pixels: Bytes,
    /// Category map, `width·height` big-endian u16 IDs
    pub category_map: Bytes,
    /// Category definitions
    pub categories: Vec<WireCategory>,
}

impl RenderFrame {
    fn expected_pixel_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    fn expected_map_len(&self) -> usize {
        self.width as usize * self.height as usize * 2
    }

    fn check_buffers(&self) -> Result<(), WireError> {
        if self.width == 0 || self.height == 0 {
            return Err(WireError::Dimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.pixels.len() != self.expected_pixel_len() {
            return Err(WireError::SizeMismatch {
                section: "pixel buffer",
                declared: self.expected_pixel_len(),
                actual: self.pixels.len(),
            });
        }
        if self.category_map.len() != self.expected_map_len() {
            return Err(WireError::SizeMismatch {
                section: "category map",
                declared: self.expected_map_len(),
                actual: self.category_map.len(),
            });
        }
        Ok(())
    }

    /// Encode to wire bytes.
    ///
    /// When `flags.COMPRESSED` is set the pixel section is deflated; if the
    /// deflated section would not be smaller than the raw buffer the flag is
    /// cleared in the emitted header and the raw buffer is sent instead.
    pub fn encode_raw(&self) -> Result<Bytes, WireError> {
        self.check_buffers()?;

        let mut flags = self.flags;
        let mut payload = BytesMut::with_capacity(self.pixels.len() + self.category_map.len() + 64);

        if flags.contains(FrameFlags::COMPRESSED) {
            let compressed = zlib_compress(&self.pixels)?;
            if compressed.len() + 4 < self.pixels.len() {
                payload.put_u32(compressed.len() as u32);
                payload.put_slice(&compressed);
            } else {
                flags.remove(FrameFlags::COMPRESSED);
                payload.put_slice(&self.pixels);
            }
        } else {
            payload.put_slice(&self.pixels);
        }

        payload.put_slice(&self.category_map);

        payload.put_u16(self.categories.len() as u16);
        for category in &self.categories {
            if category.name.len() > u8::MAX as usize {
                return Err(WireError::Size(category.name.len()));
            }
            if category.data.len() > u16::MAX as usize {
                return Err(WireError::Size(category.data.len()));
            }
            payload.put_u16(category.id);
            payload.put_u8(category.name.len() as u8);
            payload.put_slice(category.name.as_bytes());
            payload.put_u8(category.behavior_id);
            payload.put_u8(category.priority);
            payload.put_u16(category.data.len() as u16);
            payload.put_slice(&category.data);
        }

        let checksum = crc32(&payload);

        let mut buf = BytesMut::with_capacity(RENDER_HEADER_SIZE + payload.len());
        buf.put_slice(MAGIC_FRAME);
        buf.put_u8(self.frame_type as u8);
        buf.put_u32(self.sequence);
        buf.put_u64(self.timestamp_us);
        buf.put_u16(flags.bits());
        buf.put_u8(WIRE_VERSION);
        buf.put_u16(self.width);
        buf.put_u16(self.height);
        buf.put_u8(self.format as u8);
        buf.put_u32(checksum);
        buf.put_slice(&payload);

        Ok(buf.freeze())
    }

    /// Decode a frame from the start of `snapshot`.
    ///
    /// Returns the frame and the number of bytes consumed. The CRC is
    /// verified over the payload bytes as received, before decompression.
    pub fn decode(snapshot: Bytes, ceiling: usize) -> Result<(Self, usize), WireError> {
        let total = snapshot.len();
        let mut r = BoundedReader::new(snapshot.clone());

        r.take(6, "magic")?;
        let frame_type = FrameType::try_from(r.u8("frame type")?)?;
        let sequence = r.u32_be("sequence")?;
        let timestamp_us = r.u64_be("timestamp")?;
        let flags = FrameFlags::decode(r.u16_be("flags")?)?;
        let version = r.u8("version")?;
        if version != WIRE_VERSION {
            return Err(WireError::Version(version));
        }
        let width = r.u16_be("width")?;
        let height = r.u16_be("height")?;
        if width == 0 || height == 0 {
            return Err(WireError::Dimensions { width, height });
        }
        let format = PixelFormat::try_from(r.u8("format")?)?;
        let checksum = r.u32_be("checksum")?;

        let payload_start = total - r.remaining();
        let pixel_len = width as usize * height as usize * format.bytes_per_pixel();

        let raw_pixels = if flags.contains(FrameFlags::COMPRESSED) {
            let compressed_len = r.u32_be("compressed length")? as usize;
            r.take(compressed_len, "pixel data")?
        } else {
            r.take(pixel_len, "pixel data")?
        };

        let map_len = width as usize * height as usize * 2;
        let category_map = r.take(map_len, "category map")?;

        let count = r.u16_be("category count")?;
        let mut categories = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let id = r.u16_be("category id")?;
            let name = r.string_u8("category name")?;
            let behavior_id = r.u8("behavior id")?;
            let priority = r.u8("priority")?;
            let data_len = r.u16_be("behavior data length")? as usize;
            let data = r.take(data_len, "behavior data")?;
            categories.push(WireCategory {
                id,
                name,
                behavior_id,
                priority,
                data,
            });
        }

        let consumed = total - r.remaining();
        let actual = crc32(&snapshot[payload_start..consumed]);
        if actual != checksum {
            return Err(WireError::Checksum {
                expected: checksum,
                actual,
            });
        }

        let pixels = if flags.contains(FrameFlags::COMPRESSED) {
            Bytes::from(zlib_decompress(&raw_pixels, pixel_len, ceiling)?)
        } else {
            raw_pixels
        };

        let frame = RenderFrame {
            frame_type,
            sequence,
            timestamp_us,
            flags,
            width,
            height,
            format,
            pixels,
            category_map,
            categories,
        };
        Ok((frame, consumed))
    }
}

/// Capability-gated frame encoder.
///
/// Constructed from the negotiated capability set; whether a frame goes out
/// compressed is decided here and nowhere else, so sending a compressed
/// frame on a session without the capability is impossible by construction.
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    negotiated: Capabilities,
}

impl FrameEncoder {
    /// Build an encoder for a session's negotiated capability set.
    pub fn new(negotiated: Capabilities) -> Self {
        Self { negotiated }
    }

    /// Encode a full-page frame, compressing when the session allows it.
    pub fn encode(
        &self,
        frame_type: FrameType,
        sequence: u32,
        timestamp_us: u64,
        width: u16,
        height: u16,
        format: PixelFormat,
        pixels: Bytes,
        category_map: Bytes,
        categories: Vec<WireCategory>,
    ) -> Result<Bytes, WireError> {
        let flags = if self.negotiated.contains(Capabilities::COMPRESSION) {
            FrameFlags::COMPRESSED
        } else {
            FrameFlags::empty()
        };

        let frame = RenderFrame {
            frame_type,
            sequence,
            timestamp_us,
            flags,
            width,
            height,
            format,
            pixels,
            category_map,
            categories,
        };
        frame.encode_raw()
    }
}
