//! Section-level encode/decode for the PXNT container.
//!
//! Decoding is generic over any byte source through [`CountingReader`],
//! which tracks the CRC and the data-region budget, so the same code path
//! serves both the one-shot and the streaming reader.

use crate::error::PxntError;
use crate::header::Compression;
use bytes::{BufMut, Bytes, BytesMut};
use pixnet_page::{
    AnimationBlock, AnimationFrame, AudioBlock, CategoryDef, ExtendedProperty, ExtendedSection,
    PageMetadata, PropertyValue,
};
use pixnet_wire::{lz4_compress, lz4_decompress, zlib_compress, zlib_decompress};
use std::collections::BTreeMap;
use std::io::Read;

/// A byte source bounded to the container's data region.
///
/// Every byte read is folded into the running data CRC; reads past the
/// declared region fail closed rather than touching the footer.
pub struct CountingReader<R> {
    inner: R,
    hasher: crc32fast::Hasher,
    remaining: u64,
}

impl<R: Read> CountingReader<R> {
    /// Wrap a source with `data_len` bytes of budget.
    pub fn new(inner: R, data_len: u64) -> Self {
        Self {
            inner,
            hasher: crc32fast::Hasher::new(),
            remaining: data_len,
        }
    }

    /// Bytes left in the data region.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// The data CRC over everything read so far.
    pub fn crc(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Direct access to the source, for reading past the data region.
    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    fn read_exact(&mut self, buf: &mut [u8], what: &'static str) -> Result<(), PxntError> {
        if (buf.len() as u64) > self.remaining {
            return Err(PxntError::TruncatedFile(what));
        }
        self.inner
            .read_exact(buf)
            .map_err(|_| PxntError::TruncatedFile(what))?;
        self.hasher.update(buf);
        self.remaining -= buf.len() as u64;
        Ok(())
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, PxntError> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b, what)?;
        Ok(b[0])
    }

    fn u16_le(&mut self, what: &'static str) -> Result<u16, PxntError> {
        let mut b = [0u8; 2];
        self.read_exact(&mut b, what)?;
        Ok(u16::from_le_bytes(b))
    }

    fn u32_le(&mut self, what: &'static str) -> Result<u32, PxntError> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b, what)?;
        Ok(u32::from_le_bytes(b))
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<Bytes, PxntError> {
        let mut buf = vec![0u8; n];
        self.read_exact(&mut buf, what)?;
        Ok(Bytes::from(buf))
    }

    fn string_u8(&mut self, what: &'static str) -> Result<String, PxntError> {
        let len = self.u8(what)? as usize;
        let raw = self.take(len, what)?;
        String::from_utf8(raw.to_vec()).map_err(|_| PxntError::Utf8(what))
    }

    fn string_u16(&mut self, what: &'static str) -> Result<String, PxntError> {
        let len = self.u16_le(what)? as usize;
        let raw = self.take(len, what)?;
        String::from_utf8(raw.to_vec()).map_err(|_| PxntError::Utf8(what))
    }
}

// ---- metadata ----

/// Decode the metadata section.
pub fn decode_metadata<R: Read>(r: &mut CountingReader<R>) -> Result<PageMetadata, PxntError> {
    let title = r.string_u16("title")?;
    let author = r.string_u8("author")?;
    let description = r.string_u16("description")?;
    let url = r.string_u16("url")?;

    let keyword_count = r.u8("keyword count")?;
    let mut keywords = Vec::with_capacity(keyword_count as usize);
    for _ in 0..keyword_count {
        keywords.push(r.string_u8("keyword")?);
    }

    let custom_count = r.u8("custom field count")?;
    let mut custom = BTreeMap::new();
    for _ in 0..custom_count {
        let key = r.string_u8("custom key")?;
        let value = r.string_u16("custom value")?;
        custom.insert(key, value);
    }

    Ok(PageMetadata {
        title,
        author,
        description,
        url,
        keywords,
        custom,
    })
}

/// Encode the metadata section.
pub fn encode_metadata(meta: &PageMetadata, buf: &mut BytesMut) {
    buf.put_u16_le(meta.title.len() as u16);
    buf.put_slice(meta.title.as_bytes());
    buf.put_u8(meta.author.len() as u8);
    buf.put_slice(meta.author.as_bytes());
    buf.put_u16_le(meta.description.len() as u16);
    buf.put_slice(meta.description.as_bytes());
    buf.put_u16_le(meta.url.len() as u16);
    buf.put_slice(meta.url.as_bytes());

    buf.put_u8(meta.keywords.len() as u8);
    for kw in &meta.keywords {
        buf.put_u8(kw.len() as u8);
        buf.put_slice(kw.as_bytes());
    }

    buf.put_u8(meta.custom.len() as u8);
    for (key, value) in &meta.custom {
        buf.put_u8(key.len() as u8);
        buf.put_slice(key.as_bytes());
        buf.put_u16_le(value.len() as u16);
        buf.put_slice(value.as_bytes());
    }
}

// ---- compressed blobs (pixel data, category map) ----

/// Decode a pixel or category-map section.
///
/// Compressed framing is `uncompressed_size(u32) · compressed_size(u32) ·
/// bytes`; the decompressed length must equal `expected_len` exactly.
pub fn decode_blob<R: Read>(
    r: &mut CountingReader<R>,
    compressed: bool,
    compression: Compression,
    expected_len: usize,
    ceiling: usize,
    what: &'static str,
) -> Result<Bytes, PxntError> {
    if !compressed {
        return r.take(expected_len, what);
    }

    let uncompressed_size = r.u32_le("uncompressed size")? as usize;
    if uncompressed_size > ceiling {
        return Err(PxntError::SectionOverflow {
            declared: uncompressed_size,
            limit: ceiling,
        });
    }
    if uncompressed_size != expected_len {
        return Err(PxntError::SectionOverflow {
            declared: uncompressed_size,
            limit: expected_len,
        });
    }

    let compressed_size = r.u32_le("compressed size")? as usize;
    let packed = r.take(compressed_size, what)?;

    let out = match compression {
        Compression::None => return Err(PxntError::InvalidCompression(0)),
        Compression::Zlib => zlib_decompress(&packed, expected_len, ceiling)?,
        Compression::Lz4 => lz4_decompress(&packed, expected_len, ceiling)?,
    };
    Ok(Bytes::from(out))
}

/// Compress a blob with the given algorithm.
pub fn compress_blob(data: &[u8], compression: Compression) -> Result<Vec<u8>, PxntError> {
    match compression {
        Compression::None => Ok(data.to_vec()),
        Compression::Zlib => Ok(zlib_compress(data)?),
        Compression::Lz4 => Ok(lz4_compress(data)),
    }
}

/// Encode a blob with compressed framing.
pub fn encode_compressed_blob(raw_len: usize, packed: &[u8], buf: &mut BytesMut) {
    buf.put_u32_le(raw_len as u32);
    buf.put_u32_le(packed.len() as u32);
    buf.put_slice(packed);
}

// ---- category definitions ----

/// Decode the category-definitions section, including the trailing
/// extended-properties block when one is present. A data region that ends
/// right after the records reads as "no extended properties".
pub fn decode_categories<R: Read>(
    r: &mut CountingReader<R>,
) -> Result<BTreeMap<u16, CategoryDef>, PxntError> {
    let count = r.u16_le("category count")?;
    let mut categories = BTreeMap::new();

    for _ in 0..count {
        let id = r.u16_le("category id")?;
        let behavior_id = r.u8("behavior id")?;
        let priority = r.u8("priority")?;
        let name_len = r.u16_le("name length")? as usize;
        let data_len = r.u16_le("data length")? as usize;
        let name_raw = r.take(name_len, "category name")?;
        let name =
            String::from_utf8(name_raw.to_vec()).map_err(|_| PxntError::Utf8("category name"))?;
        let behavior_data = r.take(data_len, "behavior data")?;

        categories.insert(
            id,
            CategoryDef {
                id,
                name,
                behavior_id,
                priority,
                behavior_data,
                extended: Vec::new(),
            },
        );
    }

    // Extended-properties block: count-prefixed, zero meaning absent. A
    // region that ends right here (legacy files) also reads as absent.
    if r.remaining() >= 2 {
        let record_count = r.u16_le("extended property count")?;
        for _ in 0..record_count {
            let cat_id = r.u16_le("property category")?;
            let prop_count = r.u8("property count")?;
            let mut props = Vec::with_capacity(prop_count as usize);
            for _ in 0..prop_count {
                let key = r.string_u8("property key")?;
                let value_type = r.u8("property type")?;
                let value_len = r.u16_le("property length")? as usize;
                let raw = r.take(value_len, "property value")?;
                let value = match value_type {
                    0 => PropertyValue::Str(
                        String::from_utf8(raw.to_vec())
                            .map_err(|_| PxntError::Utf8("property value"))?,
                    ),
                    1 => {
                        if raw.len() != 4 {
                            return Err(PxntError::TruncatedFile("property value"));
                        }
                        PropertyValue::U32(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
                    }
                    2 => PropertyValue::Bytes(raw),
                    other => return Err(PxntError::UnknownPropertyType(other)),
                };
                props.push(ExtendedProperty {
                    key,
                    value,
                });
            }
            if let Some(def) = categories.get_mut(&cat_id) {
                def.extended = props;
            }
        }
    }

    Ok(categories)
}

/// Encode the category-definitions section.
pub fn encode_categories(categories: &BTreeMap<u16, CategoryDef>, buf: &mut BytesMut) {
    buf.put_u16_le(categories.len() as u16);
    for def in categories.values() {
        buf.put_u16_le(def.id);
        buf.put_u8(def.behavior_id);
        buf.put_u8(def.priority);
        buf.put_u16_le(def.name.len() as u16);
        buf.put_u16_le(def.behavior_data.len() as u16);
        buf.put_slice(def.name.as_bytes());
        buf.put_slice(&def.behavior_data);
    }

    let with_props: Vec<&CategoryDef> = categories
        .values()
        .filter(|d| !d.extended.is_empty())
        .collect();
    buf.put_u16_le(with_props.len() as u16);
    for def in with_props {
        buf.put_u16_le(def.id);
        buf.put_u8(def.extended.len() as u8);
        for prop in &def.extended {
            buf.put_u8(prop.key.len() as u8);
            buf.put_slice(prop.key.as_bytes());
            match &prop.value {
                PropertyValue::Str(s) => {
                    buf.put_u8(0);
                    buf.put_u16_le(s.len() as u16);
                    buf.put_slice(s.as_bytes());
                }
                PropertyValue::U32(v) => {
                    buf.put_u8(1);
                    buf.put_u16_le(4);
                    buf.put_u32_le(*v);
                }
                PropertyValue::Bytes(b) => {
                    buf.put_u8(2);
                    buf.put_u16_le(b.len() as u16);
                    buf.put_slice(b);
                }
            }
        }
    }
}

// ---- optional sections ----

/// Decode the animation section. Frame payloads are preserved verbatim.
pub fn decode_animation<R: Read>(
    r: &mut CountingReader<R>,
) -> Result<AnimationBlock, PxntError> {
    let frame_count = r.u32_le("frame count")?;
    let base_delay_ms = r.u32_le("base delay")?;
    let mut frames = Vec::new();
    for _ in 0..frame_count {
        let delay_ms = r.u32_le("frame delay")?;
        let size = r.u32_le("frame size")? as usize;
        let data = r.take(size, "frame data")?;
        frames.push(AnimationFrame { delay_ms, data });
    }
    Ok(AnimationBlock {
        base_delay_ms,
        frames,
    })
}

/// Encode the animation section.
pub fn encode_animation(block: &AnimationBlock, buf: &mut BytesMut) {
    buf.put_u32_le(block.frames.len() as u32);
    buf.put_u32_le(block.base_delay_ms);
    for frame in &block.frames {
        buf.put_u32_le(frame.delay_ms);
        buf.put_u32_le(frame.data.len() as u32);
        buf.put_slice(&frame.data);
    }
}

/// Decode the audio section. The sample payload is preserved verbatim.
pub fn decode_audio<R: Read>(r: &mut CountingReader<R>) -> Result<AudioBlock, PxntError> {
    let format = r.u8("audio format")?;
    let sample_rate = r.u32_le("sample rate")?;
    let channels = r.u8("channels")?;
    let data_size = r.u32_le("audio size")? as usize;
    let data = r.take(data_size, "audio data")?;
    Ok(AudioBlock {
        format,
        sample_rate,
        channels,
        data,
    })
}

/// Encode the audio section.
pub fn encode_audio(block: &AudioBlock, buf: &mut BytesMut) {
    buf.put_u8(block.format);
    buf.put_u32_le(block.sample_rate);
    buf.put_u8(block.channels);
    buf.put_u32_le(block.data.len() as u32);
    buf.put_slice(&block.data);
}

/// Decode the extended-metadata section; unknown type IDs come through
/// verbatim.
pub fn decode_extended_meta<R: Read>(
    r: &mut CountingReader<R>,
) -> Result<Vec<ExtendedSection>, PxntError> {
    let section_count = r.u16_le("extended section count")?;
    let mut sections = Vec::with_capacity(section_count as usize);
    for _ in 0..section_count {
        let type_id = r.u8("section type")?;
        let size = r.u32_le("section size")? as usize;
        let data = r.take(size, "section data")?;
        sections.push(ExtendedSection { type_id, data });
    }
    Ok(sections)
}

/// Encode the extended-metadata section.
pub fn encode_extended_meta(sections: &[ExtendedSection], buf: &mut BytesMut) {
    buf.put_u16_le(sections.len() as u16);
    for section in sections {
        buf.put_u8(section.type_id);
        buf.put_u32_le(section.data.len() as u32);
        buf.put_slice(&section.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader_over(buf: &[u8]) -> CountingReader<Cursor<Vec<u8>>> {
        CountingReader::new(Cursor::new(buf.to_vec()), buf.len() as u64)
    }

    #[test]
    fn test_metadata_roundtrip() {
        let meta = PageMetadata {
            title: "Welcome".to_string(),
            author: "ada".to_string(),
            description: String::new(),
            url: "pixnet://example.org/".to_string(),
            keywords: vec!["demo".to_string(), "pixels".to_string()],
            custom: [("theme".to_string(), "dark".to_string())].into(),
        };
        let mut buf = BytesMut::new();
        encode_metadata(&meta, &mut buf);
        let mut r = reader_over(&buf);
        assert_eq!(decode_metadata(&mut r).unwrap(), meta);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_categories_roundtrip_with_properties() {
        let mut categories = BTreeMap::new();
        categories.insert(
            1,
            CategoryDef {
                id: 1,
                name: "nav_home".to_string(),
                behavior_id: 1,
                priority: 128,
                behavior_data: Bytes::from_static(b"\x05/home\x00"),
                extended: vec![ExtendedProperty {
                    key: "tooltip".to_string(),
                    value: PropertyValue::Str("Go home".to_string()),
                }],
            },
        );
        categories.insert(
            2,
            CategoryDef {
                id: 2,
                name: "field".to_string(),
                behavior_id: 3,
                priority: 10,
                behavior_data: Bytes::from_static(&[0x01, 0x00, 0x01, 0x40, 0x00]),
                extended: vec![ExtendedProperty {
                    key: "tab-order".to_string(),
                    value: PropertyValue::U32(2),
                }],
            },
        );

        let mut buf = BytesMut::new();
        encode_categories(&categories, &mut buf);
        let mut r = reader_over(&buf);
        assert_eq!(decode_categories(&mut r).unwrap(), categories);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_categories_without_property_block() {
        // Legacy shape: records only, region ends immediately.
        let mut buf = BytesMut::new();
        buf.put_u16_le(1);
        buf.put_u16_le(5); // id
        buf.put_u8(0); // behavior
        buf.put_u8(7); // priority
        buf.put_u16_le(4); // name len
        buf.put_u16_le(0); // data len
        buf.put_slice(b"zone");

        let mut r = reader_over(&buf);
        let categories = decode_categories(&mut r).unwrap();
        assert_eq!(categories[&5].priority, 7);
        assert!(categories[&5].extended.is_empty());
    }

    #[test]
    fn test_blob_compressed_roundtrip() {
        let data = vec![7u8; 1024];
        let packed = compress_blob(&data, Compression::Zlib).unwrap();
        let mut buf = BytesMut::new();
        encode_compressed_blob(data.len(), &packed, &mut buf);

        let mut r = reader_over(&buf);
        let out = decode_blob(
            &mut r,
            true,
            Compression::Zlib,
            data.len(),
            1 << 20,
            "pixels",
        )
        .unwrap();
        assert_eq!(out.as_ref(), &data[..]);
    }

    #[test]
    fn test_blob_bomb_guard() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(1 << 30);
        buf.put_u32_le(4);
        buf.put_slice(&[0u8; 4]);
        let mut r = reader_over(&buf);
        assert!(matches!(
            decode_blob(&mut r, true, Compression::Zlib, 1 << 30, 1 << 20, "pixels"),
            Err(PxntError::SectionOverflow { .. })
        ));
    }

    #[test]
    fn test_animation_audio_extended_roundtrip() {
        let animation = AnimationBlock {
            base_delay_ms: 40,
            frames: vec![
                AnimationFrame {
                    delay_ms: 0,
                    data: Bytes::from_static(b"frame0"),
                },
                AnimationFrame {
                    delay_ms: 80,
                    data: Bytes::from_static(b"frame1"),
                },
            ],
        };
        let audio = AudioBlock {
            format: 1,
            sample_rate: 44_100,
            channels: 2,
            data: Bytes::from_static(b"samples"),
        };
        let extended = vec![ExtendedSection {
            type_id: 0xEE, // unknown type, preserved verbatim
            data: Bytes::from_static(b"opaque"),
        }];

        let mut buf = BytesMut::new();
        encode_animation(&animation, &mut buf);
        encode_audio(&audio, &mut buf);
        encode_extended_meta(&extended, &mut buf);

        let mut r = reader_over(&buf);
        assert_eq!(decode_animation(&mut r).unwrap(), animation);
        assert_eq!(decode_audio(&mut r).unwrap(), audio);
        assert_eq!(decode_extended_meta(&mut r).unwrap(), extended);
        assert_eq!(r.remaining(), 0);
    }
}
