//! Container writer.
//!
//! Assembles the data region in one pass while feeding the data CRC, then
//! back-patches the header's placeholder CRC and size fields and emits the
//! footer. Compression that fails to shrink the raster sections is refused:
//! the sections go out raw and the `COMPRESSED` flag is cleared.

use crate::error::PxntError;
use crate::header::{
    Compression, Footer, Header, PxntFlags, FOOTER_SIZE, HEADER_SIZE, PXNT_VERSION,
};
use crate::section::{
    compress_blob, encode_animation, encode_audio, encode_categories, encode_compressed_blob,
    encode_extended_meta, encode_metadata,
};
use bytes::{BufMut, BytesMut};
use pixnet_page::{Page, PageMetadata};
use pixnet_wire::crc32;
use tracing::debug;

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Compression applied to the pixel and category-map sections.
    pub compression: Compression,
    /// Creation time, Unix seconds.
    pub created: u32,
    /// Last modification time, Unix seconds.
    pub modified: u32,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compression: Compression::None,
            created: 0,
            modified: 0,
        }
    }
}

/// Write a page with default options (no compression).
pub fn write_page(page: &Page) -> Result<Vec<u8>, PxntError> {
    write_page_with(page, &WriteOptions::default())
}

/// Write a page to an in-memory PXNT container.
pub fn write_page_with(page: &Page, options: &WriteOptions) -> Result<Vec<u8>, PxntError> {
    page.validate()?;

    // Raster sections in their little-endian raw form.
    let raw_pixels = page.pixels.clone();
    let mut raw_map = BytesMut::with_capacity(page.category_map.len() * 2);
    for &cid in &page.category_map {
        raw_map.put_u16_le(cid);
    }

    // Decide compression up front: the flag covers both raster sections,
    // so the refusal compares their combined encoded size.
    let mut flags = PxntFlags::empty();
    let mut compression = options.compression;
    let mut packed: Option<(Vec<u8>, Vec<u8>)> = None;

    if compression != Compression::None {
        let packed_pixels = compress_blob(&raw_pixels, compression)?;
        let packed_map = compress_blob(&raw_map, compression)?;
        let framed = packed_pixels.len() + packed_map.len() + 16; // two size prefixes
        if framed < raw_pixels.len() + raw_map.len() {
            flags |= PxntFlags::COMPRESSED;
            packed = Some((packed_pixels, packed_map));
        } else {
            debug!(
                "compression refused: {} packed vs {} raw",
                framed,
                raw_pixels.len() + raw_map.len()
            );
            compression = Compression::None;
        }
    }

    if page.animation.is_some() {
        flags |= PxntFlags::HAS_ANIMATION;
    }
    if page.audio.is_some() {
        flags |= PxntFlags::HAS_AUDIO;
    }
    if !page.extended.is_empty() {
        flags |= PxntFlags::HAS_EXTENDED_META;
    }

    // Data region.
    let mut data = BytesMut::new();
    let default_meta = PageMetadata::default();
    encode_metadata(page.metadata.as_ref().unwrap_or(&default_meta), &mut data);

    match &packed {
        Some((packed_pixels, packed_map)) => {
            encode_compressed_blob(raw_pixels.len(), packed_pixels, &mut data);
            encode_compressed_blob(raw_map.len(), packed_map, &mut data);
        }
        None => {
            data.put_slice(&raw_pixels);
            data.put_slice(&raw_map);
        }
    }

    encode_categories(&page.categories, &mut data);

    if let Some(animation) = &page.animation {
        encode_animation(animation, &mut data);
    }
    if let Some(audio) = &page.audio {
        encode_audio(audio, &mut data);
    }
    if !page.extended.is_empty() {
        encode_extended_meta(&page.extended, &mut data);
    }

    let file_size = (HEADER_SIZE + data.len() + FOOTER_SIZE) as u32;
    let data_crc = crc32(&data);

    // Header was conceptually emitted first with placeholders; the CRC and
    // size land here, before any byte touches the output.
    let header = Header {
        version: PXNT_VERSION,
        flags,
        file_size,
        created: options.created,
        modified: options.modified,
        data_crc,
        width: page.width,
        height: page.height,
        format: page.format,
        compression,
    };
    let header_raw = header.encode();

    let footer = Footer {
        data_crc,
        header_crc: crc32(&header_raw),
        file_size,
    };

    let mut out = Vec::with_capacity(file_size as usize);
    out.extend_from_slice(&header_raw);
    out.extend_from_slice(&data);
    out.extend_from_slice(&footer.encode());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{read_page, read_page_with, ReadOptions, Section, SectionReader};
    use bytes::Bytes;
    use pixnet_page::{
        AnimationBlock, AnimationFrame, AudioBlock, CategoryDef, ExtendedSection, PageMetadata,
    };
    use pixnet_wire::PixelFormat;
    use std::collections::BTreeMap;
    use std::io::Write;

    fn white_pixel_page() -> Page {
        Page::new(
            1,
            1,
            PixelFormat::Rgba8,
            Bytes::from_static(&[0xFF, 0xFF, 0xFF, 0xFF]),
            vec![0],
            BTreeMap::new(),
        )
        .unwrap()
    }

    fn rich_page() -> Page {
        let width = 8u16;
        let height = 8u16;
        let pixel_count = width as usize * height as usize;
        let pixels: Vec<u8> = (0..pixel_count * 4).map(|i| (i % 17) as u8).collect();
        let mut map = vec![0u16; pixel_count];
        for cell in map.iter_mut().take(16) {
            *cell = 1;
        }

        let mut categories = BTreeMap::new();
        categories.insert(
            1,
            CategoryDef {
                id: 1,
                name: "nav_about".to_string(),
                behavior_id: 1,
                priority: 200,
                behavior_data: Bytes::from_static(b"\x06/about\x00"),
                extended: Vec::new(),
            },
        );

        let mut page = Page::new(
            width,
            height,
            PixelFormat::Rgba8,
            Bytes::from(pixels),
            map,
            categories,
        )
        .unwrap();
        page.metadata = Some(PageMetadata {
            title: "About".to_string(),
            author: "ada".to_string(),
            description: "demo page".to_string(),
            url: String::new(),
            keywords: vec!["about".to_string()],
            custom: BTreeMap::new(),
        });
        page.animation = Some(AnimationBlock {
            base_delay_ms: 40,
            frames: vec![AnimationFrame {
                delay_ms: 0,
                data: Bytes::from_static(b"f0"),
            }],
        });
        page.audio = Some(AudioBlock {
            format: 1,
            sample_rate: 22_050,
            channels: 1,
            data: Bytes::from_static(b"pcm"),
        });
        page.extended = vec![ExtendedSection {
            type_id: 0x7F,
            data: Bytes::from_static(b"unknown-section"),
        }];
        page
    }

    #[test]
    fn test_minimal_roundtrip_is_byte_identical() {
        let page = white_pixel_page();
        let first = write_page(&page).unwrap();
        let decoded = read_page(&first).unwrap();
        assert_eq!(decoded, page);
        let second = write_page(&decoded).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_roundtrip_all_compressions() {
        for compression in [Compression::None, Compression::Zlib, Compression::Lz4] {
            let page = rich_page();
            let options = WriteOptions {
                compression,
                ..WriteOptions::default()
            };
            let raw = write_page_with(&page, &options).unwrap();
            let decoded = read_page(&raw).unwrap();
            assert_eq!(decoded, page, "compression {compression:?}");
        }
    }

    #[test]
    fn test_single_byte_corruption_always_detected() {
        let page = rich_page();
        let raw = write_page_with(
            &page,
            &WriteOptions {
                compression: Compression::Zlib,
                ..WriteOptions::default()
            },
        )
        .unwrap();

        // Flip one byte at a spread of positions across the whole file; the
        // reader must reject every variant, never silently corrupt.
        for pos in (0..raw.len()).step_by(7) {
            let mut bad = raw.clone();
            bad[pos] ^= 0x01;
            assert!(
                read_page(&bad).is_err(),
                "corruption at byte {pos} went undetected"
            );
        }
    }

    #[test]
    fn test_compression_refusal_on_incompressible_data() {
        // A pseudo-random 4 KiB raster defeats both codecs.
        let mut state = 0xACE1u32;
        let pixels: Vec<u8> = (0..4096)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                (state >> 16) as u8
            })
            .collect();
        let page = Page::new(
            32,
            32,
            PixelFormat::Rgba8,
            Bytes::from(pixels),
            vec![0u16; 1024],
            BTreeMap::new(),
        )
        .unwrap();

        let raw = write_page_with(
            &page,
            &WriteOptions {
                compression: Compression::Zlib,
                ..WriteOptions::default()
            },
        )
        .unwrap();

        let header = Header::decode(&raw[..HEADER_SIZE]).unwrap();
        assert!(!header.flags.contains(PxntFlags::COMPRESSED));
        assert_eq!(header.compression, Compression::None);
        assert_eq!(read_page(&raw).unwrap(), page);
    }

    #[test]
    fn test_streaming_reader_yields_sections_in_order() {
        let page = rich_page();
        let raw = write_page(&page).unwrap();

        let mut reader =
            SectionReader::new(std::io::Cursor::new(&raw[..]), ReadOptions::default()).unwrap();
        let mut kinds = Vec::new();
        while let Some(section) = reader.next_section().unwrap() {
            kinds.push(match section {
                Section::Metadata(_) => "metadata",
                Section::Pixels(_) => "pixels",
                Section::CategoryMap(_) => "map",
                Section::Categories(_) => "categories",
                Section::Animation(_) => "animation",
                Section::Audio(_) => "audio",
                Section::ExtendedMetadata(_) => "extended",
                Section::Footer(_) => "footer",
            });
        }
        assert_eq!(
            kinds,
            vec![
                "metadata",
                "pixels",
                "map",
                "categories",
                "animation",
                "audio",
                "extended",
                "footer"
            ]
        );
    }

    #[test]
    fn test_roundtrip_through_real_file() {
        let page = rich_page();
        let raw = write_page_with(
            &page,
            &WriteOptions {
                compression: Compression::Lz4,
                created: 1_700_000_000,
                modified: 1_700_000_000,
            },
        )
        .unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&raw).unwrap();
        file.flush().unwrap();

        let from_disk = std::fs::read(file.path()).unwrap();
        assert_eq!(read_page(&from_disk).unwrap(), page);
    }

    #[test]
    fn test_bomb_ceiling_is_configurable() {
        let page = rich_page();
        let raw = write_page_with(
            &page,
            &WriteOptions {
                compression: Compression::Zlib,
                ..WriteOptions::default()
            },
        )
        .unwrap();

        let tight = ReadOptions {
            max_decompressed: 8,
        };
        assert!(matches!(
            read_page_with(&raw, &tight),
            Err(PxntError::SectionOverflow { .. })
        ));
    }

    #[test]
    fn test_truncated_file_rejected() {
        let raw = write_page(&white_pixel_page()).unwrap();
        let cut = &raw[..raw.len() - 3];
        assert!(read_page(cut).is_err());
    }
}
