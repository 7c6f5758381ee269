//! Container readers.
//!
//! [`SectionReader`] walks a seekable source section by section, so callers
//! can stop after the parts they need; [`read_page`] drives it to the end
//! and assembles the full [`Page`]. Both verify the header CRC, the data
//! CRC and the echoed file size against the footer.

use crate::error::PxntError;
use crate::header::{Footer, Header, PxntFlags, FOOTER_SIZE, HEADER_SIZE};
use crate::section::{
    decode_animation, decode_audio, decode_blob, decode_categories, decode_extended_meta,
    decode_metadata, CountingReader,
};
use bytes::Bytes;
use pixnet_page::{
    AnimationBlock, AudioBlock, CategoryDef, ExtendedSection, Page, PageMetadata,
};
use pixnet_wire::crc32;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek, SeekFrom};
use tracing::debug;

/// Reader configuration.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Decompression-bomb ceiling for any single section.
    pub max_decompressed: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_decompressed: pixnet_wire::DEFAULT_DECOMPRESS_CEILING,
        }
    }
}

/// A section yielded by the streaming reader, in container order.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    /// Document metadata
    Metadata(PageMetadata),
    /// Decompressed pixel buffer
    Pixels(Bytes),
    /// Category map as native u16 IDs
    CategoryMap(Vec<u16>),
    /// Category definitions
    Categories(BTreeMap<u16, CategoryDef>),
    /// Animation section
    Animation(AnimationBlock),
    /// Audio section
    Audio(AudioBlock),
    /// Extended metadata sections, unknown types preserved verbatim
    ExtendedMetadata(Vec<ExtendedSection>),
    /// The verified footer; always the last yield
    Footer(Footer),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Metadata,
    Pixels,
    CategoryMap,
    Categories,
    Animation,
    Audio,
    ExtendedMetadata,
    Footer,
    Done,
}

/// Streaming section reader over any seekable byte source.
pub struct SectionReader<R: Read + Seek> {
    reader: CountingReader<R>,
    header: Header,
    header_raw: [u8; HEADER_SIZE],
    options: ReadOptions,
    state: Stage,
}

impl<R: Read + Seek> SectionReader<R> {
    /// Open a container: reads the header, validates it, and checks the
    /// source length against the declared file size.
    pub fn new(mut source: R, options: ReadOptions) -> Result<Self, PxntError> {
        let actual_len = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;

        let mut header_raw = [0u8; HEADER_SIZE];
        source
            .read_exact(&mut header_raw)
            .map_err(|_| PxntError::TruncatedFile("header"))?;
        let header = Header::decode(&header_raw)?;

        if actual_len != header.file_size as u64 {
            return Err(PxntError::TruncatedFile("file size"));
        }
        if (header.file_size as usize) < HEADER_SIZE + FOOTER_SIZE {
            return Err(PxntError::TruncatedFile("file size"));
        }

        let data_len = header.file_size as u64 - (HEADER_SIZE + FOOTER_SIZE) as u64;
        debug!(
            "opened pxnt container: {}x{} {:?}, {} data bytes",
            header.width, header.height, header.compression, data_len
        );

        Ok(Self {
            reader: CountingReader::new(source, data_len),
            header,
            header_raw,
            options,
            state: Stage::Metadata,
        })
    }

    /// The validated container header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Yield the next section, or `None` after the footer.
    pub fn next_section(&mut self) -> Result<Option<Section>, PxntError> {
        let compressed = self.header.flags.contains(PxntFlags::COMPRESSED);
        let pixel_count = self.header.width as usize * self.header.height as usize;

        loop {
            match self.state {
                Stage::Metadata => {
                    self.state = Stage::Pixels;
                    let meta = decode_metadata(&mut self.reader)?;
                    return Ok(Some(Section::Metadata(meta)));
                }
                Stage::Pixels => {
                    self.state = Stage::CategoryMap;
                    let expected = pixel_count * self.header.format.bytes_per_pixel();
                    let pixels = decode_blob(
                        &mut self.reader,
                        compressed,
                        self.header.compression,
                        expected,
                        self.options.max_decompressed,
                        "pixel data",
                    )?;
                    return Ok(Some(Section::Pixels(pixels)));
                }
                Stage::CategoryMap => {
                    self.state = Stage::Categories;
                    let raw = decode_blob(
                        &mut self.reader,
                        compressed,
                        self.header.compression,
                        pixel_count * 2,
                        self.options.max_decompressed,
                        "category map",
                    )?;
                    let map = raw
                        .chunks_exact(2)
                        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                        .collect();
                    return Ok(Some(Section::CategoryMap(map)));
                }
                Stage::Categories => {
                    self.state = Stage::Animation;
                    let categories = decode_categories(&mut self.reader)?;
                    return Ok(Some(Section::Categories(categories)));
                }
                Stage::Animation => {
                    self.state = Stage::Audio;
                    if self.header.flags.contains(PxntFlags::HAS_ANIMATION) {
                        let block = decode_animation(&mut self.reader)?;
                        return Ok(Some(Section::Animation(block)));
                    }
                }
                Stage::Audio => {
                    self.state = Stage::ExtendedMetadata;
                    if self.header.flags.contains(PxntFlags::HAS_AUDIO) {
                        let block = decode_audio(&mut self.reader)?;
                        return Ok(Some(Section::Audio(block)));
                    }
                }
                Stage::ExtendedMetadata => {
                    self.state = Stage::Footer;
                    if self.header.flags.contains(PxntFlags::HAS_EXTENDED_META) {
                        let sections = decode_extended_meta(&mut self.reader)?;
                        return Ok(Some(Section::ExtendedMetadata(sections)));
                    }
                }
                Stage::Footer => {
                    self.state = Stage::Done;
                    return Ok(Some(Section::Footer(self.read_footer()?)));
                }
                Stage::Done => return Ok(None),
            }
        }
    }

    fn read_footer(&mut self) -> Result<Footer, PxntError> {
        if self.reader.remaining() != 0 {
            return Err(PxntError::SectionOverflow {
                declared: self.reader.remaining() as usize,
                limit: 0,
            });
        }

        let data_crc = self.reader.crc();
        let mut footer_raw = [0u8; FOOTER_SIZE];
        self.reader
            .inner_mut()
            .read_exact(&mut footer_raw)
            .map_err(|_| PxntError::TruncatedFile("footer"))?;
        let footer = Footer::decode(&footer_raw)?;

        if footer.data_crc != data_crc || self.header.data_crc != data_crc {
            return Err(PxntError::ChecksumMismatch {
                which: "data",
                expected: footer.data_crc,
                actual: data_crc,
            });
        }

        let header_crc = crc32(&self.header_raw);
        if footer.header_crc != header_crc {
            return Err(PxntError::ChecksumMismatch {
                which: "header",
                expected: footer.header_crc,
                actual: header_crc,
            });
        }

        if footer.file_size != self.header.file_size {
            return Err(PxntError::TruncatedFile("footer file size"));
        }

        Ok(footer)
    }
}

/// Read a complete page with default options.
pub fn read_page(data: &[u8]) -> Result<Page, PxntError> {
    read_page_with(data, &ReadOptions::default())
}

/// Read a complete page from an in-memory container.
pub fn read_page_with(data: &[u8], options: &ReadOptions) -> Result<Page, PxntError> {
    let mut reader = SectionReader::new(Cursor::new(data), options.clone())?;
    let header = *reader.header();

    let mut metadata = None;
    let mut pixels = Bytes::new();
    let mut category_map = Vec::new();
    let mut categories = BTreeMap::new();
    let mut animation = None;
    let mut audio = None;
    let mut extended = Vec::new();

    while let Some(section) = reader.next_section()? {
        match section {
            Section::Metadata(meta) => {
                if meta != PageMetadata::default() {
                    metadata = Some(meta);
                }
            }
            Section::Pixels(p) => pixels = p,
            Section::CategoryMap(m) => category_map = m,
            Section::Categories(c) => categories = c,
            Section::Animation(a) => animation = Some(a),
            Section::Audio(a) => audio = Some(a),
            Section::ExtendedMetadata(e) => extended = e,
            Section::Footer(_) => {}
        }
    }

    let mut page = Page::new(
        header.width,
        header.height,
        header.format,
        pixels,
        category_map,
        categories,
    )?;
    page.metadata = metadata;
    page.animation = animation;
    page.audio = audio;
    page.extended = extended;
    Ok(page)
}
