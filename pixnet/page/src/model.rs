//! The page model shared by the container codec and the wire codec.

use bytes::{BufMut, Bytes, BytesMut};
use pixnet_wire::{PixelFormat, RenderFrame, WireCategory};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while assembling or validating a page.
#[derive(Error, Debug)]
pub enum PageError {
    /// Width or height outside [1, 65535]
    #[error("invalid dimensions {width}x{height}")]
    Dimensions {
        /// Declared width
        width: u16,
        /// Declared height
        height: u16,
    },

    /// Pixel buffer does not match `width·height·bpp`
    #[error("pixel buffer size {actual}, expected {expected}")]
    PixelSize {
        /// Expected byte count
        expected: usize,
        /// Actual byte count
        actual: usize,
    },

    /// Category map does not match `width·height`
    #[error("category map has {actual} entries, expected {expected}")]
    MapSize {
        /// Expected entry count
        expected: usize,
        /// Actual entry count
        actual: usize,
    },

    /// Category map references an ID missing from the definitions
    #[error("category map references undefined category {0}")]
    UndefinedCategory(u16),

    /// Category ID 0 is reserved for "no behavior"
    #[error("category id 0 is reserved")]
    ReservedId,
}

/// A typed key-value pair attached to a category definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedProperty {
    /// Property key
    pub key: String,
    /// Property value
    pub value: PropertyValue,
}

/// Value types legal in extended properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// UTF-8 string
    Str(String),
    /// Unsigned 32-bit integer
    U32(u32),
    /// Opaque bytes
    Bytes(Bytes),
}

/// A category definition: a behaviorally-typed region of the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDef {
    /// Category ID, 1..65535, unique within the page
    pub id: u16,
    /// Category name
    pub name: String,
    /// Behavior discriminant (see [`crate::behavior::Behavior`])
    pub behavior_id: u8,
    /// Resolution priority; higher wins, ties break to the smaller ID
    pub priority: u8,
    /// Opaque behavior payload, decoded on demand
    pub behavior_data: Bytes,
    /// Optional typed properties
    pub extended: Vec<ExtendedProperty>,
}

impl CategoryDef {
    /// Decode the behavior payload for this category.
    pub fn behavior(&self) -> Result<crate::behavior::Behavior, pixnet_wire::WireError> {
        crate::behavior::Behavior::decode(self.behavior_id, &self.behavior_data)
    }
}

/// Document-level metadata carried by a page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageMetadata {
    /// Page title
    pub title: String,
    /// Author
    pub author: String,
    /// Description
    pub description: String,
    /// Canonical URL
    pub url: String,
    /// Keywords
    pub keywords: Vec<String>,
    /// Custom string-keyed fields
    pub custom: BTreeMap<String, String>,
}

/// One animation frame; the payload is preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationFrame {
    /// Per-frame delay in milliseconds (0 = use the base delay)
    pub delay_ms: u32,
    /// Opaque frame payload
    pub data: Bytes,
}

/// Animation section. Playback timing is a renderer concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationBlock {
    /// Default inter-frame delay in milliseconds
    pub base_delay_ms: u32,
    /// Frames in display order
    pub frames: Vec<AnimationFrame>,
}

/// Audio section; the sample payload is preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBlock {
    /// Sample format discriminant (opaque to the protocol core)
    pub format: u8,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u8,
    /// Opaque sample payload
    pub data: Bytes,
}

/// An extended-metadata section, preserved verbatim for forward
/// compatibility even when the type is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedSection {
    /// Section type discriminant
    pub type_id: u8,
    /// Opaque section payload
    pub data: Bytes,
}

/// The renderable unit: pixel raster, category map, category definitions
/// and optional metadata. Immutable once published to a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Width in pixels, 1..65535
    pub width: u16,
    /// Height in pixels, 1..65535
    pub height: u16,
    /// Pixel storage format
    pub format: PixelFormat,
    /// Pixel buffer, exactly `width·height·bpp` bytes, row-major
    pub pixels: Bytes,
    /// Category IDs per pixel, row-major; 0 = no behavior
    pub category_map: Vec<u16>,
    /// Category definitions keyed by ID
    pub categories: BTreeMap<u16, CategoryDef>,
    /// Optional document metadata
    pub metadata: Option<PageMetadata>,
    /// Optional animation section
    pub animation: Option<AnimationBlock>,
    /// Optional audio section
    pub audio: Option<AudioBlock>,
    /// Extended metadata sections, unknown types included
    pub extended: Vec<ExtendedSection>,
}

impl Page {
    /// Build a minimal page from raster parts, validating the invariants.
    pub fn new(
        width: u16,
        height: u16,
        format: PixelFormat,
        pixels: Bytes,
        category_map: Vec<u16>,
        categories: BTreeMap<u16, CategoryDef>,
    ) -> Result<Self, PageError> {
        let page = Self {
            width,
            height,
            format,
            pixels,
            category_map,
            categories,
            metadata: None,
            animation: None,
            audio: None,
            extended: Vec::new(),
        };
        page.validate()?;
        Ok(page)
    }

    /// Check the global page invariants.
    pub fn validate(&self) -> Result<(), PageError> {
        if self.width == 0 || self.height == 0 {
            return Err(PageError::Dimensions {
                width: self.width,
                height: self.height,
            });
        }

        let pixel_count = self.width as usize * self.height as usize;
        let expected_pixels = pixel_count * self.format.bytes_per_pixel();
        if self.pixels.len() != expected_pixels {
            return Err(PageError::PixelSize {
                expected: expected_pixels,
                actual: self.pixels.len(),
            });
        }
        if self.category_map.len() != pixel_count {
            return Err(PageError::MapSize {
                expected: pixel_count,
                actual: self.category_map.len(),
            });
        }

        if self.categories.contains_key(&0) {
            return Err(PageError::ReservedId);
        }
        for &cid in &self.category_map {
            if cid != 0 && !self.categories.contains_key(&cid) {
                return Err(PageError::UndefinedCategory(cid));
            }
        }
        Ok(())
    }

    /// The category ID at pixel `(x, y)`, or `None` outside the raster.
    pub fn category_id_at(&self, x: u16, y: u16) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.category_map[y as usize * self.width as usize + x as usize])
    }

    /// The category definition at pixel `(x, y)`, if one is mapped there.
    pub fn category_at(&self, x: u16, y: u16) -> Option<&CategoryDef> {
        match self.category_id_at(x, y) {
            Some(0) | None => None,
            Some(cid) => self.categories.get(&cid),
        }
    }

    /// Construct a page from a decoded rendering frame.
    ///
    /// The frame's category map arrives as big-endian u16 pairs; extended
    /// properties do not travel on the wire.
    pub fn from_frame(frame: &RenderFrame) -> Result<Self, PageError> {
        let mut category_map = Vec::with_capacity(frame.category_map.len() / 2);
        for pair in frame.category_map.chunks_exact(2) {
            category_map.push(u16::from_be_bytes([pair[0], pair[1]]));
        }

        let categories = frame
            .categories
            .iter()
            .map(|c| {
                (
                    c.id,
                    CategoryDef {
                        id: c.id,
                        name: c.name.clone(),
                        behavior_id: c.behavior_id,
                        priority: c.priority,
                        behavior_data: c.data.clone(),
                        extended: Vec::new(),
                    },
                )
            })
            .collect();

        Self::new(
            frame.width,
            frame.height,
            frame.format,
            frame.pixels.clone(),
            category_map,
            categories,
        )
    }

    /// The category map as big-endian wire bytes.
    pub fn category_map_wire_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.category_map.len() * 2);
        for &cid in &self.category_map {
            buf.put_u16(cid);
        }
        buf.freeze()
    }

    /// The category definitions as wire records.
    pub fn wire_categories(&self) -> Vec<WireCategory> {
        self.categories
            .values()
            .map(|c| WireCategory {
                id: c.id,
                name: c.name.clone(),
                behavior_id: c.behavior_id,
                priority: c.priority,
                data: c.behavior_data.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn solid_page(width: u16, height: u16, cid: u16) -> Page {
        let pixel_count = width as usize * height as usize;
        let pixels = Bytes::from(vec![0xFFu8; pixel_count * 4]);
        let category_map = vec![cid; pixel_count];
        let mut categories = BTreeMap::new();
        if cid != 0 {
            categories.insert(
                cid,
                CategoryDef {
                    id: cid,
                    name: format!("zone_{cid}"),
                    behavior_id: 0,
                    priority: 128,
                    behavior_data: Bytes::new(),
                    extended: Vec::new(),
                },
            );
        }
        Page::new(width, height, PixelFormat::Rgba8, pixels, category_map, categories).unwrap()
    }

    #[test]
    fn test_validate_catches_size_mismatch() {
        let mut page = solid_page(2, 2, 0);
        page.category_map.pop();
        assert!(matches!(page.validate(), Err(PageError::MapSize { .. })));
    }

    #[test]
    fn test_validate_catches_undefined_category() {
        let mut page = solid_page(2, 2, 0);
        page.category_map[3] = 42;
        assert!(matches!(
            page.validate(),
            Err(PageError::UndefinedCategory(42))
        ));
    }

    #[test]
    fn test_reserved_id_rejected() {
        let mut page = solid_page(2, 2, 1);
        let def = page.categories.get(&1).unwrap().clone();
        page.categories.insert(0, CategoryDef { id: 0, ..def });
        assert!(matches!(page.validate(), Err(PageError::ReservedId)));
    }

    #[test]
    fn test_category_lookup() {
        let page = solid_page(3, 3, 5);
        assert_eq!(page.category_id_at(1, 1), Some(5));
        assert_eq!(page.category_id_at(3, 0), None);
        assert_eq!(page.category_at(0, 0).unwrap().name, "zone_5");
    }

    #[test]
    fn test_wire_map_bytes_are_big_endian() {
        let page = solid_page(1, 1, 0x0102);
        assert_eq!(page.category_map_wire_bytes().as_ref(), &[0x01, 0x02]);
    }
}
