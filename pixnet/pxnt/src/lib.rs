//! PXNT binary container codec.
//!
//! PXNT persists a PIXNET page: header, metadata, pixel data, category map,
//! category definitions, optional animation / audio / extended-metadata
//! sections and a footer. All multi-byte integers are little-endian; the
//! wire protocol's big-endian convention stops at this boundary.
//!
//! ## Container layout
//!
//! ```text
//! +------------------+------------------------------------------+
//! | header (32B)     | "PXNT"·version·flags·sizes·dims·crc      |
//! +------------------+------------------------------------------+
//! | metadata         | title·author·description·url·keywords·…  |
//! +------------------+------------------------------------------+
//! | pixel data       | raw, or sizes + compressed when flagged  |
//! +------------------+------------------------------------------+
//! | category map     | same framing as pixel data               |
//! +------------------+------------------------------------------+
//! | category defs    | u16 count + records + extended props     |
//! +------------------+------------------------------------------+
//! | animation (opt)  | when HAS_ANIMATION                       |
//! +------------------+------------------------------------------+
//! | audio (opt)      | when HAS_AUDIO                           |
//! +------------------+------------------------------------------+
//! | extended (opt)   | when HAS_EXTENDED_META                   |
//! +------------------+------------------------------------------+
//! | footer (16B)     | "TNXP"·data crc·header crc·file size     |
//! +------------------+------------------------------------------+
//! ```
//!
//! MIME type `application/vnd.pixnet.pxnt`, extension `.pxnt`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod header;
pub mod reader;
pub mod section;
pub mod writer;

pub use error::PxntError;
pub use header::{
    Compression, Footer, Header, PxntFlags, FOOTER_MAGIC, FOOTER_SIZE, HEADER_SIZE, PXNT_MAGIC,
    PXNT_VERSION,
};
pub use reader::{read_page, read_page_with, ReadOptions, Section, SectionReader};
pub use writer::{write_page, write_page_with, WriteOptions};

/// MIME type registered for PXNT files.
pub const MIME_TYPE: &str = "application/vnd.pixnet.pxnt";

/// Conventional file extension.
pub const FILE_EXTENSION: &str = "pxnt";
