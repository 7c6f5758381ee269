//! Shared page model and category-map interpreter for PIXNET.
//!
//! Both the PXNT container codec and the wire rendering-frame codec
//! materialize the same [`Page`] model defined here. The interpreter walks
//! the page's category map to turn pointer and keyboard activity into typed
//! outbound messages, local effects, or nothing at all.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod behavior;
pub mod interp;
pub mod model;
pub mod url;

pub use behavior::{Behavior, NavigateKind, ValidationFlags};
pub use interp::{Interpreter, LocalFault, MediaCommand, Modifiers, Outcome, PointerAction};
pub use model::{
    AnimationBlock, AnimationFrame, AudioBlock, CategoryDef, ExtendedProperty, ExtendedSection,
    Page, PageError, PageMetadata, PropertyValue,
};
pub use url::{PixnetUrl, UrlError};
