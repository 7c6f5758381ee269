//! Behavior payload decoding.
//!
//! Each category carries an opaque `behavior_data` blob whose layout is
//! keyed by `behavior_id`. Decoding goes through one closed sum type per
//! the container's conventions: integers little-endian, strings u8-length
//! prefixed, unknown discriminants rejected rather than guessed at.

use bitflags::bitflags;
use bytes::{BufMut, Bytes, BytesMut};
use pixnet_wire::{BoundedReader, WireError};

bitflags! {
    /// Input-zone validation rules.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ValidationFlags: u8 {
        /// Value must be non-empty
        const REQUIRED = 1 << 0;
        /// Value must parse as a number
        const NUMERIC = 1 << 1;
        /// Value must look like an email address
        const EMAIL = 1 << 2;
        /// Application-defined validation happens server-side
        const CUSTOM = 1 << 3;
    }
}

/// Where a navigation lands.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigateKind {
    /// Replace the current page
    Same = 0,
    /// Open in a new viewing surface
    New = 1,
}

impl TryFrom<u8> for NavigateKind {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(NavigateKind::Same),
            1 => Ok(NavigateKind::New),
            _ => Err(WireError::Discriminant {
                kind: "navigate kind",
                value: value as u16,
            }),
        }
    }
}

/// A decoded category behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behavior {
    /// No behavior; a static region
    Static,
    /// Navigate to a target URL or path on activation
    Navigate {
        /// Target path or full `pixnet://` URL
        target: String,
        /// Destination surface
        kind: NavigateKind,
    },
    /// Emit a named event, debounced
    EmitEvent {
        /// Event name sent in `PIXEVT`
        name: String,
        /// Application-defined event type
        event_type: u8,
        /// Minimum milliseconds between emissions of the same event
        debounce_ms: u16,
    },
    /// Open an input surface and validate submissions
    InputZone {
        /// Zone ID the renderer keys the surface by
        zone_id: u16,
        /// Validation rules
        flags: ValidationFlags,
        /// Maximum accepted value length in bytes (0 = unlimited)
        max_length: u16,
    },
    /// Client-side hover feedback; no outbound event
    HoverEffect {
        /// Renderer-defined effect discriminant
        effect: u8,
    },
    /// Client-side click feedback; no outbound event
    ClickEffect {
        /// Renderer-defined effect discriminant
        effect: u8,
    },
    /// Drag source
    DragZone {
        /// Payload attached to drags starting here
        payload: Bytes,
    },
    /// Drop target
    DropZone {
        /// Application-defined acceptance filter
        accepts: Bytes,
    },
    /// Scrollable region
    ScrollZone {
        /// Scrollable content width
        content_width: u16,
        /// Scrollable content height
        content_height: u16,
        /// Pixels per scroll step
        step: u16,
    },
    /// Media transport controls forwarded to the audio collaborator
    MediaZone {
        /// Stream this zone controls
        stream_id: u8,
        /// Allowed control mask
        controls: u8,
    },
}

impl Behavior {
    /// The behavior discriminant used in category definitions.
    pub fn id(&self) -> u8 {
        match self {
            Behavior::Static => 0,
            Behavior::Navigate { .. } => 1,
            Behavior::EmitEvent { .. } => 2,
            Behavior::InputZone { .. } => 3,
            Behavior::HoverEffect { .. } => 4,
            Behavior::ClickEffect { .. } => 5,
            Behavior::DragZone { .. } => 6,
            Behavior::DropZone { .. } => 7,
            Behavior::ScrollZone { .. } => 8,
            Behavior::MediaZone { .. } => 9,
        }
    }

    /// Decode a behavior payload. Unknown IDs fail closed.
    pub fn decode(behavior_id: u8, data: &[u8]) -> Result<Self, WireError> {
        let mut r = BoundedReader::new(Bytes::copy_from_slice(data));
        let behavior = match behavior_id {
            0 => Behavior::Static,
            1 => Behavior::Navigate {
                target: r.string_u8("navigate target")?,
                kind: NavigateKind::try_from(r.u8("navigate kind")?)?,
            },
            2 => Behavior::EmitEvent {
                name: r.string_u8("event name")?,
                event_type: r.u8("event type")?,
                debounce_ms: r.u16_le("debounce")?,
            },
            3 => Behavior::InputZone {
                zone_id: r.u16_le("zone id")?,
                flags: ValidationFlags::from_bits(r.u8("validation flags")?)
                    .ok_or(WireError::Reserved)?,
                max_length: r.u16_le("max length")?,
            },
            4 => Behavior::HoverEffect {
                effect: r.u8("effect")?,
            },
            5 => Behavior::ClickEffect {
                effect: r.u8("effect")?,
            },
            6 => Behavior::DragZone {
                payload: {
                    let len = r.u8("payload length")? as usize;
                    r.take(len, "drag payload")?
                },
            },
            7 => Behavior::DropZone {
                accepts: {
                    let len = r.u8("accepts length")? as usize;
                    r.take(len, "accepts")?
                },
            },
            8 => Behavior::ScrollZone {
                content_width: r.u16_le("content width")?,
                content_height: r.u16_le("content height")?,
                step: r.u16_le("step")?,
            },
            9 => Behavior::MediaZone {
                stream_id: r.u8("stream id")?,
                controls: r.u8("controls")?,
            },
            other => {
                return Err(WireError::Discriminant {
                    kind: "behavior id",
                    value: other as u16,
                })
            }
        };
        Ok(behavior)
    }

    /// Encode the behavior payload for this variant.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        match self {
            Behavior::Static => {}
            Behavior::Navigate { target, kind } => {
                buf.put_u8(target.len() as u8);
                buf.put_slice(target.as_bytes());
                buf.put_u8(*kind as u8);
            }
            Behavior::EmitEvent {
                name,
                event_type,
                debounce_ms,
            } => {
                buf.put_u8(name.len() as u8);
                buf.put_slice(name.as_bytes());
                buf.put_u8(*event_type);
                buf.put_u16_le(*debounce_ms);
            }
            Behavior::InputZone {
                zone_id,
                flags,
                max_length,
            } => {
                buf.put_u16_le(*zone_id);
                buf.put_u8(flags.bits());
                buf.put_u16_le(*max_length);
            }
            Behavior::HoverEffect { effect } | Behavior::ClickEffect { effect } => {
                buf.put_u8(*effect);
            }
            Behavior::DragZone { payload } => {
                buf.put_u8(payload.len() as u8);
                buf.put_slice(payload);
            }
            Behavior::DropZone { accepts } => {
                buf.put_u8(accepts.len() as u8);
                buf.put_slice(accepts);
            }
            Behavior::ScrollZone {
                content_width,
                content_height,
                step,
            } => {
                buf.put_u16_le(*content_width);
                buf.put_u16_le(*content_height);
                buf.put_u16_le(*step);
            }
            Behavior::MediaZone {
                stream_id,
                controls,
            } => {
                buf.put_u8(*stream_id);
                buf.put_u8(*controls);
            }
        }
        buf.freeze()
    }
}
