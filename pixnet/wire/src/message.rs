//! Typed wire messages and the incremental stream decoder.
//!
//! Every message starts with a 6-byte ASCII magic. Messages are
//! self-delimiting: the fixed envelope plus its length-prefixed fields
//! determine the total size, so the decoder attempts a parse against the
//! buffered bytes and reports "not yet" until a whole message is present.

use crate::capabilities::Capabilities;
use crate::error::{WireError, WireErrorCode};
use crate::frame::RenderFrame;
use crate::primitives::BoundedReader;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

/// Length of the magic tag that opens every message.
pub const MAGIC_LEN: usize = 6;

/// Default inbound message size limit (16 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Magic for the client handshake.
pub const MAGIC_HANDSHAKE: &[u8; 6] = b"PIXHND";
/// Magic for the server handshake acknowledgment.
pub const MAGIC_ACK: &[u8; 6] = b"PIXACK";
/// Magic for rendering frames.
pub const MAGIC_FRAME: &[u8; 6] = b"PIXNET";
/// Magic for zone events.
pub const MAGIC_EVENT: &[u8; 6] = b"PIXEVT";
/// Magic for input submissions.
pub const MAGIC_INPUT: &[u8; 6] = b"PIXINP";
/// Magic for scroll updates.
pub const MAGIC_SCROLL: &[u8; 6] = b"PIXSCR";
/// Magic for drag events.
pub const MAGIC_DRAG: &[u8; 6] = b"PIXDRG";
/// Magic for keepalive pings.
pub const MAGIC_PING: &[u8; 6] = b"PIXPNG";
/// Magic for keepalive pongs.
pub const MAGIC_PONG: &[u8; 6] = b"PIXPOG";
/// Magic for protocol errors.
pub const MAGIC_ERROR: &[u8; 6] = b"PIXERR";
/// Magic for session termination.
pub const MAGIC_BYE: &[u8; 6] = b"PIXBYE";

/// An 8-byte session identifier issued by the server at handshake.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SessionId(pub [u8; 8]);

impl SessionId {
    /// The all-zero placeholder used before a session exists.
    pub const NONE: SessionId = SessionId([0u8; 8]);
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Drag event phases carried in `PIXDRG`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragAction {
    /// Drag started in a drag zone
    Start = 0,
    /// Pointer moved while dragging
    Move = 1,
    /// Dropped onto a drop zone
    Drop = 2,
    /// Drag abandoned
    Cancel = 3,
}

impl TryFrom<u8> for DragAction {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DragAction::Start),
            1 => Ok(DragAction::Move),
            2 => Ok(DragAction::Drop),
            3 => Ok(DragAction::Cancel),
            _ => Err(WireError::Discriminant {
                kind: "drag action",
                value: value as u16,
            }),
        }
    }
}

/// Session termination reasons carried in `PIXBYE`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByeReason {
    /// Orderly close requested by the peer
    Normal = 0,
    /// Closing after a fatal protocol error
    Error = 1,
    /// Keepalive deadline expired
    Timeout = 2,
    /// Server is shutting down
    Shutdown = 3,
}

impl TryFrom<u8> for ByeReason {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, WireError> {
        match value {
            0 => Ok(ByeReason::Normal),
            1 => Ok(ByeReason::Error),
            2 => Ok(ByeReason::Timeout),
            3 => Ok(ByeReason::Shutdown),
            _ => Err(WireError::Discriminant {
                kind: "bye reason",
                value: value as u16,
            }),
        }
    }
}

/// A decoded wire message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// `PIXHND` — client opens a session
    Handshake {
        /// Highest protocol version the client speaks
        version: u8,
        /// Client capability advertisement
        capabilities: Capabilities,
        /// Client user agent (ASCII, ≤255 bytes)
        user_agent: String,
    },
    /// `PIXACK` — server accepts the handshake
    HandshakeAck {
        /// Negotiated protocol version
        version: u8,
        /// Freshly issued session ID
        session_id: SessionId,
        /// Server capability advertisement
        capabilities: Capabilities,
    },
    /// `PIXNET` — a rendering frame
    Frame(RenderFrame),
    /// `PIXEVT` — a zone event
    Event {
        /// Session the event belongs to
        session_id: SessionId,
        /// Client→server sequence number
        sequence: u32,
        /// Category ID of the zone that produced the event
        zone_id: u16,
        /// Application-defined event type
        event_type: u8,
        /// Client timestamp in microseconds
        timestamp: u64,
        /// Pointer x at emission
        mouse_x: u16,
        /// Pointer y at emission
        mouse_y: u16,
        /// Modifier key mask
        modifiers: u8,
        /// Event name (≤255 bytes)
        name: String,
        /// Opaque event payload (≤65535 bytes)
        payload: Bytes,
    },
    /// `PIXINP` — an input zone submission
    Input {
        /// Session the input belongs to
        session_id: SessionId,
        /// Client→server sequence number
        sequence: u32,
        /// Input zone ID
        zone_id: u16,
        /// Input surface type
        input_type: u8,
        /// 0 = passed validation, 1 = failed
        validation_status: u8,
        /// Submitted value bytes
        payload: Bytes,
    },
    /// `PIXSCR` — a scroll position update
    Scroll {
        /// Session the update belongs to
        session_id: SessionId,
        /// Scroll zone ID
        zone_id: u16,
        /// Horizontal scroll position
        scroll_x: u16,
        /// Vertical scroll position
        scroll_y: u16,
    },
    /// `PIXDRG` — a drag lifecycle event
    Drag {
        /// Session the event belongs to
        session_id: SessionId,
        /// Drag phase
        action: DragAction,
        /// Source zone ID
        src: u16,
        /// Target zone ID (0 while unresolved)
        dst: u16,
        /// Pointer x
        mouse_x: u16,
        /// Pointer y
        mouse_y: u16,
        /// Drag payload bytes
        data: Bytes,
    },
    /// `PIXPNG` — keepalive probe
    Ping {
        /// Session the probe belongs to
        session_id: SessionId,
        /// Sender timestamp, echoed back verbatim
        timestamp: u64,
    },
    /// `PIXPOG` — keepalive response
    Pong {
        /// Session the response belongs to
        session_id: SessionId,
        /// Timestamp echoed from the probe
        timestamp: u64,
    },
    /// `PIXERR` — a typed protocol error
    Error {
        /// Session the error belongs to (zero before handshake)
        session_id: SessionId,
        /// Error code
        code: WireErrorCode,
        /// Human-readable detail (≤255 bytes)
        message: String,
    },
    /// `PIXBYE` — session termination
    Bye {
        /// Session being terminated
        session_id: SessionId,
        /// Termination reason
        reason: ByeReason,
        /// Human-readable detail (≤255 bytes)
        message: String,
    },
}

impl Message {
    /// The magic tag this message is encoded with.
    pub fn magic(&self) -> &'static [u8; 6] {
        match self {
            Message::Handshake { .. } => MAGIC_HANDSHAKE,
            Message::HandshakeAck { .. } => MAGIC_ACK,
            Message::Frame(_) => MAGIC_FRAME,
            Message::Event { .. } => MAGIC_EVENT,
            Message::Input { .. } => MAGIC_INPUT,
            Message::Scroll { .. } => MAGIC_SCROLL,
            Message::Drag { .. } => MAGIC_DRAG,
            Message::Ping { .. } => MAGIC_PING,
            Message::Pong { .. } => MAGIC_PONG,
            Message::Error { .. } => MAGIC_ERROR,
            Message::Bye { .. } => MAGIC_BYE,
        }
    }

    /// The session ID carried by this message, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            Message::Handshake { .. } => None,
            Message::HandshakeAck { session_id, .. }
            | Message::Event { session_id, .. }
            | Message::Input { session_id, .. }
            | Message::Scroll { session_id, .. }
            | Message::Drag { session_id, .. }
            | Message::Ping { session_id, .. }
            | Message::Pong { session_id, .. }
            | Message::Error { session_id, .. }
            | Message::Bye { session_id, .. } => Some(*session_id),
            Message::Frame(_) => None,
        }
    }

    /// Encode to a contiguous buffer.
    pub fn encode(&self) -> Result<Bytes, WireError> {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_slice(self.magic());

        match self {
            Message::Handshake {
                version,
                capabilities,
                user_agent,
            } => {
                if user_agent.len() > u8::MAX as usize || !user_agent.is_ascii() {
                    return Err(WireError::Ascii("user agent"));
                }
                buf.put_u8(*version);
                buf.put_u16(capabilities.bits());
                buf.put_u8(user_agent.len() as u8);
                buf.put_slice(user_agent.as_bytes());
            }
            Message::HandshakeAck {
                version,
                session_id,
                capabilities,
            } => {
                buf.put_u8(*version);
                buf.put_slice(&session_id.0);
                buf.put_u16(capabilities.bits());
            }
            Message::Frame(frame) => {
                // The frame codec owns its full layout including the magic.
                return frame.encode_raw();
            }
            Message::Event {
                session_id,
                sequence,
                zone_id,
                event_type,
                timestamp,
                mouse_x,
                mouse_y,
                modifiers,
                name,
                payload,
            } => {
                if name.len() > u8::MAX as usize {
                    return Err(WireError::Size(name.len()));
                }
                if payload.len() > u16::MAX as usize {
                    return Err(WireError::Size(payload.len()));
                }
                buf.put_slice(&session_id.0);
                buf.put_u32(*sequence);
                buf.put_u16(*zone_id);
                buf.put_u8(*event_type);
                buf.put_u64(*timestamp);
                buf.put_u16(*mouse_x);
                buf.put_u16(*mouse_y);
                buf.put_u8(*modifiers);
                buf.put_u8(name.len() as u8);
                buf.put_slice(name.as_bytes());
                buf.put_u16(payload.len() as u16);
                buf.put_slice(payload);
            }
            Message::Input {
                session_id,
                sequence,
                zone_id,
                input_type,
                validation_status,
                payload,
            } => {
                if payload.len() > u16::MAX as usize {
                    return Err(WireError::Size(payload.len()));
                }
                buf.put_slice(&session_id.0);
                buf.put_u32(*sequence);
                buf.put_u16(*zone_id);
                buf.put_u8(*input_type);
                buf.put_u8(*validation_status);
                buf.put_u16(payload.len() as u16);
                buf.put_slice(payload);
            }
            Message::Scroll {
                session_id,
                zone_id,
                scroll_x,
                scroll_y,
            } => {
                buf.put_slice(&session_id.0);
                buf.put_u16(*zone_id);
                buf.put_u16(*scroll_x);
                buf.put_u16(*scroll_y);
            }
            Message::Drag {
                session_id,
                action,
                src,
                dst,
                mouse_x,
                mouse_y,
                data,
            } => {
                if data.len() > u16::MAX as usize {
                    return Err(WireError::Size(data.len()));
                }
                buf.put_slice(&session_id.0);
                buf.put_u8(*action as u8);
                buf.put_u16(*src);
                buf.put_u16(*dst);
                buf.put_u16(*mouse_x);
                buf.put_u16(*mouse_y);
                buf.put_u16(data.len() as u16);
                buf.put_slice(data);
            }
            Message::Ping {
                session_id,
                timestamp,
            }
            | Message::Pong {
                session_id,
                timestamp,
            } => {
                buf.put_slice(&session_id.0);
                buf.put_u64(*timestamp);
            }
            Message::Error {
                session_id,
                code,
                message,
            } => {
                if message.len() > u8::MAX as usize {
                    return Err(WireError::Size(message.len()));
                }
                buf.put_slice(&session_id.0);
                buf.put_u16(*code as u16);
                buf.put_u8(message.len() as u8);
                buf.put_slice(message.as_bytes());
            }
            Message::Bye {
                session_id,
                reason,
                message,
            } => {
                if message.len() > u8::MAX as usize {
                    return Err(WireError::Size(message.len()));
                }
                buf.put_slice(&session_id.0);
                buf.put_u8(*reason as u8);
                buf.put_u8(message.len() as u8);
                buf.put_slice(message.as_bytes());
            }
        }

        Ok(buf.freeze())
    }
}

/// Incremental message decoder over a read buffer.
///
/// `decode` returns `Ok(None)` until a complete message is buffered and
/// never consumes bytes for an incomplete one. Buffered input growing past
/// the size limit without completing a message is an error.
#[derive(Debug)]
pub struct MessageDecoder {
    max_message_size: usize,
    decompress_ceiling: usize,
}

impl MessageDecoder {
    /// Create a decoder with default limits.
    pub fn new() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            decompress_ceiling: crate::compress::DEFAULT_DECOMPRESS_CEILING,
        }
    }

    /// Override the inbound message size limit.
    pub fn with_max_message_size(mut self, limit: usize) -> Self {
        self.max_message_size = limit;
        self
    }

    /// Decode one message, consuming its bytes from `buf` on success.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Message>, WireError> {
        if buf.len() < MAGIC_LEN {
            return Ok(None);
        }

        let mut magic = [0u8; 6];
        magic.copy_from_slice(&buf[..MAGIC_LEN]);

        let snapshot = Bytes::copy_from_slice(&buf[..]);
        match Self::parse(&magic, snapshot, self.decompress_ceiling) {
            Ok((message, consumed)) => {
                buf.advance(consumed);
                Ok(Some(message))
            }
            Err(WireError::Truncated(_)) | Err(WireError::Incomplete) => {
                if buf.len() >= self.max_message_size {
                    return Err(WireError::Size(buf.len()));
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn parse(
        magic: &[u8; 6],
        snapshot: Bytes,
        decompress_ceiling: usize,
    ) -> Result<(Message, usize), WireError> {
        if magic == MAGIC_FRAME {
            let (frame, consumed) = RenderFrame::decode(snapshot, decompress_ceiling)?;
            return Ok((Message::Frame(frame), consumed));
        }

        let total = snapshot.len();
        let mut r = BoundedReader::new(snapshot);
        r.take(MAGIC_LEN, "magic")?;

        let message = match magic {
            m if m == MAGIC_HANDSHAKE => {
                let version = r.u8("version")?;
                let capabilities = Capabilities::decode(r.u16_be("capabilities")?)?;
                let user_agent = r.ascii_u8("user agent")?;
                Message::Handshake {
                    version,
                    capabilities,
                    user_agent,
                }
            }
            m if m == MAGIC_ACK => {
                let version = r.u8("version")?;
                let session_id = SessionId(r.array("session id")?);
                let capabilities = Capabilities::decode(r.u16_be("capabilities")?)?;
                Message::HandshakeAck {
                    version,
                    session_id,
                    capabilities,
                }
            }
            m if m == MAGIC_EVENT => {
                let session_id = SessionId(r.array("session id")?);
                let sequence = r.u32_be("sequence")?;
                let zone_id = r.u16_be("zone id")?;
                let event_type = r.u8("event type")?;
                let timestamp = r.u64_be("timestamp")?;
                let mouse_x = r.u16_be("mouse x")?;
                let mouse_y = r.u16_be("mouse y")?;
                let modifiers = r.u8("modifiers")?;
                let name = r.string_u8("event name")?;
                let payload_len = r.u16_be("payload length")? as usize;
                let payload = r.take(payload_len, "payload")?;
                Message::Event {
                    session_id,
                    sequence,
                    zone_id,
                    event_type,
                    timestamp,
                    mouse_x,
                    mouse_y,
                    modifiers,
                    name,
                    payload,
                }
            }
            m if m == MAGIC_INPUT => {
                let session_id = SessionId(r.array("session id")?);
                let sequence = r.u32_be("sequence")?;
                let zone_id = r.u16_be("zone id")?;
                let input_type = r.u8("input type")?;
                let validation_status = r.u8("validation status")?;
                let payload_len = r.u16_be("payload length")? as usize;
                let payload = r.take(payload_len, "payload")?;
                Message::Input {
                    session_id,
                    sequence,
                    zone_id,
                    input_type,
                    validation_status,
                    payload,
                }
            }
            m if m == MAGIC_SCROLL => {
                let session_id = SessionId(r.array("session id")?);
                let zone_id = r.u16_be("zone id")?;
                let scroll_x = r.u16_be("scroll x")?;
                let scroll_y = r.u16_be("scroll y")?;
                Message::Scroll {
                    session_id,
                    zone_id,
                    scroll_x,
                    scroll_y,
                }
            }
            m if m == MAGIC_DRAG => {
                let session_id = SessionId(r.array("session id")?);
                let action = DragAction::try_from(r.u8("drag action")?)?;
                let src = r.u16_be("src zone")?;
                let dst = r.u16_be("dst zone")?;
                let mouse_x = r.u16_be("mouse x")?;
                let mouse_y = r.u16_be("mouse y")?;
                let data_len = r.u16_be("data length")? as usize;
                let data = r.take(data_len, "drag data")?;
                Message::Drag {
                    session_id,
                    action,
                    src,
                    dst,
                    mouse_x,
                    mouse_y,
                    data,
                }
            }
            m if m == MAGIC_PING => {
                let session_id = SessionId(r.array("session id")?);
                let timestamp = r.u64_be("timestamp")?;
                Message::Ping {
                    session_id,
                    timestamp,
                }
            }
            m if m == MAGIC_PONG => {
                let session_id = SessionId(r.array("session id")?);
                let timestamp = r.u64_be("timestamp")?;
                Message::Pong {
                    session_id,
                    timestamp,
                }
            }
            m if m == MAGIC_ERROR => {
                let session_id = SessionId(r.array("session id")?);
                let code = WireErrorCode::try_from(r.u16_be("error code")?)?;
                let message = r.string_u8("error message")?;
                Message::Error {
                    session_id,
                    code,
                    message,
                }
            }
            m if m == MAGIC_BYE => {
                let session_id = SessionId(r.array("session id")?);
                let reason = ByeReason::try_from(r.u8("bye reason")?)?;
                let message = r.string_u8("bye message")?;
                Message::Bye {
                    session_id,
                    reason,
                    message,
                }
            }
            other => return Err(WireError::Magic(*other)),
        };

        Ok((message, total - r.remaining()))
    }
}

impl Default for MessageDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(message: Message) -> Message {
        let encoded = message.encode().unwrap();
        let mut decoder = MessageDecoder::new();
        let mut buf = BytesMut::from(encoded.as_ref());
        let decoded = decoder.decode(&mut buf).unwrap().unwrap();
        assert!(buf.is_empty(), "decoder must consume exactly one message");
        decoded
    }

    #[test]
    fn test_handshake_roundtrip() {
        let m = Message::Handshake {
            version: 1,
            capabilities: Capabilities::COMPRESSION,
            user_agent: "test".to_string(),
        };
        assert_eq!(roundtrip(m.clone()), m);
    }

    #[test]
    fn test_ack_roundtrip() {
        let m = Message::HandshakeAck {
            version: 1,
            session_id: SessionId([1, 2, 3, 4, 5, 6, 7, 8]),
            capabilities: Capabilities::COMPRESSION | Capabilities::ANIMATION,
        };
        assert_eq!(roundtrip(m.clone()), m);
    }

    #[test]
    fn test_event_roundtrip() {
        let m = Message::Event {
            session_id: SessionId([9; 8]),
            sequence: 7,
            zone_id: 12,
            event_type: 0,
            timestamp: 123_456_789,
            mouse_x: 320,
            mouse_y: 240,
            modifiers: 0x02,
            name: "demo_click".to_string(),
            payload: Bytes::from_static(b"/next"),
        };
        assert_eq!(roundtrip(m.clone()), m);
    }

    #[test]
    fn test_input_scroll_drag_roundtrip() {
        for m in [
            Message::Input {
                session_id: SessionId([3; 8]),
                sequence: 1,
                zone_id: 4,
                input_type: 0,
                validation_status: 0,
                payload: Bytes::from_static(b"alice@example.com"),
            },
            Message::Scroll {
                session_id: SessionId([3; 8]),
                zone_id: 9,
                scroll_x: 0,
                scroll_y: 144,
            },
            Message::Drag {
                session_id: SessionId([3; 8]),
                action: DragAction::Drop,
                src: 5,
                dst: 6,
                mouse_x: 10,
                mouse_y: 20,
                data: Bytes::from_static(b"card-42"),
            },
        ] {
            assert_eq!(roundtrip(m.clone()), m);
        }
    }

    #[test]
    fn test_ping_pong_error_bye_roundtrip() {
        for m in [
            Message::Ping {
                session_id: SessionId([7; 8]),
                timestamp: 123,
            },
            Message::Pong {
                session_id: SessionId([7; 8]),
                timestamp: 123,
            },
            Message::Error {
                session_id: SessionId::NONE,
                code: WireErrorCode::UnsupportedVersion,
                message: "version 2 not supported".to_string(),
            },
            Message::Bye {
                session_id: SessionId([7; 8]),
                reason: ByeReason::Timeout,
                message: String::new(),
            },
        ] {
            assert_eq!(roundtrip(m.clone()), m);
        }
    }

    #[test]
    fn test_unknown_magic_rejected() {
        let mut decoder = MessageDecoder::new();
        let mut buf = BytesMut::from(&b"PIXWAT\x00\x00\x00\x00\x00\x00\x00\x00"[..]);
        assert!(matches!(
            decoder.decode(&mut buf),
            Err(WireError::Magic(_))
        ));
    }

    #[test]
    fn test_incremental_feed() {
        let m = Message::Event {
            session_id: SessionId([1; 8]),
            sequence: 1,
            zone_id: 2,
            event_type: 0,
            timestamp: 42,
            mouse_x: 1,
            mouse_y: 2,
            modifiers: 0,
            name: "navigate".to_string(),
            payload: Bytes::from_static(b"/about?x=1"),
        };
        let encoded = m.encode().unwrap();

        let mut decoder = MessageDecoder::new();
        let mut buf = BytesMut::new();
        for (i, byte) in encoded.iter().enumerate() {
            buf.put_u8(*byte);
            let out = decoder.decode(&mut buf).unwrap();
            if i + 1 < encoded.len() {
                assert!(out.is_none(), "decoded early at byte {}", i);
            } else {
                assert_eq!(out.unwrap(), m);
            }
        }
    }

    #[test]
    fn test_two_messages_back_to_back() {
        let a = Message::Ping {
            session_id: SessionId([1; 8]),
            timestamp: 1,
        };
        let b = Message::Pong {
            session_id: SessionId([1; 8]),
            timestamp: 1,
        };
        let mut buf = BytesMut::new();
        buf.put_slice(&a.encode().unwrap());
        buf.put_slice(&b.encode().unwrap());

        let mut decoder = MessageDecoder::new();
        assert_eq!(decoder.decode(&mut buf).unwrap().unwrap(), a);
        assert_eq!(decoder.decode(&mut buf).unwrap().unwrap(), b);
        assert!(decoder.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_size_limit_enforced() {
        let mut decoder = MessageDecoder::new().with_max_message_size(16);
        // Envelope declaring a 255-byte name that never arrives; the buffer
        // is already past the limit, so waiting is not an option.
        let mut buf = BytesMut::new();
        buf.put_slice(MAGIC_EVENT);
        buf.put_slice(&[0u8; 8]); // session id
        buf.put_u32(1); // sequence
        buf.put_u16(2); // zone id
        buf.put_u8(0); // event type
        buf.put_u64(0); // timestamp
        buf.put_u16(0); // mouse x
        buf.put_u16(0); // mouse y
        buf.put_u8(0); // modifiers
        buf.put_u8(0xFF); // name length with no name bytes behind it
        assert!(matches!(decoder.decode(&mut buf), Err(WireError::Size(_))));
    }

    #[test]
    fn test_reserved_capability_bits_rejected() {
        let mut raw = BytesMut::new();
        raw.put_slice(MAGIC_HANDSHAKE);
        raw.put_u8(1);
        raw.put_u16(0x0100); // reserved bit
        raw.put_u8(0);
        let mut decoder = MessageDecoder::new();
        assert!(matches!(
            decoder.decode(&mut raw),
            Err(WireError::Reserved)
        ));
    }
}
