//! Handshake negotiation and session-ID issue.

use pixnet_wire::{Capabilities, Message, SessionId, WireErrorCode, WIRE_VERSION};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use tracing::debug;

/// The protocol version this server speaks.
pub const SERVER_VERSION: u8 = WIRE_VERSION;

/// Why a handshake was refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeReject {
    /// Client offered a version outside what this server supports
    #[error("unsupported client version {0}")]
    UnsupportedVersion(u8),

    /// First message was not `PIXHND`
    #[error("expected handshake, got another message")]
    NotAHandshake,
}

impl HandshakeReject {
    /// The wire error code reported to the peer.
    pub fn code(&self) -> WireErrorCode {
        match self {
            HandshakeReject::UnsupportedVersion(_) => WireErrorCode::UnsupportedVersion,
            HandshakeReject::NotAHandshake => WireErrorCode::ProtocolError,
        }
    }
}

/// The result of a successful negotiation.
#[derive(Debug, Clone)]
pub struct Negotiated {
    /// Agreed protocol version
    pub version: u8,
    /// Intersection of both peers' capability sets
    pub capabilities: Capabilities,
    /// Client's user agent string
    pub user_agent: String,
}

/// Negotiate against an inbound message that should be a `PIXHND`.
///
/// The agreed version is the minimum of both sides'; a client offering a
/// version newer than this server speaks (or zero) is refused outright.
pub fn negotiate(
    server_capabilities: Capabilities,
    message: &Message,
) -> Result<Negotiated, HandshakeReject> {
    let (version, capabilities, user_agent) = match message {
        Message::Handshake {
            version,
            capabilities,
            user_agent,
        } => (*version, *capabilities, user_agent.clone()),
        _ => return Err(HandshakeReject::NotAHandshake),
    };

    if version == 0 || version > SERVER_VERSION {
        return Err(HandshakeReject::UnsupportedVersion(version));
    }

    let negotiated = Negotiated {
        version: version.min(SERVER_VERSION),
        capabilities: server_capabilities.negotiate(capabilities),
        user_agent,
    };
    debug!(
        "negotiated v{} caps={:#06x} ua={:?}",
        negotiated.version,
        negotiated.capabilities.bits(),
        negotiated.user_agent
    );
    Ok(negotiated)
}

/// Generate a fresh 8-byte session ID from the OS entropy source.
pub fn generate_session_id() -> SessionId {
    let mut id = [0u8; 8];
    OsRng.fill_bytes(&mut id);
    SessionId(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handshake(version: u8, caps: Capabilities) -> Message {
        Message::Handshake {
            version,
            capabilities: caps,
            user_agent: "test".to_string(),
        }
    }

    #[test]
    fn test_negotiation_intersects_capabilities() {
        let server = Capabilities::COMPRESSION | Capabilities::ANIMATION;
        let out = negotiate(server, &handshake(1, Capabilities::COMPRESSION)).unwrap();
        assert_eq!(out.version, 1);
        assert_eq!(out.capabilities, Capabilities::COMPRESSION);
    }

    #[test]
    fn test_newer_client_version_refused() {
        let err = negotiate(Capabilities::empty(), &handshake(2, Capabilities::empty()))
            .unwrap_err();
        assert_eq!(err, HandshakeReject::UnsupportedVersion(2));
        assert_eq!(err.code(), WireErrorCode::UnsupportedVersion);
    }

    #[test]
    fn test_zero_version_refused() {
        assert!(negotiate(Capabilities::empty(), &handshake(0, Capabilities::empty())).is_err());
    }

    #[test]
    fn test_non_handshake_refused() {
        let message = Message::Ping {
            session_id: SessionId([1; 8]),
            timestamp: 0,
        };
        let err = negotiate(Capabilities::empty(), &message).unwrap_err();
        assert_eq!(err.code(), WireErrorCode::ProtocolError);
    }

    #[test]
    fn test_session_ids_are_distinct() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_ne!(a, b);
        assert_ne!(a, SessionId::NONE);
    }
}
