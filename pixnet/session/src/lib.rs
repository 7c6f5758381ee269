//! Per-connection session handling for PIXNET.
//!
//! A session owns one transport connection end to end: the handshake, the
//! sequence-checked message flow, keepalive probing and teardown. Each
//! session runs as its own task with a single `select!` loop, so state
//! transitions and sequence checks are race-free by construction.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod handshake;
pub mod keepalive;
pub mod session;
pub mod transport;

pub use handshake::{generate_session_id, negotiate, HandshakeReject, Negotiated, SERVER_VERSION};
pub use keepalive::{build_ping, build_pong, KeepaliveState};
pub use session::{
    CloseReason, OutboundCommand, Session, SessionConfig, SessionEvent, SessionStats,
};
pub use transport::{connect_tcp, listen_tcp};
