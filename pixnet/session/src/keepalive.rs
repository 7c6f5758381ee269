//! Keepalive probing with PING/PONG and RTT measurement.
//!
//! A `PIXPNG` carries the sender's timestamp; the peer echoes it back in
//! `PIXPOG`, which both proves liveness and yields a round-trip estimate.

use pixnet_wire::{Message, SessionId};
use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Build a PING probe stamped with the current time.
pub fn build_ping(session_id: SessionId) -> (Message, u64) {
    let timestamp = now_micros();
    (
        Message::Ping {
            session_id,
            timestamp,
        },
        timestamp,
    )
}

/// Build a PONG echoing a probe's timestamp.
pub fn build_pong(session_id: SessionId, timestamp: u64) -> Message {
    Message::Pong {
        session_id,
        timestamp,
    }
}

/// Current wall-clock time in microseconds.
pub fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Outstanding-probe tracking for one session.
#[derive(Debug, Default)]
pub struct KeepaliveState {
    outstanding: HashMap<u64, Instant>,
}

impl KeepaliveState {
    /// Record a PING being sent.
    pub fn record_ping(&mut self, timestamp: u64) {
        self.outstanding.insert(timestamp, Instant::now());

        // Drop stale entries so a peer that never answers cannot grow this.
        let cutoff = Instant::now() - Duration::from_secs(60);
        self.outstanding.retain(|_, &mut sent| sent > cutoff);
    }

    /// Process an echoed PONG; returns the RTT when the probe is known.
    pub fn process_pong(&mut self, timestamp: u64) -> Option<Duration> {
        self.outstanding
            .remove(&timestamp)
            .map(|sent| sent.elapsed())
    }

    /// The send instant of the oldest unanswered probe.
    pub fn oldest_outstanding(&self) -> Option<Instant> {
        self.outstanding.values().min().copied()
    }
}
