//! The per-connection session task.
//!
//! One task owns the whole connection: handshake, sequence-checked inbound
//! flow, outbound serialization and keepalive. The dispatcher talks to it
//! only through channels, so no session state is ever shared across tasks.

use crate::handshake::{generate_session_id, negotiate};
use crate::keepalive::{build_ping, build_pong, now_micros, KeepaliveState};
use bytes::BytesMut;
use pixnet_page::Page;
use pixnet_wire::{
    ByeReason, Capabilities, FrameEncoder, FrameType, Message, MessageDecoder, SessionId,
    WireError, WireErrorCode, DEFAULT_MAX_MESSAGE_SIZE,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Configuration for a session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Capabilities this server advertises
    pub server_capabilities: Capabilities,
    /// Idle period after which a PING goes out
    pub keepalive_idle: Duration,
    /// How long an unanswered PING may stay outstanding
    pub keepalive_timeout: Duration,
    /// Inbound message size limit
    pub max_message_size: usize,
    /// Mismatched session IDs tolerated before the session closes
    pub mismatch_threshold: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_capabilities: Capabilities::COMPRESSION,
            keepalive_idle: Duration::from_secs(15),
            keepalive_timeout: Duration::from_secs(10),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            mismatch_threshold: 8,
        }
    }
}

/// Statistics for a session, logged at teardown.
#[derive(Clone, Debug, Default)]
pub struct SessionStats {
    /// Total bytes received
    pub bytes_in: u64,
    /// Total bytes sent
    pub bytes_out: u64,
    /// Messages received
    pub messages_in: u64,
    /// Messages sent
    pub messages_out: u64,
    /// Most recent RTT measurement
    pub last_rtt: Option<Duration>,
    /// Messages dropped for carrying a foreign session ID
    pub mismatched_session_ids: u32,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer sent `PIXBYE`
    PeerBye,
    /// Keepalive deadline expired
    Timeout,
    /// Fatal protocol violation
    Protocol(WireErrorCode),
    /// Transport EOF or error
    Transport,
    /// Dispatcher asked the session to close
    Shutdown,
}

/// Events a session reports to its dispatcher.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Handshake finished; the session is Active
    Established {
        /// The session's ID
        session_id: SessionId,
        /// Negotiated protocol version
        version: u8,
        /// Negotiated capability set
        capabilities: Capabilities,
        /// Client user agent
        user_agent: String,
    },
    /// A client message passed its session and sequence checks
    MessageReceived {
        /// The session's ID
        session_id: SessionId,
        /// The verified message
        message: Message,
    },
    /// The session reached Closed
    Closed {
        /// The session's ID
        session_id: SessionId,
        /// Terminal reason
        reason: CloseReason,
    },
}

/// Commands a dispatcher sends into a session task.
#[derive(Debug)]
pub enum OutboundCommand {
    /// Serialize and send a page as a full rendering frame
    SendPage(Arc<Page>),
    /// Send a typed error without closing
    SendError {
        /// Error code
        code: WireErrorCode,
        /// Human-readable detail
        message: String,
    },
    /// Drain and close gracefully
    Close {
        /// Reason reported in `PIXBYE`
        reason: ByeReason,
        /// Human-readable detail
        message: String,
    },
}

enum ReadFailure {
    Transport,
    Wire(WireError),
}

async fn read_one_message<R: AsyncRead + Unpin>(
    rd: &mut R,
    decoder: &mut MessageDecoder,
    buf: &mut BytesMut,
) -> Result<Message, ReadFailure> {
    loop {
        if let Some(message) = decoder.decode(buf).map_err(ReadFailure::Wire)? {
            return Ok(message);
        }
        let n = rd.read_buf(buf).await.map_err(|_| ReadFailure::Transport)?;
        if n == 0 {
            return Err(ReadFailure::Transport);
        }
    }
}

struct Active<W> {
    wr: W,
    session_id: SessionId,
    encoder: FrameEncoder,
    events: mpsc::Sender<SessionEvent>,
    config: SessionConfig,
    in_seq: u32,
    out_seq: u32,
    keepalive: KeepaliveState,
    stats: SessionStats,
    last_inbound: Instant,
}

impl<W: AsyncWrite + Unpin> Active<W> {
    async fn send(&mut self, message: &Message) -> Result<(), anyhow::Error> {
        let bytes = message.encode()?;
        self.wr.write_all(&bytes).await?;
        self.stats.bytes_out += bytes.len() as u64;
        self.stats.messages_out += 1;
        Ok(())
    }

    async fn send_error(&mut self, code: WireErrorCode, detail: &str) {
        let message = Message::Error {
            session_id: self.session_id,
            code,
            message: detail.to_string(),
        };
        if let Err(e) = self.send(&message).await {
            debug!("error report failed: {e:#}");
        }
    }

    async fn send_bye(&mut self, reason: ByeReason, detail: &str) {
        let message = Message::Bye {
            session_id: self.session_id,
            reason,
            message: detail.to_string(),
        };
        if let Err(e) = self.send(&message).await {
            debug!("bye failed: {e:#}");
        }
    }

    async fn send_page(&mut self, page: &Page) -> Result<(), anyhow::Error> {
        let sequence = self.out_seq;
        self.out_seq += 1;
        let bytes = self.encoder.encode(
            FrameType::Full,
            sequence,
            now_micros(),
            page.width,
            page.height,
            page.format,
            page.pixels.clone(),
            page.category_map_wire_bytes(),
            page.wire_categories(),
        )?;
        self.wr.write_all(&bytes).await?;
        self.stats.bytes_out += bytes.len() as u64;
        self.stats.messages_out += 1;
        debug!(
            "sent page seq={} ({}x{}, {} bytes)",
            sequence,
            page.width,
            page.height,
            bytes.len()
        );
        Ok(())
    }

    /// Check a message's session ID. Foreign IDs are logged and counted,
    /// and only close the session past the configured threshold.
    fn check_session(&mut self, claimed: SessionId) -> Result<bool, CloseReason> {
        if claimed == self.session_id {
            return Ok(true);
        }
        self.stats.mismatched_session_ids += 1;
        warn!(
            "dropping message with foreign session id {} ({} so far)",
            claimed, self.stats.mismatched_session_ids
        );
        if self.stats.mismatched_session_ids > self.config.mismatch_threshold {
            return Err(CloseReason::Protocol(WireErrorCode::InvalidSession));
        }
        Ok(false)
    }

    /// Handle one decoded inbound message. Returns a close reason when the
    /// session must end.
    async fn handle_inbound(&mut self, message: Message) -> Option<CloseReason> {
        self.stats.messages_in += 1;
        self.last_inbound = Instant::now();

        match message {
            Message::Ping {
                session_id,
                timestamp,
            } => {
                match self.check_session(session_id) {
                    Ok(true) => {
                        let pong = build_pong(self.session_id, timestamp);
                        if self.send(&pong).await.is_err() {
                            return Some(CloseReason::Transport);
                        }
                    }
                    Ok(false) => {}
                    Err(reason) => return Some(reason),
                }
                None
            }
            Message::Pong { timestamp, .. } => {
                if let Some(rtt) = self.keepalive.process_pong(timestamp) {
                    self.stats.last_rtt = Some(rtt);
                    debug!("rtt {:?}", rtt);
                }
                None
            }
            Message::Event {
                session_id,
                sequence,
                ..
            }
            | Message::Input {
                session_id,
                sequence,
                ..
            } => {
                match self.check_session(session_id) {
                    Ok(true) => {}
                    Ok(false) => return None,
                    Err(reason) => return Some(reason),
                }
                if sequence != self.in_seq {
                    warn!("sequence gap: expected {}, got {}", self.in_seq, sequence);
                    self.send_error(WireErrorCode::ProtocolError, "sequence gap")
                        .await;
                    self.send_bye(ByeReason::Error, "sequence gap").await;
                    return Some(CloseReason::Protocol(WireErrorCode::ProtocolError));
                }
                self.in_seq += 1;
                self.emit(message).await
            }
            Message::Scroll { session_id, .. } | Message::Drag { session_id, .. } => {
                match self.check_session(session_id) {
                    Ok(true) => self.emit(message).await,
                    Ok(false) => None,
                    Err(reason) => Some(reason),
                }
            }
            Message::Bye { reason, .. } => {
                info!("peer closed session: {:?}", reason);
                Some(CloseReason::PeerBye)
            }
            Message::Error { code, message, .. } => {
                warn!("peer reported error {:?}: {}", code, message);
                None
            }
            Message::Handshake { .. } | Message::HandshakeAck { .. } | Message::Frame(_) => {
                self.send_error(WireErrorCode::ProtocolError, "unexpected message")
                    .await;
                self.send_bye(ByeReason::Error, "unexpected message").await;
                Some(CloseReason::Protocol(WireErrorCode::ProtocolError))
            }
        }
    }

    async fn emit(&mut self, message: Message) -> Option<CloseReason> {
        let event = SessionEvent::MessageReceived {
            session_id: self.session_id,
            message,
        };
        if self.events.send(event).await.is_err() {
            return Some(CloseReason::Shutdown);
        }
        None
    }

    /// Map a decode failure to its error code and report it.
    async fn decode_failure(&mut self, error: &WireError) -> CloseReason {
        let code = match error {
            WireError::Size(_) => WireErrorCode::FrameTooLarge,
            WireError::Checksum { .. } => WireErrorCode::ChecksumMismatch,
            _ => WireErrorCode::ProtocolError,
        };
        warn!("inbound decode failed: {error}");
        self.send_error(code, &error.to_string()).await;
        self.send_bye(ByeReason::Error, "decode failure").await;
        CloseReason::Protocol(code)
    }

    async fn finish(mut self, reason: CloseReason) {
        info!(
            "session {} closed ({:?}). stats: {:?}",
            self.session_id, reason, self.stats
        );
        let _ = self.wr.shutdown().await;
        let _ = self
            .events
            .send(SessionEvent::Closed {
                session_id: self.session_id,
                reason,
            })
            .await;
    }
}

/// The session driver.
pub struct Session;

impl Session {
    /// Run a server-side session over an accepted connection, generating a
    /// fresh session ID.
    pub async fn run<S>(
        config: SessionConfig,
        stream: S,
        events: mpsc::Sender<SessionEvent>,
        outbound: mpsc::Receiver<OutboundCommand>,
    ) -> Result<(), anyhow::Error>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        Self::run_with_id(config, stream, generate_session_id(), events, outbound).await
    }

    /// Run with a dispatcher-issued session ID, letting the dispatcher
    /// guarantee process-lifetime ID uniqueness.
    pub async fn run_with_id<S>(
        config: SessionConfig,
        stream: S,
        session_id: SessionId,
        events: mpsc::Sender<SessionEvent>,
        mut outbound: mpsc::Receiver<OutboundCommand>,
    ) -> Result<(), anyhow::Error>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let (mut rd, wr) = tokio::io::split(stream);
        let mut decoder = MessageDecoder::new().with_max_message_size(config.max_message_size);
        let mut buf = BytesMut::with_capacity(64 * 1024);

        let mut active = Active {
            wr,
            session_id,
            encoder: FrameEncoder::new(Capabilities::empty()),
            events,
            config: config.clone(),
            in_seq: 0,
            out_seq: 0,
            keepalive: KeepaliveState::default(),
            stats: SessionStats::default(),
            last_inbound: Instant::now(),
        };

        // Handshake phase. The client gets one idle period to speak first.
        let first = tokio::time::timeout(
            config.keepalive_idle,
            read_one_message(&mut rd, &mut decoder, &mut buf),
        )
        .await;

        let negotiated = match first {
            Err(_) => {
                active.finish(CloseReason::Timeout).await;
                return Ok(());
            }
            Ok(Err(ReadFailure::Transport)) => {
                active.finish(CloseReason::Transport).await;
                return Ok(());
            }
            Ok(Err(ReadFailure::Wire(e))) => {
                let reason = active.decode_failure(&e).await;
                active.finish(reason).await;
                return Ok(());
            }
            Ok(Ok(message)) => match negotiate(config.server_capabilities, &message) {
                Ok(negotiated) => negotiated,
                Err(reject) => {
                    warn!("handshake rejected: {reject}");
                    active.send_error(reject.code(), &reject.to_string()).await;
                    active.send_bye(ByeReason::Error, "handshake rejected").await;
                    active.finish(CloseReason::Protocol(reject.code())).await;
                    return Ok(());
                }
            },
        };

        active.encoder = FrameEncoder::new(negotiated.capabilities);
        let ack = Message::HandshakeAck {
            version: negotiated.version,
            session_id,
            capabilities: config.server_capabilities,
        };
        if active.send(&ack).await.is_err() {
            active.finish(CloseReason::Transport).await;
            return Ok(());
        }
        info!(
            "session {} active (v{}, caps {:#06x}, ua {:?})",
            session_id,
            negotiated.version,
            negotiated.capabilities.bits(),
            negotiated.user_agent
        );
        let _ = active
            .events
            .send(SessionEvent::Established {
                session_id,
                version: negotiated.version,
                capabilities: negotiated.capabilities,
                user_agent: negotiated.user_agent,
            })
            .await;
        active.last_inbound = Instant::now();

        let mut ping_interval = tokio::time::interval(config.keepalive_idle);
        ping_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let close_reason = loop {
            let ping_deadline = active
                .keepalive
                .oldest_outstanding()
                .map(|sent| tokio::time::Instant::from_std(sent + config.keepalive_timeout));

            tokio::select! {
                biased;

                command = outbound.recv() => match command {
                    Some(OutboundCommand::SendPage(page)) => {
                        if let Err(e) = active.send_page(&page).await {
                            warn!("page send failed: {e:#}");
                            break CloseReason::Transport;
                        }
                    }
                    Some(OutboundCommand::SendError { code, message }) => {
                        active.send_error(code, &message).await;
                    }
                    Some(OutboundCommand::Close { reason, message }) => {
                        active.send_bye(reason, &message).await;
                        break CloseReason::Shutdown;
                    }
                    None => {
                        active.send_bye(ByeReason::Shutdown, "server shutting down").await;
                        break CloseReason::Shutdown;
                    }
                },

                result = rd.read_buf(&mut buf) => match result {
                    Ok(0) => break CloseReason::Transport,
                    Ok(n) => {
                        active.stats.bytes_in += n as u64;
                        let mut close = None;
                        loop {
                            match decoder.decode(&mut buf) {
                                Ok(Some(message)) => {
                                    if let Some(reason) = active.handle_inbound(message).await {
                                        close = Some(reason);
                                        break;
                                    }
                                }
                                Ok(None) => break,
                                Err(e) => {
                                    close = Some(active.decode_failure(&e).await);
                                    break;
                                }
                            }
                        }
                        if let Some(reason) = close {
                            break reason;
                        }
                    }
                    Err(e) => {
                        debug!("read error: {e}");
                        break CloseReason::Transport;
                    }
                },

                _ = ping_interval.tick() => {
                    if active.last_inbound.elapsed() >= config.keepalive_idle {
                        let (ping, timestamp) = build_ping(session_id);
                        if active.send(&ping).await.is_err() {
                            break CloseReason::Transport;
                        }
                        active.keepalive.record_ping(timestamp);
                        debug!("sent keepalive ping");
                    }
                }

                _ = tokio::time::sleep_until(
                    ping_deadline.unwrap_or_else(|| {
                        tokio::time::Instant::now() + Duration::from_secs(3600)
                    })
                ), if ping_deadline.is_some() => {
                    warn!("keepalive timeout for session {}", session_id);
                    active.send_error(WireErrorCode::Timeout, "keepalive timeout").await;
                    active.send_bye(ByeReason::Timeout, "keepalive timeout").await;
                    break CloseReason::Timeout;
                }
            }
        };

        active.finish(close_reason).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pixnet_wire::{FrameFlags, RenderFrame};
    use std::collections::BTreeMap;
    use tokio::io::DuplexStream;
    use tokio::time::timeout;

    fn test_config() -> SessionConfig {
        SessionConfig {
            server_capabilities: Capabilities::COMPRESSION,
            keepalive_idle: Duration::from_millis(100),
            keepalive_timeout: Duration::from_millis(100),
            ..SessionConfig::default()
        }
    }

    struct TestClient {
        stream: DuplexStream,
        decoder: MessageDecoder,
        buf: BytesMut,
    }

    impl TestClient {
        fn new(stream: DuplexStream) -> Self {
            Self {
                stream,
                decoder: MessageDecoder::new(),
                buf: BytesMut::new(),
            }
        }

        async fn send(&mut self, message: &Message) {
            let bytes = message.encode().unwrap();
            self.stream.write_all(&bytes).await.unwrap();
        }

        async fn recv(&mut self) -> Message {
            loop {
                if let Some(message) = self.decoder.decode(&mut self.buf).unwrap() {
                    return message;
                }
                let n = self.stream.read_buf(&mut self.buf).await.unwrap();
                assert!(n > 0, "server closed unexpectedly");
            }
        }

        async fn handshake(&mut self) -> SessionId {
            self.send(&Message::Handshake {
                version: 1,
                capabilities: Capabilities::COMPRESSION,
                user_agent: "test".to_string(),
            })
            .await;
            match self.recv().await {
                Message::HandshakeAck { session_id, version, .. } => {
                    assert_eq!(version, 1);
                    session_id
                }
                other => panic!("expected ack, got {other:?}"),
            }
        }
    }

    fn spawn_session(
        config: SessionConfig,
    ) -> (
        TestClient,
        mpsc::Receiver<SessionEvent>,
        mpsc::Sender<OutboundCommand>,
    ) {
        let (client_end, server_end) = tokio::io::duplex(1024 * 1024);
        let (event_tx, event_rx) = mpsc::channel(32);
        let (outbound_tx, outbound_rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let _ = Session::run(config, server_end, event_tx, outbound_rx).await;
        });

        (TestClient::new(client_end), event_rx, outbound_tx)
    }

    #[tokio::test]
    async fn test_minimal_handshake_and_ping() {
        let (mut client, mut events, _outbound) = spawn_session(test_config());
        let session_id = client.handshake().await;
        assert_ne!(session_id, SessionId::NONE);

        match events.recv().await.unwrap() {
            SessionEvent::Established { session_id: sid, capabilities, .. } => {
                assert_eq!(sid, session_id);
                assert_eq!(capabilities, Capabilities::COMPRESSION);
            }
            other => panic!("expected established, got {other:?}"),
        }

        client
            .send(&Message::Ping {
                session_id,
                timestamp: 123,
            })
            .await;
        match client.recv().await {
            Message::Pong { timestamp, .. } => assert_eq!(timestamp, 123),
            other => panic!("expected pong, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_version_mismatch_rejected() {
        let (mut client, mut events, _outbound) = spawn_session(test_config());
        client
            .send(&Message::Handshake {
                version: 2,
                capabilities: Capabilities::empty(),
                user_agent: "future".to_string(),
            })
            .await;

        match client.recv().await {
            Message::Error { code, .. } => {
                assert_eq!(code, WireErrorCode::UnsupportedVersion);
            }
            other => panic!("expected error, got {other:?}"),
        }

        loop {
            match events.recv().await.unwrap() {
                SessionEvent::Closed { reason, .. } => {
                    assert_eq!(
                        reason,
                        CloseReason::Protocol(WireErrorCode::UnsupportedVersion)
                    );
                    break;
                }
                other => panic!("expected closed, got {other:?}"),
            }
        }
    }

    fn event_with_seq(session_id: SessionId, sequence: u32) -> Message {
        Message::Event {
            session_id,
            sequence,
            zone_id: 1,
            event_type: 0,
            timestamp: 0,
            mouse_x: 0,
            mouse_y: 0,
            modifiers: 0,
            name: "demo".to_string(),
            payload: Bytes::new(),
        }
    }

    #[tokio::test]
    async fn test_sequence_gap_closes_session() {
        let (mut client, mut events, _outbound) = spawn_session(test_config());
        let session_id = client.handshake().await;
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::Established { .. }
        ));

        client.send(&event_with_seq(session_id, 0)).await;
        match events.recv().await.unwrap() {
            SessionEvent::MessageReceived { .. } => {}
            other => panic!("expected message event, got {other:?}"),
        }

        // Replaying the previous sequence number is a fatal gap.
        client.send(&event_with_seq(session_id, 0)).await;
        match client.recv().await {
            Message::Error { code, .. } => assert_eq!(code, WireErrorCode::ProtocolError),
            other => panic!("expected error, got {other:?}"),
        }
        match client.recv().await {
            Message::Bye { .. } => {}
            other => panic!("expected bye, got {other:?}"),
        }
        match events.recv().await.unwrap() {
            SessionEvent::Closed { reason, .. } => {
                assert_eq!(reason, CloseReason::Protocol(WireErrorCode::ProtocolError));
            }
            other => panic!("expected closed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_keepalive_timeout_closes_promptly() {
        let (mut client, mut events, _outbound) = spawn_session(test_config());
        let _session_id = client.handshake().await;
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::Established { .. }
        ));

        // Stay silent: idle (100ms) + timeout (100ms) plus scheduling slack.
        let closed = timeout(Duration::from_millis(500), async {
            loop {
                if let SessionEvent::Closed { reason, .. } = events.recv().await.unwrap() {
                    return reason;
                }
            }
        })
        .await
        .expect("session must close after keepalive timeout");
        assert_eq!(closed, CloseReason::Timeout);
    }

    #[tokio::test]
    async fn test_client_pong_keeps_session_alive() {
        let (mut client, mut events, _outbound) = spawn_session(test_config());
        let session_id = client.handshake().await;
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::Established { .. }
        ));

        // Answer pings for a while; the session must stay open well past
        // several idle periods.
        let answering = async {
            loop {
                match client.recv().await {
                    Message::Ping { timestamp, .. } => {
                        client
                            .send(&Message::Pong {
                                session_id,
                                timestamp,
                            })
                            .await;
                    }
                    other => panic!("unexpected message {other:?}"),
                }
            }
        };

        let outcome = timeout(Duration::from_millis(450), async {
            tokio::select! {
                _ = answering => unreachable!(),
                event = events.recv() => event,
            }
        })
        .await;
        // Timing out here means no Closed event fired: the session lived.
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn test_bye_closes_cleanly() {
        let (mut client, mut events, _outbound) = spawn_session(test_config());
        let session_id = client.handshake().await;
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::Established { .. }
        ));

        client
            .send(&Message::Bye {
                session_id,
                reason: ByeReason::Normal,
                message: String::new(),
            })
            .await;
        match events.recv().await.unwrap() {
            SessionEvent::Closed { reason, .. } => assert_eq!(reason, CloseReason::PeerBye),
            other => panic!("expected closed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_page_reaches_client_compressed() {
        let (mut client, mut events, outbound) = spawn_session(test_config());
        let _session_id = client.handshake().await;
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::Established { .. }
        ));

        let page = Arc::new(
            Page::new(
                8,
                8,
                pixnet_wire::PixelFormat::Rgba8,
                Bytes::from(vec![0xAB; 256]),
                vec![0; 64],
                BTreeMap::new(),
            )
            .unwrap(),
        );
        outbound
            .send(OutboundCommand::SendPage(page.clone()))
            .await
            .unwrap();

        match client.recv().await {
            Message::Frame(RenderFrame {
                sequence,
                width,
                height,
                flags,
                pixels,
                ..
            }) => {
                assert_eq!(sequence, 0);
                assert_eq!((width, height), (8, 8));
                // Both sides negotiated compression and the buffer repeats.
                assert!(flags.contains(FrameFlags::COMPRESSED));
                assert_eq!(pixels, page.pixels);
            }
            other => panic!("expected frame, got {other:?}"),
        }
    }
}
