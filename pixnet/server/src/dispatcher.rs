//! The connection dispatcher.
//!
//! Owns the listening socket and the session registry. Each accepted
//! connection gets a process-unique session ID and two tasks: the session
//! task (transport + state machine) and a driver task that routes that
//! session's events to the application. The registry holds only command
//! senders and metadata, never session state.

use crate::limits::TokenBucket;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use pixnet_page::Page;
use pixnet_session::{
    generate_session_id, CloseReason, OutboundCommand, Session, SessionConfig, SessionEvent,
};
use pixnet_wire::{ByeReason, Message, SessionId, WireErrorCode};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Application hooks driven by the dispatcher.
#[async_trait]
pub trait AppHandler: Send + Sync {
    /// The page served right after a successful handshake.
    async fn landing_page(&self) -> Option<Arc<Page>>;

    /// Resolve a navigation path (query stripped) to a page.
    async fn page_for(&self, path: &str) -> Option<Arc<Page>>;

    /// Called for every verified client message, before built-in routing.
    async fn on_message(&self, _session_id: SessionId, _message: &Message) {}

    /// A session finished its handshake.
    async fn on_session_started(&self, _session_id: SessionId, _user_agent: &str) {}

    /// A session reached Closed.
    async fn on_session_closed(&self, _session_id: SessionId, _reason: CloseReason) {}
}

/// Dispatcher configuration.
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Per-session configuration
    pub session: SessionConfig,
    /// Maximum concurrent sessions
    pub max_sessions: usize,
    /// Per-session inbound event rate (events per second)
    pub max_events_per_sec: u32,
    /// Burst allowance on top of the sustained rate
    pub event_burst: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            max_sessions: 256,
            max_events_per_sec: 200,
            event_burst: 50,
        }
    }
}

struct SessionHandle {
    outbound: mpsc::Sender<OutboundCommand>,
    user_agent: String,
    connected_at: Instant,
}

/// Accepts connections and routes session events to the application.
pub struct Dispatcher {
    config: DispatcherConfig,
    handler: Arc<dyn AppHandler>,
    sessions: DashMap<SessionId, SessionHandle>,
    issued_ids: DashSet<SessionId>,
}

impl Dispatcher {
    /// Build a dispatcher around an application handler.
    pub fn new(config: DispatcherConfig, handler: Arc<dyn AppHandler>) -> Arc<Self> {
        Arc::new(Self {
            config,
            handler,
            sessions: DashMap::new(),
            issued_ids: DashSet::new(),
        })
    }

    /// Number of currently active sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Accept-loop over a bound listener; runs until the listener fails.
    pub async fn run(self: Arc<Self>, listener: TcpListener) -> Result<(), anyhow::Error> {
        info!(
            "dispatcher listening on {} (max {} sessions)",
            listener.local_addr()?,
            self.config.max_sessions
        );

        loop {
            let (stream, peer) = listener.accept().await?;
            debug!("connection from {}", peer);

            if self.sessions.len() >= self.config.max_sessions {
                warn!("session limit reached, refusing {}", peer);
                tokio::spawn(refuse(stream));
                continue;
            }

            self.clone().spawn_session(stream);
        }
    }

    /// A fresh session ID, never reused within this process.
    fn fresh_session_id(&self) -> SessionId {
        loop {
            let id = generate_session_id();
            if self.issued_ids.insert(id) {
                return id;
            }
        }
    }

    /// Spawn the session task and its event driver for one connection.
    pub fn spawn_session(self: Arc<Self>, stream: TcpStream) {
        let session_id = self.fresh_session_id();
        let (event_tx, event_rx) = mpsc::channel(64);
        let (outbound_tx, outbound_rx) = mpsc::channel(64);

        let session_config = self.config.session.clone();
        tokio::spawn(async move {
            if let Err(e) =
                Session::run_with_id(session_config, stream, session_id, event_tx, outbound_rx)
                    .await
            {
                warn!("session {} task failed: {e:#}", session_id);
            }
        });

        tokio::spawn(self.drive_session(session_id, event_rx, outbound_tx));
    }

    async fn drive_session(
        self: Arc<Self>,
        session_id: SessionId,
        mut events: mpsc::Receiver<SessionEvent>,
        outbound: mpsc::Sender<OutboundCommand>,
    ) {
        let mut bucket = TokenBucket::new(
            self.config.max_events_per_sec,
            self.config.event_burst.max(1),
        );

        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Established { user_agent, .. } => {
                    self.sessions.insert(
                        session_id,
                        SessionHandle {
                            outbound: outbound.clone(),
                            user_agent: user_agent.clone(),
                            connected_at: Instant::now(),
                        },
                    );
                    self.handler.on_session_started(session_id, &user_agent).await;

                    if let Some(page) = self.handler.landing_page().await {
                        let _ = outbound.send(OutboundCommand::SendPage(page)).await;
                    }
                }

                SessionEvent::MessageReceived { message, .. } => {
                    if !bucket.allow() {
                        warn!("session {} exceeded event rate, closing", session_id);
                        let _ = outbound
                            .send(OutboundCommand::SendError {
                                code: WireErrorCode::RateLimited,
                                message: "event rate exceeded".to_string(),
                            })
                            .await;
                        let _ = outbound
                            .send(OutboundCommand::Close {
                                reason: ByeReason::Error,
                                message: "rate limited".to_string(),
                            })
                            .await;
                        continue;
                    }

                    self.handler.on_message(session_id, &message).await;
                    self.route(session_id, &message, &outbound).await;
                }

                SessionEvent::Closed { reason, .. } => {
                    self.sessions.remove(&session_id);
                    self.handler.on_session_closed(session_id, reason).await;
                    break;
                }
            }
        }
        debug!("driver for session {} finished", session_id);
    }

    /// Built-in routing: navigation events re-serve pages from the app.
    async fn route(
        &self,
        session_id: SessionId,
        message: &Message,
        outbound: &mpsc::Sender<OutboundCommand>,
    ) {
        if let Message::Event { name, payload, .. } = message {
            if name == "navigate" {
                let target = String::from_utf8_lossy(payload);
                let path = target.split('?').next().unwrap_or("/");
                match self.handler.page_for(path).await {
                    Some(page) => {
                        debug!("session {} navigates to {}", session_id, path);
                        let _ = outbound.send(OutboundCommand::SendPage(page)).await;
                    }
                    None => {
                        warn!("session {} requested unknown page {}", session_id, path);
                    }
                }
            }
        }
    }

    /// Administrative send: push a page to one session.
    pub async fn send_page(&self, session_id: SessionId, page: Arc<Page>) -> bool {
        match self.sessions.get(&session_id) {
            Some(handle) => handle
                .outbound
                .send(OutboundCommand::SendPage(page))
                .await
                .is_ok(),
            None => false,
        }
    }

    /// Administrative close of one session.
    pub async fn close_session(&self, session_id: SessionId, message: &str) -> bool {
        match self.sessions.get(&session_id) {
            Some(handle) => handle
                .outbound
                .send(OutboundCommand::Close {
                    reason: ByeReason::Shutdown,
                    message: message.to_string(),
                })
                .await
                .is_ok(),
            None => false,
        }
    }

    /// Uptime of a session, for administrative listings.
    pub fn session_uptime(&self, session_id: SessionId) -> Option<(String, std::time::Duration)> {
        self.sessions
            .get(&session_id)
            .map(|h| (h.user_agent.clone(), h.connected_at.elapsed()))
    }
}

/// Refuse a connection over the session limit: best-effort error, then drop.
async fn refuse(mut stream: TcpStream) {
    let message = Message::Error {
        session_id: SessionId::NONE,
        code: WireErrorCode::RateLimited,
        message: "session limit reached".to_string(),
    };
    if let Ok(bytes) = message.encode() {
        let _ = stream.write_all(&bytes).await;
    }
    let _ = stream.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};
    use pixnet_wire::{Capabilities, MessageDecoder, PixelFormat};
    use std::collections::BTreeMap;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::time::timeout;

    struct TwoPageApp {
        index: Arc<Page>,
        about: Arc<Page>,
    }

    fn tiny_page(marker: u8) -> Arc<Page> {
        Arc::new(
            Page::new(
                1,
                1,
                PixelFormat::Rgba8,
                Bytes::from(vec![marker, marker, marker, 0xFF]),
                vec![0],
                BTreeMap::new(),
            )
            .unwrap(),
        )
    }

    #[async_trait]
    impl AppHandler for TwoPageApp {
        async fn landing_page(&self) -> Option<Arc<Page>> {
            Some(self.index.clone())
        }

        async fn page_for(&self, path: &str) -> Option<Arc<Page>> {
            match path {
                "/" | "/index" => Some(self.index.clone()),
                "/about" => Some(self.about.clone()),
                _ => None,
            }
        }
    }

    struct Client {
        stream: TcpStream,
        decoder: MessageDecoder,
        buf: BytesMut,
    }

    impl Client {
        async fn connect(addr: SocketAddr) -> Self {
            Self {
                stream: TcpStream::connect(addr).await.unwrap(),
                decoder: MessageDecoder::new(),
                buf: BytesMut::new(),
            }
        }

        async fn send(&mut self, message: &Message) {
            self.stream
                .write_all(&message.encode().unwrap())
                .await
                .unwrap();
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
                Message::HandshakeAck { session_id, .. } => session_id,
                other => panic!("expected ack, got {other:?}"),
            }
        }
    }

    async fn start_dispatcher(config: DispatcherConfig) -> (Arc<Dispatcher>, SocketAddr) {
        let app = Arc::new(TwoPageApp {
            index: tiny_page(0x10),
            about: tiny_page(0x20),
        });
        let dispatcher = Dispatcher::new(config, app);

        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let listener = TcpListener::bind(addr).await.unwrap();
        let bound = listener.local_addr().unwrap();

        let runner = dispatcher.clone();
        tokio::spawn(async move {
            let _ = runner.run(listener).await;
        });

        (dispatcher, bound)
    }

    fn navigate_event(session_id: SessionId, sequence: u32, path: &str) -> Message {
        Message::Event {
            session_id,
            sequence,
            zone_id: 0,
            event_type: 0,
            timestamp: 0,
            mouse_x: 0,
            mouse_y: 0,
            modifiers: 0,
            name: "navigate".to_string(),
            payload: Bytes::copy_from_slice(path.as_bytes()),
        }
    }

    #[tokio::test]
    async fn test_serves_landing_page_then_navigates() {
        let (_dispatcher, addr) = start_dispatcher(DispatcherConfig::default()).await;
        let mut client = Client::connect(addr).await;
        let session_id = client.handshake().await;

        match client.recv().await {
            Message::Frame(frame) => assert_eq!(frame.pixels[0], 0x10),
            other => panic!("expected landing frame, got {other:?}"),
        }

        client.send(&navigate_event(session_id, 0, "/about")).await;
        match client.recv().await {
            Message::Frame(frame) => {
                assert_eq!(frame.pixels[0], 0x20);
                assert_eq!(frame.sequence, 1);
            }
            other => panic!("expected about frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_page_keeps_session_alive() {
        let (_dispatcher, addr) = start_dispatcher(DispatcherConfig::default()).await;
        let mut client = Client::connect(addr).await;
        let session_id = client.handshake().await;
        let _landing = client.recv().await;

        client.send(&navigate_event(session_id, 0, "/missing")).await;
        // Still healthy: a ping round-trips.
        client
            .send(&Message::Ping {
                session_id,
                timestamp: 9,
            })
            .await;
        match client.recv().await {
            Message::Pong { timestamp, .. } => assert_eq!(timestamp, 9),
            other => panic!("expected pong, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_session_limit_refused() {
        let config = DispatcherConfig {
            max_sessions: 1,
            ..DispatcherConfig::default()
        };
        let (dispatcher, addr) = start_dispatcher(config).await;

        let mut first = Client::connect(addr).await;
        let _sid = first.handshake().await;
        let _landing = first.recv().await;
        assert_eq!(dispatcher.session_count(), 1);

        let mut second = Client::connect(addr).await;
        second
            .send(&Message::Handshake {
                version: 1,
                capabilities: Capabilities::empty(),
                user_agent: "late".to_string(),
            })
            .await;
        match second.recv().await {
            Message::Error { code, .. } => assert_eq!(code, WireErrorCode::RateLimited),
            other => panic!("expected refusal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_event_flood_rate_limited() {
        let config = DispatcherConfig {
            max_events_per_sec: 1,
            event_burst: 2,
            ..DispatcherConfig::default()
        };
        let (_dispatcher, addr) = start_dispatcher(config).await;
        let mut client = Client::connect(addr).await;
        let session_id = client.handshake().await;
        let _landing = client.recv().await;

        for seq in 0..10u32 {
            client.send(&navigate_event(session_id, seq, "/")).await;
        }

        let got_rate_error = timeout(Duration::from_secs(2), async {
            loop {
                match client.recv().await {
                    Message::Error { code, .. } if code == WireErrorCode::RateLimited => {
                        return true;
                    }
                    _ => {}
                }
            }
        })
        .await
        .unwrap_or(false);
        assert!(got_rate_error);
    }
}
