//! PIXNET protocol server binary.
//!
//! Loads `.pxnt` pages from a content directory and serves them over the
//! wire protocol: handshake, rendering frames, interactive events,
//! keepalive and session management.

use anyhow::Context;
use clap::Parser;
use pixnet_server::{Dispatcher, DispatcherConfig};
use pixnet_session::{listen_tcp, SessionConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod content;
mod logging;

use config::ServerConfig;
use content::ContentStore;
use logging::PixnetLogFormatter;

/// PIXNET protocol server with PXNT content support.
#[derive(Parser, Debug)]
#[command(name = "pixnetd", version, about = "PIXNET protocol server")]
struct Args {
    /// Listen address, e.g. 0.0.0.0:7621
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Directory containing .pxnt pages
    #[arg(long)]
    content: Option<PathBuf>,

    /// Keepalive idle period, e.g. 15s
    #[arg(long, default_value = "15s")]
    keepalive_idle: humantime::Duration,

    /// Keepalive response timeout, e.g. 10s
    #[arg(long, default_value = "10s")]
    keepalive_timeout: humantime::Duration,

    /// Maximum simultaneous sessions
    #[arg(long)]
    max_sessions: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Configuration file path
    #[arg(long, default_value = "pixnetd.yaml")]
    config: PathBuf,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::new("info")
        .add_directive(format!("pixnetd={}", args.log_level).parse()?)
        .add_directive(format!("pixnet_server={}", args.log_level).parse()?)
        .add_directive(format!("pixnet_session={}", args.log_level).parse()?)
        .add_directive(format!("pixnet_wire={}", args.log_level).parse()?)
        .add_directive(format!("pixnet_pxnt={}", args.log_level).parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(true)
        .event_format(PixnetLogFormatter::new("pixnetd"))
        .init();

    info!("starting pixnetd v{}", env!("CARGO_PKG_VERSION"));

    let file_config = ServerConfig::load_from_file(&args.config)?;

    // Command-line flags win over file and environment settings.
    let listen: SocketAddr = match args.listen {
        Some(addr) => addr,
        None => file_config
            .listen
            .parse()
            .with_context(|| format!("invalid listen address {:?}", file_config.listen))?,
    };
    let content_dir = args
        .content
        .unwrap_or_else(|| PathBuf::from(&file_config.content_dir));

    let session = SessionConfig {
        keepalive_idle: Duration::from(args.keepalive_idle),
        keepalive_timeout: Duration::from(args.keepalive_timeout),
        max_message_size: file_config.max_message_size,
        ..SessionConfig::default()
    };
    let dispatcher_config = DispatcherConfig {
        session,
        max_sessions: args.max_sessions.unwrap_or(file_config.max_sessions),
        max_events_per_sec: file_config.max_events_per_sec,
        ..DispatcherConfig::default()
    };

    info!(
        "config: listen={}, content={:?}, idle={:?}, timeout={:?}, max_sessions={}",
        listen,
        content_dir,
        dispatcher_config.session.keepalive_idle,
        dispatcher_config.session.keepalive_timeout,
        dispatcher_config.max_sessions
    );

    let store = Arc::new(ContentStore::load(&content_dir)?);
    let dispatcher = Dispatcher::new(dispatcher_config, store);

    let listener = listen_tcp(listen)
        .await
        .with_context(|| format!("binding {listen}"))?;

    tokio::select! {
        result = dispatcher.run(listener) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    }
}
