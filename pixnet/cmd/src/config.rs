//! Configuration handling for the server binary.
//!
//! Settings come from a YAML file when one exists, then environment
//! variables, then command-line flags; later sources win.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, e.g. `0.0.0.0:7621`
    pub listen: String,
    /// Directory of `.pxnt` pages
    pub content_dir: String,
    /// Idle seconds before a keepalive PING
    pub keepalive_idle_secs: u64,
    /// Seconds an unanswered PING may stay outstanding
    pub keepalive_timeout_secs: u64,
    /// Maximum concurrent sessions
    pub max_sessions: usize,
    /// Inbound message size limit in bytes
    pub max_message_size: usize,
    /// Per-session event rate limit (events/second)
    pub max_events_per_sec: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: format!("0.0.0.0:{}", pixnet_wire::DEFAULT_PORT),
            content_dir: "content".to_string(),
            keepalive_idle_secs: 15,
            keepalive_timeout_secs: 10,
            max_sessions: 256,
            max_message_size: 16 * 1024 * 1024,
            max_events_per_sec: 200,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a file, then apply environment overrides.
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config = Self::default();

        if let Ok(content) = std::fs::read_to_string(&config_path) {
            match serde_yaml::from_str::<ServerConfig>(&content) {
                Ok(parsed) => {
                    config = parsed;
                    info!("loaded configuration from {:?}", config_path.as_ref());
                }
                Err(e) => {
                    warn!(
                        "failed to parse config file {:?} ({e}), using defaults",
                        config_path.as_ref()
                    );
                }
            }
        } else {
            warn!(
                "config file {:?} not found, using defaults",
                config_path.as_ref()
            );
        }

        config.apply_environment_overrides();
        Ok(config)
    }

    /// Apply `PIXNETD_*` environment variable overrides.
    fn apply_environment_overrides(&mut self) {
        if let Ok(listen) = std::env::var("PIXNETD_LISTEN") {
            info!("listen address overridden by environment: {}", listen);
            self.listen = listen;
        }
        if let Ok(dir) = std::env::var("PIXNETD_CONTENT_DIR") {
            info!("content dir overridden by environment: {}", dir);
            self.content_dir = dir;
        }
        if let Ok(value) = std::env::var("PIXNETD_MAX_SESSIONS") {
            if let Ok(parsed) = value.parse() {
                self.max_sessions = parsed;
                info!("max sessions overridden by environment: {}", parsed);
            }
        }
        if let Ok(value) = std::env::var("PIXNETD_MAX_EVENTS_PER_SEC") {
            if let Ok(parsed) = value.parse() {
                self.max_events_per_sec = parsed;
                info!("event rate overridden by environment: {}", parsed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.listen, "0.0.0.0:7621");
        assert_eq!(config.content_dir, "content");
        assert_eq!(config.keepalive_idle_secs, 15);
        assert_eq!(config.keepalive_timeout_secs, 10);
    }

    #[test]
    fn test_load_from_file() {
        let yaml = r#"
listen: "127.0.0.1:9700"
content_dir: "./pages"
max_sessions: 32
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = ServerConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.listen, "127.0.0.1:9700");
        assert_eq!(config.content_dir, "./pages");
        assert_eq!(config.max_sessions, 32);
        // Unspecified fields keep their defaults.
        assert_eq!(config.max_events_per_sec, 200);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = ServerConfig::load_from_file("/nonexistent/pixnetd.yaml").unwrap();
        assert_eq!(config.max_sessions, 256);
    }
}
