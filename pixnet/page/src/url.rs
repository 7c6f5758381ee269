//! `pixnet://` URL parsing and validation.

use pixnet_wire::DEFAULT_PORT;
use std::fmt;
use thiserror::Error;
use tracing::warn;
use url::{Host, Url};

/// Errors raised while parsing a `pixnet://` URL.
#[derive(Error, Debug)]
pub enum UrlError {
    /// Not a parseable URL at all
    #[error("unparseable url: {0}")]
    Parse(#[from] url::ParseError),

    /// Scheme other than `pixnet`
    #[error("unsupported scheme: {0}")]
    Scheme(String),

    /// Host missing or not a DNS name / IP literal
    #[error("invalid host")]
    Host,
}

/// A validated `pixnet://[host[:port]][/path][?query]` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixnetUrl {
    /// Host: DNS name or IP literal
    pub host: String,
    /// Port, defaulting to 7621
    pub port: u16,
    /// Path, always at least `/`
    pub path: String,
    /// Raw query string, without the `?`
    pub query: Option<String>,
}

impl PixnetUrl {
    /// Parse and validate a URL string.
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        let url = Url::parse(input)?;
        if url.scheme() != "pixnet" {
            return Err(UrlError::Scheme(url.scheme().to_string()));
        }

        let host = match url.host() {
            Some(Host::Domain(d)) if !d.is_empty() => d.to_string(),
            Some(Host::Ipv4(a)) => a.to_string(),
            Some(Host::Ipv6(a)) => format!("[{a}]"),
            _ => return Err(UrlError::Host),
        };

        let port = url.port().unwrap_or(DEFAULT_PORT);
        if port < 1024 {
            warn!("pixnet url {} uses well-known port {}", input, port);
        }

        let path = if url.path().is_empty() {
            "/".to_string()
        } else {
            url.path().to_string()
        };

        Ok(Self {
            host,
            port,
            path,
            query: url.query().map(str::to_string),
        })
    }

    /// The path plus query as sent in the initial `"navigate"` event.
    pub fn path_query(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }
}

impl fmt::Display for PixnetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pixnet://{}", self.host)?;
        if self.port != DEFAULT_PORT {
            write!(f, ":{}", self.port)?;
        }
        write!(f, "{}", self.path)?;
        if let Some(q) = &self.query {
            write!(f, "?{}", q)?;
        }
        Ok(())
    }
}
