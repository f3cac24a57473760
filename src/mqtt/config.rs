//! Connection parameters: per-connect credentials, manager-level
//! settings, and broker URL parsing.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Interval at which the client must ping the broker to stay considered
/// alive. Fixed for every connection the bridge opens.
pub const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Per-connect parameters, created at connect time and discarded on
/// disconnect or reconnect. Empty username and password mean anonymous
/// auth and are passed through untouched.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub url: String,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub clean_session: bool,
}

impl ConnectionConfig {
    pub fn new(url: &str, client_id: &str, username: &str, password: &str) -> Self {
        Self {
            url: url.to_string(),
            client_id: client_id.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            clean_session: true,
        }
    }
}

/// Settings fixed for the lifetime of a [`super::ConnectionManager`].
#[derive(Debug, Clone, Default)]
pub struct ManagerSettings {
    /// Where the diagnostic log is written. `None` disables it.
    pub log_path: Option<PathBuf>,
    /// PEM CA certificate used to verify the broker when a secure scheme
    /// is requested. Required for `tls://` and `mqtts://` URLs.
    pub ca_cert_path: Option<PathBuf>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("missing scheme separator in '{0}'")]
    MissingScheme(String),
    #[error("missing host in '{0}'")]
    MissingHost(String),
    #[error("missing port in '{0}'")]
    MissingPort(String),
    #[error("invalid port '{0}'")]
    InvalidPort(String),
}

/// A broker address of the form `scheme://host:port`. Host and numeric
/// port are mandatory; the scheme selects the transport variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerUrl {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl BrokerUrl {
    pub fn parse(raw: &str) -> Result<Self, UrlError> {
        let (scheme, rest) = raw
            .split_once("://")
            .ok_or_else(|| UrlError::MissingScheme(raw.to_string()))?;
        if scheme.is_empty() {
            return Err(UrlError::MissingScheme(raw.to_string()));
        }
        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| UrlError::MissingPort(raw.to_string()))?;
        if host.is_empty() {
            return Err(UrlError::MissingHost(raw.to_string()));
        }
        let port = port
            .parse()
            .map_err(|_| UrlError::InvalidPort(port.to_string()))?;
        Ok(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
        })
    }

    /// `tls` and `mqtts` select the encrypted transport; every other
    /// scheme (`tcp`, `mqtt`, ...) falls back to plaintext.
    pub fn is_secure(&self) -> bool {
        matches!(self.scheme.as_str(), "tls" | "mqtts")
    }
}

/// Why a connect request could not produce a live transport.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid broker url: {0}")]
    Url(#[from] UrlError),
    #[error("scheme '{0}' requires a CA certificate path")]
    MissingCaCert(String),
    #[error("failed to read CA certificate: {0}")]
    CaCertRead(#[from] std::io::Error),
}
