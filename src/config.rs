//! Bridge configuration loaded from a TOML file by the binary.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub broker: BrokerSettings,
    pub vector_channel: VectorChannelConfig,
    pub scalar_channel: ScalarChannelConfig,
    /// Diagnostic log path; omitted means logging is disabled.
    pub diagnostic_log: Option<PathBuf>,
}

impl BridgeConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    /// `scheme://host:port`; `tls` or `mqtts` selects the encrypted
    /// transport.
    pub url: String,
    pub client_id: String,
    pub username: String,
    pub password: String,
    /// CA certificate for TLS schemes.
    pub ca_cert: Option<PathBuf>,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            url: "tcp://localhost:1883".to_string(),
            client_id: "sensorbridge".to_string(),
            username: String::new(),
            password: String::new(),
            ca_cert: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VectorChannelConfig {
    /// Empty topic disables the channel.
    pub topic: String,
    pub multipliers: [f32; 3],
    pub rounding: u32,
}

impl Default for VectorChannelConfig {
    fn default() -> Self {
        Self {
            topic: String::new(),
            multipliers: [1.0; 3],
            rounding: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScalarChannelConfig {
    pub topic: String,
    pub rounding: u32,
}

impl Default for ScalarChannelConfig {
    fn default() -> Self {
        Self {
            topic: String::new(),
            rounding: 2,
        }
    }
}
