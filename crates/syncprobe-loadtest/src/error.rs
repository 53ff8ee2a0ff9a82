//! Error types for the capacity prober

use std::time::Duration;

use syncprobe_protocol::ProtocolError;
use thiserror::Error;

/// Result type alias for prober operations
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Errors surfaced while setting up or reporting a probe run.
///
/// Individual session failures never become a `ProbeError`; they end the
/// session that hit them and are only counted.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Corpus construction or message encoding failed
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A blocking setup task did not complete
    #[error("Setup task failed: {0}")]
    Setup(String),
}

/// Connection establishment errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection to {addr} failed: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    /// Endpoint refused the session without an IO error
    #[error("Endpoint unavailable: {0}")]
    Unavailable(String),
}

impl TransportError {
    /// Short label used when logging failures
    pub fn label(&self) -> &'static str {
        match self {
            Self::ConnectFailed { .. } => "connect_failed",
            Self::ConnectTimeout { .. } => "connect_timeout",
            Self::Unavailable(_) => "unavailable",
        }
    }
}
