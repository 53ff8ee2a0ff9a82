//! # Transport
//!
//! Reliable byte-stream connections to the target. Sessions only ever see a
//! read half and a write half; how they were obtained is up to the
//! `Connector`.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::trace;

use crate::error::TransportError;

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// An established connection, split for concurrent reading and writing
pub struct Connection {
    pub reader: BoxedReader,
    pub writer: BoxedWriter,
}

impl Connection {
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }
}

/// Opens connections to the probed endpoint
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Connection, TransportError>;

    /// Human-readable endpoint description for logs and reports
    fn describe(&self) -> String;
}

/// Plain TCP connector
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
    timeout: Duration,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| TransportError::ConnectTimeout {
                addr: self.addr.clone(),
                timeout: self.timeout,
            })?
            .map_err(|source| TransportError::ConnectFailed {
                addr: self.addr.clone(),
                source,
            })?;

        // small periodic messages; don't let Nagle batch them
        if let Err(e) = stream.set_nodelay(true) {
            trace!("Failed to set TCP_NODELAY: {}", e);
        }

        let (reader, writer) = stream.into_split();
        Ok(Connection::new(reader, writer))
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.addr)
    }
}
