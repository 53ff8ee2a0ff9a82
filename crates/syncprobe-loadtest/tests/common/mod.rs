//! In-memory endpoints for driving sessions without sockets

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use syncprobe_loadtest::{Connection, Connector, ProbeConfig, TransportError};
use syncprobe_protocol::{ClientMessage, MessageCorpus};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

pub const RESPONSE_LINE: &[u8] = b"{\"State\":{\"ping\":{},\"playstate\":{}}}\r\n";

/// How the fake server answers a connection
#[derive(Debug, Clone, Copy)]
pub enum Responder {
    /// Never writes anything
    Silent,
    /// Drops its end right away
    HangUp,
    /// Streams responses: the first `fast_responses` (counted across all
    /// connections) immediately, every later one after `slow_delay`
    Stream {
        fast_responses: usize,
        slow_delay: Duration,
    },
}

/// Connector backed by `tokio::io::duplex` pairs
pub struct MemoryConnector {
    responder: Responder,
    connections: AtomicUsize,
    responses_sent: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Vec<Vec<u8>>>>>,
}

impl MemoryConnector {
    pub fn new(responder: Responder) -> Self {
        Self {
            responder,
            connections: AtomicUsize::new(0),
            responses_sent: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::Acquire)
    }

    pub fn responses_sent(&self) -> usize {
        self.responses_sent.load(Ordering::Acquire)
    }

    /// Lines received on connection `index`, delimiters included
    pub fn received_lines(&self, index: usize) -> Vec<Vec<u8>> {
        self.received.lock().get(index).cloned().unwrap_or_default()
    }

    /// Lines of connection `index` parsed as client messages
    pub fn received_messages(&self, index: usize) -> Vec<ClientMessage> {
        self.received_lines(index)
            .iter()
            .map(|line| ClientMessage::decode_line(line).expect("client sent invalid JSON"))
            .collect()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        self.connections.fetch_add(1, Ordering::AcqRel);
        let (client, server) = tokio::io::duplex(16 * 1024);
        let (client_read, client_write) = tokio::io::split(client);

        if let Responder::HangUp = self.responder {
            drop(server);
            return Ok(Connection::new(client_read, client_write));
        }

        let (server_read, mut server_write) = tokio::io::split(server);

        let index = {
            let mut received = self.received.lock();
            received.push(Vec::new());
            received.len() - 1
        };

        let streaming = match self.responder {
            Responder::Stream {
                fast_responses,
                slow_delay,
            } => Some((fast_responses, slow_delay)),
            _ => None,
        };

        let received = Arc::clone(&self.received);
        let mut idle_writer = None;
        if let Some((fast_responses, slow_delay)) = streaming {
            let sent = Arc::clone(&self.responses_sent);
            tokio::spawn(async move {
                loop {
                    if sent.load(Ordering::Acquire) >= fast_responses {
                        tokio::time::sleep(slow_delay).await;
                    } else {
                        tokio::task::yield_now().await;
                    }
                    if server_write.write_all(RESPONSE_LINE).await.is_err() {
                        break;
                    }
                    sent.fetch_add(1, Ordering::AcqRel);
                }
            });
        } else {
            idle_writer = Some(server_write);
        }

        tokio::spawn(async move {
            // a silent server keeps its write half open until the client leaves
            let _idle_writer = idle_writer;
            let mut reader = BufReader::new(server_read);
            loop {
                let mut line = Vec::new();
                match reader.read_until(b'\n', &mut line).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => received.lock()[index].push(line),
                }
            }
        });

        Ok(Connection::new(client_read, client_write))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Connector whose every attempt fails
pub struct RefusingConnector {
    attempts: AtomicUsize,
}

impl RefusingConnector {
    pub fn new() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Connector for RefusingConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        self.attempts.fetch_add(1, Ordering::AcqRel);
        Err(TransportError::ConnectFailed {
            addr: "memory".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        })
    }

    fn describe(&self) -> String {
        "refusing".to_string()
    }
}

pub fn corpus_for(config: &ProbeConfig) -> Arc<MessageCorpus> {
    Arc::new(MessageCorpus::build(&config.corpus_config()).expect("corpus build failed"))
}
