//! # Client Messages
//!
//! Shapes of the messages a synthetic client sends, and their line encoding.
//!
//! Every message is a single JSON object keyed by its kind, followed by CRLF:
//!
//! ```text
//! {"Hello":{"username":"user7","version":"1.2.7","room":{"name":"room42"}}}\r\n
//! {"State":{"ping":{...},"playstate":{"paused":false,"position":12.0}}}\r\n
//! {"Set":{"file":{"duration":93.5,"name":"file_311","size":48213}}}\r\n
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Protocol version announced in every greeting
pub const PROTOCOL_VERSION: &str = "1.2.7";

/// Line delimiter terminating every encoded message
pub const LINE_DELIMITER: &[u8] = b"\r\n";

/// Kind tag of a client message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Hello,
    State,
    File,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hello => write!(f, "hello"),
            Self::State => write!(f, "state"),
            Self::File => write!(f, "file"),
        }
    }
}

/// A message sent from client to server
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    Hello(Hello),
    State(State),
    Set(Set),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hello {
    pub username: String,
    pub version: String,
    pub room: Room,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub ping: Ping,
    pub playstate: Playstate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ping {
    pub client_rtt: f64,
    pub client_latency_calculation: f64,
    pub latency_calculation: f64,
}

impl Ping {
    /// Ping block stamped with the given epoch time (seconds)
    pub fn at(epoch_secs: f64) -> Self {
        Self {
            client_rtt: 0.0,
            client_latency_calculation: epoch_secs,
            latency_calculation: epoch_secs,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playstate {
    pub paused: bool,
    pub position: f64,
    /// Only present on messages that announce a seek
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_seek: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Set {
    pub file: FileInfo,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub duration: f64,
    pub name: String,
    pub size: u64,
}

/// Playback action a client can take on each tick
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackAction {
    TogglePause,
    Seek,
    Advance,
}

impl PlaybackAction {
    pub const ALL: [PlaybackAction; 3] = [Self::TogglePause, Self::Seek, Self::Advance];

    /// Action for an index, wrapping modulo the number of actions
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn index(self) -> usize {
        match self {
            Self::TogglePause => 0,
            Self::Seek => 1,
            Self::Advance => 2,
        }
    }
}

impl ClientMessage {
    pub fn hello(username: impl Into<String>, room: impl Into<String>) -> Self {
        Self::Hello(Hello {
            username: username.into(),
            version: PROTOCOL_VERSION.to_string(),
            room: Room { name: room.into() },
        })
    }

    /// State update; the seek indicator is only emitted when `do_seek` is set
    pub fn state(paused: bool, position: f64, do_seek: bool, epoch_secs: f64) -> Self {
        Self::State(State {
            ping: Ping::at(epoch_secs),
            playstate: Playstate {
                paused,
                position,
                do_seek: do_seek.then_some(true),
            },
        })
    }

    pub fn file(duration: f64, name: impl Into<String>, size: u64) -> Self {
        Self::Set(Set {
            file: FileInfo {
                duration,
                name: name.into(),
                size,
            },
        })
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Hello(_) => MessageKind::Hello,
            Self::State(_) => MessageKind::State,
            Self::Set(_) => MessageKind::File,
        }
    }

    /// Serialize to a single wire-ready line
    pub fn encode_line(&self) -> Result<Bytes> {
        let mut buf = serde_json::to_vec(self)?;
        buf.extend_from_slice(LINE_DELIMITER);
        Ok(Bytes::from(buf))
    }

    /// Parse one line (with or without its delimiter)
    pub fn decode_line(line: &[u8]) -> Result<Self> {
        let trimmed = line
            .strip_suffix(LINE_DELIMITER)
            .or_else(|| line.strip_suffix(b"\n"))
            .unwrap_or(line);
        Ok(serde_json::from_slice(trimmed)?)
    }
}

/// Current wall-clock time as fractional seconds since the Unix epoch
pub fn epoch_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1e6
}
