//! # Message Corpus
//!
//! Precomputed, wire-ready message pools shared read-only by every session.
//! Building happens once before the run so the hot path only copies bytes.

use bytes::Bytes;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::messages::{epoch_seconds, ClientMessage, MessageKind, PlaybackAction};
use crate::rng::stream_rng;

/// Upper bound (exclusive) for generated file durations, in seconds
pub const MAX_FILE_DURATION: f64 = 1000.0;

/// Upper bound (exclusive) for generated file sizes, in bytes
pub const MAX_FILE_SIZE: u64 = 1_000_000;

/// Upper bound (exclusive) for the numeric suffix of generated file names
pub const MAX_FILE_SUFFIX: u32 = 100_000;

const HELLO_STREAM: u64 = 1;
const FILE_STREAM: u64 = 2;

/// Corpus sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// One greeting per possible session identity
    pub client_count: usize,

    /// Number of named rooms greetings are spread over
    pub room_count: usize,

    /// Representative state messages
    pub state_variants: usize,

    /// Representative file-announcement messages
    pub file_variants: usize,

    /// Fixed seed for reproducible pools
    pub seed: Option<u64>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            client_count: 50_000,
            room_count: 100,
            state_variants: 3,
            file_variants: 10,
            seed: None,
        }
    }
}

/// An immutable, serialized message ready to be written to a connection
#[derive(Debug, Clone, PartialEq)]
pub struct PooledMessage {
    kind: MessageKind,
    bytes: Bytes,
}

impl PooledMessage {
    pub fn encode(message: &ClientMessage) -> Result<Self> {
        Ok(Self {
            kind: message.kind(),
            bytes: message.encode_line()?,
        })
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Wire bytes, CRLF included. Cloning is a refcount bump.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The three message pools
#[derive(Debug, Clone)]
pub struct MessageCorpus {
    hello: Vec<PooledMessage>,
    state: Vec<PooledMessage>,
    file: Vec<PooledMessage>,
}

impl MessageCorpus {
    /// Build all pools concurrently; each builder owns its own generator.
    pub fn build(config: &CorpusConfig) -> Result<Self> {
        if config.room_count == 0 {
            return Err(ProtocolError::EmptyPool { pool: "rooms" });
        }
        if config.state_variants == 0 {
            return Err(ProtocolError::EmptyPool { pool: "state" });
        }
        if config.file_variants == 0 {
            return Err(ProtocolError::EmptyPool { pool: "file" });
        }

        let (hello, state, file) = std::thread::scope(|scope| {
            let hello = scope.spawn(|| {
                build_hello_pool(
                    config.client_count,
                    config.room_count,
                    &mut stream_rng(config.seed, HELLO_STREAM),
                )
            });
            let state = scope.spawn(|| build_state_pool(config.state_variants));
            let file = scope.spawn(|| {
                build_file_pool(
                    config.file_variants,
                    &mut stream_rng(config.seed, FILE_STREAM),
                )
            });

            (
                hello.join().map_err(|_| ProtocolError::BuilderPanicked { pool: "hello" }),
                state.join().map_err(|_| ProtocolError::BuilderPanicked { pool: "state" }),
                file.join().map_err(|_| ProtocolError::BuilderPanicked { pool: "file" }),
            )
        });

        let corpus = Self {
            hello: hello??,
            state: state??,
            file: file??,
        };

        debug!(
            hello = corpus.hello.len(),
            state = corpus.state.len(),
            file = corpus.file.len(),
            "Message corpus built"
        );

        Ok(corpus)
    }

    /// Greeting for a session identity
    pub fn hello(&self, id: usize) -> Option<&PooledMessage> {
        self.hello.get(id)
    }

    pub fn hello_pool(&self) -> &[PooledMessage] {
        &self.hello
    }

    pub fn state_pool(&self) -> &[PooledMessage] {
        &self.state
    }

    pub fn file_pool(&self) -> &[PooledMessage] {
        &self.file
    }

    /// A precomputed state message exercising `action`, if the pool has one.
    /// Variant `i` of the state pool exercises `PlaybackAction::from_index(i)`.
    pub fn state_for<R: Rng + ?Sized>(
        &self,
        action: PlaybackAction,
        rng: &mut R,
    ) -> Option<&PooledMessage> {
        let stride = PlaybackAction::ALL.len();
        let start = action.index();
        if start >= self.state.len() {
            return None;
        }
        let matching = (self.state.len() - start).div_ceil(stride);
        let pick = rng.gen_range(0..matching);
        self.state.get(start + pick * stride)
    }

    pub fn random_file<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&PooledMessage> {
        if self.file.is_empty() {
            return None;
        }
        self.file.get(rng.gen_range(0..self.file.len()))
    }
}

/// Username for a session identity
pub fn username_for(id: usize) -> String {
    format!("user{}", id)
}

/// Name of the room with the given index
pub fn room_name(index: usize) -> String {
    format!("room{}", index)
}

fn build_hello_pool(
    client_count: usize,
    room_count: usize,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<PooledMessage>> {
    (0..client_count)
        .map(|id| {
            let room = room_name(rng.gen_range(0..room_count));
            PooledMessage::encode(&ClientMessage::hello(username_for(id), room))
        })
        .collect()
}

fn build_state_pool(variants: usize) -> Result<Vec<PooledMessage>> {
    (0..variants)
        .map(|i| {
            let action = PlaybackAction::from_index(i);
            let message = ClientMessage::state(
                action == PlaybackAction::TogglePause,
                (i * 100) as f64,
                action == PlaybackAction::Seek,
                epoch_seconds(),
            );
            PooledMessage::encode(&message)
        })
        .collect()
}

fn build_file_pool(variants: usize, rng: &mut ChaCha8Rng) -> Result<Vec<PooledMessage>> {
    (0..variants)
        .map(|_| {
            let duration = rng.gen_range(0.0..MAX_FILE_DURATION);
            let name = format!("file_{}", rng.gen_range(0..MAX_FILE_SUFFIX));
            let size = rng.gen_range(0..MAX_FILE_SIZE);
            PooledMessage::encode(&ClientMessage::file(duration, name, size))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Playstate;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn small_config() -> CorpusConfig {
        CorpusConfig {
            client_count: 64,
            room_count: 7,
            state_variants: 6,
            file_variants: 10,
            seed: Some(42),
        }
    }

    fn room_index(message: &PooledMessage) -> usize {
        match ClientMessage::decode_line(message.bytes()).unwrap() {
            ClientMessage::Hello(hello) => hello.room.name["room".len()..].parse().unwrap(),
            other => panic!("expected hello, got {:?}", other),
        }
    }

    fn playstate(message: &PooledMessage) -> Playstate {
        match ClientMessage::decode_line(message.bytes()).unwrap() {
            ClientMessage::State(state) => state.playstate,
            other => panic!("expected state, got {:?}", other),
        }
    }

    #[test]
    fn test_pool_sizes() {
        let corpus = MessageCorpus::build(&small_config()).unwrap();
        assert_eq!(corpus.hello_pool().len(), 64);
        assert_eq!(corpus.state_pool().len(), 6);
        assert_eq!(corpus.file_pool().len(), 10);
        assert!(corpus.hello(63).is_some());
        assert!(corpus.hello(64).is_none());
    }

    #[test]
    fn test_every_entry_is_one_line() {
        let corpus = MessageCorpus::build(&small_config()).unwrap();
        let all = corpus
            .hello_pool()
            .iter()
            .chain(corpus.state_pool())
            .chain(corpus.file_pool());
        for message in all {
            let bytes = message.bytes();
            assert!(bytes.ends_with(b"\r\n"));
            assert_eq!(bytes.iter().filter(|b| **b == b'\n').count(), 1);
        }
    }

    #[test]
    fn test_hello_embeds_identity() {
        let corpus = MessageCorpus::build(&small_config()).unwrap();
        for (id, message) in corpus.hello_pool().iter().enumerate() {
            assert_eq!(message.kind(), MessageKind::Hello);
            match ClientMessage::decode_line(message.bytes()).unwrap() {
                ClientMessage::Hello(hello) => {
                    assert_eq!(hello.username, format!("user{}", id));
                    assert_eq!(hello.version, "1.2.7");
                }
                other => panic!("expected hello, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_state_pool_covers_actions() {
        let corpus = MessageCorpus::build(&small_config()).unwrap();
        for (i, message) in corpus.state_pool().iter().enumerate() {
            let state = playstate(message);
            let action = PlaybackAction::from_index(i);
            assert_eq!(state.paused, action == PlaybackAction::TogglePause);
            assert_eq!(state.do_seek.is_some(), action == PlaybackAction::Seek);
            assert_eq!(state.position, (i * 100) as f64);
        }
    }

    #[test]
    fn test_state_for_matches_action() {
        let corpus = MessageCorpus::build(&small_config()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..50 {
            let seek = corpus.state_for(PlaybackAction::Seek, &mut rng).unwrap();
            assert_eq!(playstate(seek).do_seek, Some(true));

            let toggle = corpus.state_for(PlaybackAction::TogglePause, &mut rng).unwrap();
            assert!(playstate(toggle).paused);
            assert!(playstate(toggle).do_seek.is_none());
        }
    }

    #[test]
    fn test_state_for_missing_variant() {
        let config = CorpusConfig {
            state_variants: 1,
            ..small_config()
        };
        let corpus = MessageCorpus::build(&config).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(corpus.state_for(PlaybackAction::TogglePause, &mut rng).is_some());
        assert!(corpus.state_for(PlaybackAction::Seek, &mut rng).is_none());
        assert!(corpus.state_for(PlaybackAction::Advance, &mut rng).is_none());
    }

    #[test]
    fn test_file_pool_bounds() {
        let corpus = MessageCorpus::build(&small_config()).unwrap();
        for message in corpus.file_pool() {
            match ClientMessage::decode_line(message.bytes()).unwrap() {
                ClientMessage::Set(set) => {
                    assert!((0.0..MAX_FILE_DURATION).contains(&set.file.duration));
                    assert!(set.file.size < MAX_FILE_SIZE);
                    assert!(set.file.name.starts_with("file_"));
                }
                other => panic!("expected set, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_seeded_build_is_reproducible() {
        let a = MessageCorpus::build(&small_config()).unwrap();
        let b = MessageCorpus::build(&small_config()).unwrap();
        assert_eq!(a.hello_pool(), b.hello_pool());
        assert_eq!(a.file_pool(), b.file_pool());
    }

    #[test]
    fn test_empty_pools_rejected() {
        let config = CorpusConfig {
            room_count: 0,
            ..small_config()
        };
        assert!(matches!(
            MessageCorpus::build(&config),
            Err(ProtocolError::EmptyPool { pool: "rooms" })
        ));

        let config = CorpusConfig {
            file_variants: 0,
            ..small_config()
        };
        assert!(matches!(
            MessageCorpus::build(&config),
            Err(ProtocolError::EmptyPool { pool: "file" })
        ));
    }

    #[test]
    fn test_zero_clients_is_valid() {
        let config = CorpusConfig {
            client_count: 0,
            ..small_config()
        };
        let corpus = MessageCorpus::build(&config).unwrap();
        assert!(corpus.hello_pool().is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_hello_rooms_in_range(
            clients in 1usize..200,
            rooms in 1usize..20,
            seed in any::<u64>(),
        ) {
            let config = CorpusConfig {
                client_count: clients,
                room_count: rooms,
                state_variants: 3,
                file_variants: 1,
                seed: Some(seed),
            };
            let corpus = MessageCorpus::build(&config).unwrap();
            prop_assert_eq!(corpus.hello_pool().len(), clients);
            for message in corpus.hello_pool() {
                prop_assert!(room_index(message) < rooms);
            }
        }
    }
}
