//! # Session Driver
//!
//! One simulated client: connect, greet, then send playback state updates on
//! a fixed interval while a reader task timestamps every response.
//!
//! A session never retries. Any transport failure ends that session only,
//! and the concurrency gauge is released on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use syncprobe_protocol::{epoch_seconds, stream_rng, ClientMessage, MessageCorpus, PlaybackAction};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace, warn};

use crate::config::{ProbeConfig, StateMode};
use crate::metrics::{ConcurrencyGauge, SessionCounters};
use crate::tracker::LatencyTracker;
use crate::transport::{BoxedReader, BoxedWriter, Connection, Connector};

/// Upper bound (exclusive) for random seek targets, in seconds
pub const MAX_SEEK_POSITION: f64 = 1000.0;

/// Session RNG streams start here so they never collide with corpus streams
const SESSION_STREAM_BASE: u64 = 1 << 32;

/// Handles shared by every session of a run
#[derive(Clone)]
pub struct SessionContext {
    pub config: Arc<ProbeConfig>,
    pub corpus: Arc<MessageCorpus>,
    pub connector: Arc<dyn Connector>,
    pub gauge: Arc<ConcurrencyGauge>,
    pub counters: Arc<SessionCounters>,
    pub tracker: Arc<LatencyTracker>,
    pub stop: Arc<AtomicBool>,
}

impl SessionContext {
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

/// Local playback state of one client
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackState {
    pub paused: bool,
    pub position: f64,
}

impl PlaybackState {
    /// Apply an action; returns whether it was a seek
    pub fn apply<R: Rng + ?Sized>(
        &mut self,
        action: PlaybackAction,
        rng: &mut R,
        elapsed: Duration,
    ) -> bool {
        match action {
            PlaybackAction::TogglePause => {
                self.paused = !self.paused;
                false
            }
            PlaybackAction::Seek => {
                self.position = rng.gen_range(0.0..MAX_SEEK_POSITION);
                true
            }
            PlaybackAction::Advance => {
                if !self.paused {
                    self.position += elapsed.as_secs_f64();
                }
                false
            }
        }
    }
}

/// One state update produced by the action loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateUpdate {
    pub action: PlaybackAction,
    pub paused: bool,
    pub position: f64,
    pub do_seek: bool,
}

impl StateUpdate {
    pub fn to_message(&self) -> ClientMessage {
        ClientMessage::state(self.paused, self.position, self.do_seek, epoch_seconds())
    }
}

pub struct SessionDriver {
    id: usize,
    ctx: SessionContext,
    rng: ChaCha8Rng,
    playback: PlaybackState,
}

impl SessionDriver {
    pub fn new(id: usize, ctx: SessionContext) -> Self {
        let rng = stream_rng(ctx.config.seed, SESSION_STREAM_BASE + id as u64);
        Self {
            id,
            ctx,
            rng,
            playback: PlaybackState::default(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    /// Pick a random action and apply it to the local playback state
    pub fn next_update(&mut self) -> StateUpdate {
        let action = PlaybackAction::from_index(self.rng.gen_range(0..PlaybackAction::ALL.len()));
        let do_seek = self
            .playback
            .apply(action, &mut self.rng, self.ctx.config.action_interval());

        StateUpdate {
            action,
            paused: self.playback.paused,
            position: self.playback.position,
            do_seek,
        }
    }

    /// Run the session to completion
    pub async fn run(mut self) {
        let _guard = self.ctx.gauge.enter();

        let Some(hello) = self.ctx.corpus.hello(self.id).map(|m| m.bytes().clone()) else {
            warn!(session = self.id, "No greeting precomputed for session");
            return;
        };

        let Connection { reader, mut writer } = match self.ctx.connector.connect().await {
            Ok(conn) => conn,
            Err(e) => {
                debug!(session = self.id, kind = e.label(), "Connect failed: {}", e);
                self.ctx.counters.record_connect_failure();
                return;
            }
        };

        if !self.send(&mut writer, &hello).await {
            let _ = writer.shutdown().await;
            return;
        }

        let (close_tx, close_rx) = oneshot::channel();
        let reader_task = tokio::spawn(read_responses(
            reader,
            close_rx,
            Arc::clone(&self.ctx.tracker),
            Arc::clone(&self.ctx.stop),
            self.ctx.config.read_buffer_size,
        ));

        self.action_loop(&mut writer).await;

        let _ = writer.shutdown().await;
        drop(writer);
        let _ = close_tx.send(());

        match reader_task.await {
            Ok(responses) => trace!(session = self.id, responses, "Session finished"),
            Err(e) => warn!(session = self.id, "Reader task failed: {}", e),
        }
    }

    async fn action_loop(&mut self, writer: &mut BoxedWriter) {
        let started = Instant::now();
        let duration = self.ctx.config.session_duration();
        let interval = self.ctx.config.action_interval();
        let file_probability = self.ctx.config.file_probability;

        while started.elapsed() < duration && !self.ctx.stop_requested() {
            sleep(interval).await;

            let update = self.next_update();
            let state = match self.state_bytes(&update) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(session = self.id, "Failed to encode state update: {}", e);
                    break;
                }
            };
            if !self.send(writer, &state).await {
                break;
            }

            if self.rng.gen_bool(file_probability) {
                let file = self
                    .ctx
                    .corpus
                    .random_file(&mut self.rng)
                    .map(|m| m.bytes().clone());
                if let Some(file) = file {
                    if !self.send(writer, &file).await {
                        break;
                    }
                }
            }
        }
    }

    fn state_bytes(&mut self, update: &StateUpdate) -> syncprobe_protocol::Result<Bytes> {
        if self.ctx.config.state_mode == StateMode::Pooled {
            if let Some(pooled) = self.ctx.corpus.state_for(update.action, &mut self.rng) {
                return Ok(pooled.bytes().clone());
            }
        }
        update.to_message().encode_line()
    }

    async fn send(&self, writer: &mut BoxedWriter, bytes: &Bytes) -> bool {
        match writer.write_all(bytes).await {
            Ok(()) => {
                self.ctx.counters.record_sent(bytes.len());
                true
            }
            Err(e) => {
                debug!(session = self.id, "Send failed: {}", e);
                self.ctx.counters.record_send_failure();
                false
            }
        }
    }
}

/// Time every read until EOF, error, close signal or stop flag.
/// Returns the number of samples recorded.
async fn read_responses(
    mut reader: BoxedReader,
    mut close: oneshot::Receiver<()>,
    tracker: Arc<LatencyTracker>,
    stop: Arc<AtomicBool>,
    buffer_size: usize,
) -> u64 {
    let mut buf = vec![0u8; buffer_size];
    let mut samples = 0;

    while !stop.load(Ordering::Acquire) {
        let issued = Instant::now();
        tokio::select! {
            _ = &mut close => break,
            read = reader.read(&mut buf) => match read {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    tracker.record(issued.elapsed());
                    samples += 1;
                }
            },
        }
    }

    samples
}
