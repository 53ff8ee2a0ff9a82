//! Probe configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use syncprobe_protocol::CorpusConfig;

use crate::error::{ProbeError, Result};
use crate::tracker::DegradationPolicy;

/// How sessions produce their periodic state messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StateMode {
    /// Serialize each update from the session's own playback state
    #[default]
    Live,
    /// Send the precomputed state message for the chosen action
    Pooled,
}

/// Capacity probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Target `host:port`
    pub target: String,

    /// Planned number of sessions
    pub max_sessions: usize,

    /// Pause between two session spawns (microseconds)
    pub connect_interval_us: u64,

    /// Maximum lifetime of one session (milliseconds)
    pub session_duration_ms: u64,

    /// Interval between two state updates of a session (milliseconds)
    pub action_interval_ms: u64,

    /// Responses slower than this count as slow (milliseconds)
    pub response_deadline_ms: u64,

    /// Number of most recent samples considered
    pub window_size: usize,

    /// Allowed percentage of slow samples in the window
    pub max_slow_percent: f64,

    /// Rooms greetings are spread over
    pub room_count: usize,

    /// Precomputed state messages
    pub state_variants: usize,

    /// Precomputed file announcements
    pub file_variants: usize,

    /// Chance of announcing a file after each state update
    pub file_probability: f64,

    pub state_mode: StateMode,

    /// Connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// Size of each session's read buffer
    pub read_buffer_size: usize,

    /// Fixed seed for reproducible corpus and session behaviour
    pub seed: Option<u64>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            target: "127.0.0.1:8080".to_string(),
            max_sessions: 50_000,
            connect_interval_us: 1,
            session_duration_ms: 30_000,
            action_interval_ms: 5_000,
            response_deadline_ms: 10,
            window_size: 1000,
            max_slow_percent: 5.0,
            room_count: 100,
            state_variants: 3,
            file_variants: 10,
            file_probability: 0.2,
            state_mode: StateMode::Live,
            connect_timeout_ms: 5_000,
            read_buffer_size: 1024,
            seed: None,
        }
    }
}

impl ProbeConfig {
    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reject values that would make the run meaningless or panic later
    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(ProbeError::Config("target must not be empty".into()));
        }
        if self.window_size == 0 {
            return Err(ProbeError::Config("window_size must be at least 1".into()));
        }
        if !(0.0..=100.0).contains(&self.max_slow_percent) {
            return Err(ProbeError::Config(format!(
                "max_slow_percent must be within 0..=100, got {}",
                self.max_slow_percent
            )));
        }
        if !(0.0..=1.0).contains(&self.file_probability) {
            return Err(ProbeError::Config(format!(
                "file_probability must be within 0..=1, got {}",
                self.file_probability
            )));
        }
        if self.room_count == 0 || self.state_variants == 0 || self.file_variants == 0 {
            return Err(ProbeError::Config(
                "room_count, state_variants and file_variants must be at least 1".into(),
            ));
        }
        if self.action_interval_ms == 0 {
            return Err(ProbeError::Config(
                "action_interval_ms must be at least 1".into(),
            ));
        }
        if self.read_buffer_size == 0 {
            return Err(ProbeError::Config(
                "read_buffer_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn connect_interval(&self) -> Duration {
        Duration::from_micros(self.connect_interval_us)
    }

    pub fn session_duration(&self) -> Duration {
        Duration::from_millis(self.session_duration_ms)
    }

    pub fn action_interval(&self) -> Duration {
        Duration::from_millis(self.action_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn policy(&self) -> DegradationPolicy {
        DegradationPolicy {
            window_size: self.window_size,
            deadline: Duration::from_millis(self.response_deadline_ms),
            max_slow_percent: self.max_slow_percent,
        }
    }

    /// Corpus sized for one greeting per planned session
    pub fn corpus_config(&self) -> CorpusConfig {
        CorpusConfig {
            client_count: self.max_sessions,
            room_count: self.room_count,
            state_variants: self.state_variants,
            file_variants: self.file_variants,
            seed: self.seed,
        }
    }
}
