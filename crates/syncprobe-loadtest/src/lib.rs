//! # syncprobe load test
//!
//! Finds how many concurrent client sessions a sync server sustains before
//! its response latency degrades.
//!
//! ## How a run works
//!
//! ```text
//!   CapacityProber ──spawn every connect_interval──► SessionDriver (×N)
//!        │                                              │ greet, then state/file
//!        │                                              │ updates every tick
//!        │                                              ▼
//!        └──── is_degraded(window)? ◄──── LatencyTracker ◄── reader task
//! ```
//!
//! Ramp-up stops the first time more than `max_slow_percent` of the last
//! `window_size` responses took longer than the deadline; the concurrency at
//! that moment is the answer.
//!
//! ## Usage
//!
//! ```bash
//! # Probe a local server with defaults
//! syncprobe --target 127.0.0.1:8080
//!
//! # Settings from a file, overridden on the command line
//! syncprobe --config probe.toml --max-sessions 5000 --output report.json
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod report;
pub mod session;
pub mod tracker;
pub mod transport;

pub use config::{ProbeConfig, StateMode};
pub use controller::CapacityProber;
pub use error::{ProbeError, Result, TransportError};
pub use metrics::{ConcurrencyGauge, CountersSnapshot, GaugeGuard, SessionCounters};
pub use report::ProbeReport;
pub use session::{PlaybackState, SessionContext, SessionDriver, StateUpdate};
pub use tracker::{DegradationPolicy, LatencyTracker, WindowStats};
pub use transport::{BoxedReader, BoxedWriter, Connection, Connector, TcpConnector};
