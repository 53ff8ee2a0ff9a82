//! # Latency Tracker
//!
//! Append-only log of response latencies shared by every session's reader,
//! with the windowed degradation check the ramp-up loop consults.
//!
//! Appends and windowed reads take the same lock, so a check always sees a
//! prefix of the appends in arrival order. Samples are never removed.

use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// When a window of recent samples counts as degraded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DegradationPolicy {
    /// Number of most recent samples inspected
    pub window_size: usize,

    /// Samples strictly above this are slow
    pub deadline: Duration,

    /// Allowed slow share of the window, in percent
    pub max_slow_percent: f64,
}

/// Slow-sample share of the most recent window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub window_size: usize,
    pub slow: usize,
    pub slow_percent: f64,
}

impl WindowStats {
    pub fn exceeds(&self, policy: &DegradationPolicy) -> bool {
        self.slow_percent > policy.max_slow_percent
    }
}

#[derive(Debug, Default)]
pub struct LatencyTracker {
    samples: Mutex<Vec<Duration>>,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Append one sample
    pub fn record(&self, latency: Duration) {
        self.samples.lock().push(latency);
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    /// Stats over the last `window_size` samples, or `None` while fewer exist
    pub fn window_stats(&self, policy: &DegradationPolicy) -> Option<WindowStats> {
        if policy.window_size == 0 {
            return None;
        }

        let samples = self.samples.lock();
        if samples.len() < policy.window_size {
            return None;
        }

        let window = &samples[samples.len() - policy.window_size..];
        let slow = window.iter().filter(|s| **s > policy.deadline).count();

        Some(WindowStats {
            window_size: policy.window_size,
            slow,
            slow_percent: (slow * 100) as f64 / policy.window_size as f64,
        })
    }

    /// Whether the most recent window breaches the policy.
    ///
    /// Always false until `window_size` samples have been recorded; a slow
    /// share exactly equal to the limit is not a breach.
    pub fn is_degraded(&self, policy: &DegradationPolicy) -> bool {
        self.window_stats(policy)
            .map(|stats| stats.exceeds(policy))
            .unwrap_or(false)
    }

    /// Copy of every sample recorded so far, in arrival order
    pub fn snapshot(&self) -> Vec<Duration> {
        self.samples.lock().clone()
    }
}
