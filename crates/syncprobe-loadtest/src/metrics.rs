//! Live session counters shared between the ramp-up loop and every session

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Number of currently active sessions, with its high-water mark
#[derive(Debug, Default)]
pub struct ConcurrencyGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
    entered: AtomicU64,
    exited: AtomicU64,
}

impl ConcurrencyGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one session in; it is counted out when the guard drops
    pub fn enter(self: &Arc<Self>) -> GaugeGuard {
        self.entered.fetch_add(1, Ordering::AcqRel);
        let now = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        GaugeGuard {
            gauge: Arc::clone(self),
        }
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Sessions that have entered so far
    pub fn entered(&self) -> u64 {
        self.entered.load(Ordering::Acquire)
    }

    /// Sessions that have fully exited so far
    pub fn exited(&self) -> u64 {
        self.exited.load(Ordering::Acquire)
    }
}

/// Keeps one session counted in the gauge for as long as it lives
#[derive(Debug)]
pub struct GaugeGuard {
    gauge: Arc<ConcurrencyGauge>,
}

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.gauge.current.fetch_sub(1, Ordering::AcqRel);
        self.gauge.exited.fetch_add(1, Ordering::AcqRel);
    }
}

/// Outcome counters for sessions
#[derive(Debug, Default)]
pub struct SessionCounters {
    connect_failures: AtomicU64,
    send_failures: AtomicU64,
    messages_sent: AtomicU64,
    bytes_sent: AtomicU64,
}

impl SessionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connect_failure(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self, bytes: usize) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountersSnapshot {
    pub connect_failures: u64,
    pub send_failures: u64,
    pub messages_sent: u64,
    pub bytes_sent: u64,
}
