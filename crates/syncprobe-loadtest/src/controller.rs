//! # Ramp-Up Controller
//!
//! Spawns sessions at a fixed pacing interval and stops ramping up as soon
//! as the latency window degrades, then drains every spawned session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use syncprobe_protocol::MessageCorpus;
use tokio::task::JoinSet;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::config::ProbeConfig;
use crate::error::Result;
use crate::metrics::{ConcurrencyGauge, SessionCounters};
use crate::report::ProbeReport;
use crate::session::{SessionContext, SessionDriver};
use crate::tracker::LatencyTracker;
use crate::transport::Connector;

/// Spawned sessions between two progress log lines
const PROGRESS_LOG_INTERVAL: usize = 1000;

/// Upper bound on latency samples reserved before the run starts
const MAX_RESERVED_SAMPLES: usize = 1 << 16;

/// Runs one capacity probe against a connector.
///
/// All shared run state (gauge, stop flag, latency log) is owned here and
/// handed to sessions by `Arc`. A prober is meant for a single run.
pub struct CapacityProber {
    ctx: SessionContext,
}

impl CapacityProber {
    /// Rejects a config that fails [`ProbeConfig::validate`]
    pub fn new(
        config: ProbeConfig,
        corpus: Arc<MessageCorpus>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        config.validate()?;

        let reserved = config
            .window_size
            .saturating_mul(4)
            .min(MAX_RESERVED_SAMPLES);
        let tracker = LatencyTracker::with_capacity(reserved);
        Ok(Self {
            ctx: SessionContext {
                config: Arc::new(config),
                corpus,
                connector,
                gauge: Arc::new(ConcurrencyGauge::new()),
                counters: Arc::new(SessionCounters::new()),
                tracker: Arc::new(tracker),
                stop: Arc::new(AtomicBool::new(false)),
            },
        })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.ctx.config
    }

    pub fn tracker(&self) -> &Arc<LatencyTracker> {
        &self.ctx.tracker
    }

    pub fn gauge(&self) -> &Arc<ConcurrencyGauge> {
        &self.ctx.gauge
    }

    /// Setting this flag ends ramp-up and asks sessions to wind down
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.ctx.stop)
    }

    /// Ramp up until the planned session count is exhausted or latency
    /// degrades, then wait for every session to finish.
    pub async fn probe(&self) -> ProbeReport {
        let config = &self.ctx.config;
        let policy = config.policy();
        let pacing = config.connect_interval();
        let started = Instant::now();

        info!(
            "Probing {} with up to {} sessions ({:?} pacing, {}% of last {} over {:?})",
            self.ctx.connector.describe(),
            config.max_sessions,
            pacing,
            policy.max_slow_percent,
            policy.window_size,
            policy.deadline
        );

        let mut sessions = JoinSet::new();
        let mut spawned = 0;
        let mut degraded_at = None;
        let mut concurrency_at_breach = None;

        for id in 0..config.max_sessions {
            if self.ctx.stop.load(Ordering::Acquire) {
                info!("Stop requested, ending ramp-up after {} sessions", spawned);
                break;
            }

            sessions.spawn(SessionDriver::new(id, self.ctx.clone()).run());
            spawned += 1;
            trace!(session = id, "Session spawned");

            if pacing.is_zero() {
                tokio::task::yield_now().await;
            } else {
                sleep(pacing).await;
            }

            if self.ctx.tracker.is_degraded(&policy) {
                let concurrency = self.ctx.gauge.current();
                if let Some(window) = self.ctx.tracker.window_stats(&policy) {
                    warn!(
                        "Exceeded response time threshold at {} concurrent connections ({} of last {} slower than {:?})",
                        concurrency, window.slow, window.window_size, policy.deadline
                    );
                }
                concurrency_at_breach = Some(concurrency);
                degraded_at = Some(id);
                self.ctx.stop.store(true, Ordering::Release);
                break;
            }

            if spawned % PROGRESS_LOG_INTERVAL == 0 {
                info!(
                    "Ramp-up: {} spawned, {} active (peak {}), {} samples",
                    spawned,
                    self.ctx.gauge.current(),
                    self.ctx.gauge.peak(),
                    self.ctx.tracker.len()
                );
            }
        }

        debug!("Draining {} sessions", sessions.len());
        while let Some(result) = sessions.join_next().await {
            if let Err(e) = result {
                error!("Session task failed: {}", e);
            }
        }

        let final_concurrency = concurrency_at_breach.unwrap_or_else(|| self.ctx.gauge.current());
        let report = ProbeReport {
            target: self.ctx.connector.describe(),
            final_concurrency,
            peak_concurrency: self.ctx.gauge.peak(),
            degraded: degraded_at.is_some(),
            degraded_at_session: degraded_at,
            sessions_planned: config.max_sessions,
            sessions_spawned: spawned,
            samples_recorded: self.ctx.tracker.len(),
            final_window: self.ctx.tracker.window_stats(&policy),
            policy,
            counters: self.ctx.counters.snapshot(),
            duration_secs: started.elapsed().as_secs_f64(),
        };

        info!(
            "Probe complete: final concurrency {}, peak {}, {} samples",
            report.final_concurrency, report.peak_concurrency, report.samples_recorded
        );

        report
    }
}
