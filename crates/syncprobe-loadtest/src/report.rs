//! Probe result and its console rendering

use serde::{Deserialize, Serialize};

use crate::metrics::CountersSnapshot;
use crate::tracker::{DegradationPolicy, WindowStats};

/// Outcome of one probe run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    /// Endpoint that was probed
    pub target: String,

    /// Concurrency when degradation was detected, or at drain time if it never was
    pub final_concurrency: usize,

    /// Highest concurrency observed during the run
    pub peak_concurrency: usize,

    /// Whether the latency window breached the policy
    pub degraded: bool,

    /// Identity of the last session spawned before the breach was seen
    pub degraded_at_session: Option<usize>,

    pub sessions_planned: usize,
    pub sessions_spawned: usize,

    /// Latency samples recorded by all readers
    pub samples_recorded: usize,

    /// Most recent window at the end of the run, if it was full
    pub final_window: Option<WindowStats>,

    pub policy: DegradationPolicy,
    pub counters: CountersSnapshot,
    pub duration_secs: f64,
}

impl ProbeReport {
    /// Concurrency the endpoint sustained before the threshold was exceeded
    pub fn max_concurrent_sessions(&self) -> usize {
        self.final_concurrency
    }

    /// One-line summary
    pub fn summary_line(&self) -> String {
        format!(
            "Maximum concurrent connections before exceeding response threshold: {}",
            self.max_concurrent_sessions()
        )
    }

    /// Boxed console report, one line per entry
    pub fn render(&self) -> Vec<String> {
        let mut lines = vec![
            format!("╔{}╗", BORDER),
            boxed(&format!(
                "{:^width$}",
                "SYNCPROBE CAPACITY PROBE RESULTS",
                width = BOX_WIDTH
            )),
            format!("╠{}╣", BORDER),
            boxed(&format!(" Target:            {}", self.target)),
            boxed(&format!(" Duration:          {:>10.2} seconds", self.duration_secs)),
            boxed(&format!(
                " Sessions:          {:>10} / {}",
                self.sessions_spawned, self.sessions_planned
            )),
            boxed(&format!(
                " Degraded:          {:>10}",
                if self.degraded { "yes" } else { "no" }
            )),
            boxed(&format!(" Final concurrency: {:>10}", self.final_concurrency)),
            boxed(&format!(" Peak concurrency:  {:>10}", self.peak_concurrency)),
            format!("╠{}╣", BORDER),
            boxed(" LATENCY WINDOW"),
            boxed(&format!("   samples:         {:>10}", self.samples_recorded)),
            boxed(&format!(
                "   window / limit:  {:>10} / {:.1}% over {}ms",
                self.policy.window_size,
                self.policy.max_slow_percent,
                self.policy.deadline.as_millis()
            )),
        ];
        lines.push(match &self.final_window {
            Some(window) => boxed(&format!(
                "   slow in window:  {:>10} ({:.2}%)",
                window.slow, window.slow_percent
            )),
            None => boxed("   slow in window:         n/a (window not filled)"),
        });
        lines.extend([
            format!("╠{}╣", BORDER),
            boxed(&format!(" Messages Sent:     {:>10}", self.counters.messages_sent)),
            boxed(&format!(" Bytes Sent:        {:>10}", self.counters.bytes_sent)),
            boxed(&format!(" Connect Failures:  {:>10}", self.counters.connect_failures)),
            boxed(&format!(" Send Failures:     {:>10}", self.counters.send_failures)),
            format!("╚{}╝", BORDER),
        ]);
        lines
    }

    /// Print formatted report
    pub fn print_report(&self) {
        println!();
        for line in self.render() {
            println!("{}", line);
        }
        println!();
    }
}

/// Inner width of the report box
const BOX_WIDTH: usize = 62;

const BORDER: &str = "══════════════════════════════════════════════════════════════";

/// Pad or cut `content` to the box width and add the side borders
fn boxed(content: &str) -> String {
    let fitted: String = content.chars().take(BOX_WIDTH).collect();
    format!("║{:<width$}║", fitted, width = BOX_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn report() -> ProbeReport {
        ProbeReport {
            target: "tcp://127.0.0.1:8080".to_string(),
            final_concurrency: 812,
            peak_concurrency: 830,
            degraded: true,
            degraded_at_session: Some(829),
            sessions_planned: 50_000,
            sessions_spawned: 830,
            samples_recorded: 4_211,
            final_window: Some(WindowStats {
                window_size: 1000,
                slow: 51,
                slow_percent: 5.1,
            }),
            policy: DegradationPolicy {
                window_size: 1000,
                deadline: Duration::from_millis(10),
                max_slow_percent: 5.0,
            },
            counters: CountersSnapshot::default(),
            duration_secs: 12.5,
        }
    }

    #[test]
    fn test_summary_line() {
        assert_eq!(
            report().summary_line(),
            "Maximum concurrent connections before exceeding response threshold: 812"
        );
    }

    #[test]
    fn test_render_keeps_box_aligned() {
        let mut long = report();
        long.target = format!("tcp://{}:8080", "very-long-hostname.".repeat(8));
        long.final_window = None;

        for r in [report(), long] {
            let lines = r.render();
            assert_eq!(lines.len(), 20);
            for line in &lines {
                assert_eq!(line.chars().count(), BOX_WIDTH + 2, "misaligned: {}", line);
            }
            assert!(lines[1].contains("SYNCPROBE CAPACITY PROBE RESULTS"));
        }
        assert_eq!(BORDER.chars().count(), BOX_WIDTH);
    }

    #[test]
    fn test_report_json() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["final_concurrency"], 812);
        assert_eq!(json["peak_concurrency"], 830);
        assert_eq!(json["degraded"], true);
        assert_eq!(json["final_window"]["slow"], 51);
        assert_eq!(json["policy"]["window_size"], 1000);
    }
}
