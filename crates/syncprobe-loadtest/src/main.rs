//! # syncprobe CLI
//!
//! Command-line entry point for the session-capacity prober.
//!
//! ## Usage
//!
//! ```bash
//! # Probe with the built-in defaults
//! syncprobe --target 127.0.0.1:8080
//!
//! # Gentler ramp-up, stricter SLA
//! syncprobe --target 10.0.0.5:8999 --connect-interval-us 500 --deadline-ms 5 --max-slow-percent 1
//!
//! # Load settings from a file and save the report
//! syncprobe --config probe.toml --output report.json
//! ```

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use syncprobe_loadtest::*;
use syncprobe_protocol::MessageCorpus;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "syncprobe")]
#[command(version)]
#[command(about = "Find how many concurrent sync sessions a server sustains", long_about = None)]
struct Cli {
    /// TOML configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target host:port
    #[arg(short, long, env = "SYNCPROBE_TARGET")]
    target: Option<String>,

    /// Maximum number of sessions to open
    #[arg(short, long)]
    max_sessions: Option<usize>,

    /// Pause between session spawns in microseconds
    #[arg(long)]
    connect_interval_us: Option<u64>,

    /// Lifetime of each session in milliseconds
    #[arg(long)]
    session_duration_ms: Option<u64>,

    /// Interval between state updates in milliseconds
    #[arg(long)]
    action_interval_ms: Option<u64>,

    /// Response deadline in milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Number of recent responses inspected
    #[arg(short, long)]
    window: Option<usize>,

    /// Allowed percentage of slow responses in the window
    #[arg(long)]
    max_slow_percent: Option<f64>,

    /// Number of rooms sessions are spread over
    #[arg(long)]
    rooms: Option<usize>,

    /// Chance of announcing a file after each state update
    #[arg(long)]
    file_probability: Option<f64>,

    /// How state updates are produced
    #[arg(long, value_enum)]
    state_mode: Option<StateMode>,

    /// Seed for reproducible message pools and session behaviour
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Output report to JSON file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut ProbeConfig) {
        if let Some(target) = &self.target {
            config.target = target.clone();
        }
        if let Some(v) = self.max_sessions {
            config.max_sessions = v;
        }
        if let Some(v) = self.connect_interval_us {
            config.connect_interval_us = v;
        }
        if let Some(v) = self.session_duration_ms {
            config.session_duration_ms = v;
        }
        if let Some(v) = self.action_interval_ms {
            config.action_interval_ms = v;
        }
        if let Some(v) = self.deadline_ms {
            config.response_deadline_ms = v;
        }
        if let Some(v) = self.window {
            config.window_size = v;
        }
        if let Some(v) = self.max_slow_percent {
            config.max_slow_percent = v;
        }
        if let Some(v) = self.rooms {
            config.room_count = v;
        }
        if let Some(v) = self.file_probability {
            config.file_probability = v;
        }
        if let Some(v) = self.state_mode {
            config.state_mode = v;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

fn init_logging(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let mut config = match &cli.config {
        Some(path) => ProbeConfig::load(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => ProbeConfig::default(),
    };
    cli.apply_overrides(&mut config);
    config.validate()?;

    info!("syncprobe v{}", env!("CARGO_PKG_VERSION"));

    let corpus_config = config.corpus_config();
    let corpus = tokio::task::spawn_blocking(move || MessageCorpus::build(&corpus_config))
        .await
        .map_err(|e| ProbeError::Setup(e.to_string()))??;
    info!(
        "Precomputed {} greetings, {} state and {} file messages",
        corpus.hello_pool().len(),
        corpus.state_pool().len(),
        corpus.file_pool().len()
    );

    let connector = Arc::new(TcpConnector::new(
        config.target.clone(),
        config.connect_timeout(),
    ));
    let prober = CapacityProber::new(config, Arc::new(corpus), connector)?;

    let stop = prober.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping ramp-up and draining sessions");
            stop.store(true, Ordering::Release);
        }
    });

    let report = prober.probe().await;
    report.print_report();
    println!("{}", report.summary_line());

    if !report.degraded {
        warn!(
            "Latency never degraded; the final concurrency is not a capacity limit (peak was {})",
            report.peak_concurrency
        );
    }

    if let Some(output_path) = cli.output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&output_path, json)
            .with_context(|| format!("Failed to write report to {:?}", output_path))?;
        info!("Results saved to {:?}", output_path);
    }

    Ok(())
}
