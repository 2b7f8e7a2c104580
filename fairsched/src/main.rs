/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use fairsched::config::SchedulerConfig;
use fairsched::host::Metric;
use fairsched::sim::{ReplayReport, Replayer, Trace};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Replay a workload trace through the fairness scheduler.
///
/// Example:
///   fairsched -t workload.yaml -c fairsched.yaml --interval 500000
#[derive(Debug, Parser)]
#[command(
    name = "fairsched",
    about = "Online multicore fairness scheduler – trace replay",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML workload trace.
    #[arg(short = 't', long = "trace")]
    trace: PathBuf,

    /// Path to the YAML scheduler configuration.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Override the rebalance interval (simulated time units).
    #[arg(short = 'i', long = "interval")]
    interval: Option<u64>,

    /// Override the fairness metric (time | instructions).
    #[arg(short = 'm', long = "metric")]
    metric: Option<String>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialise structured logging.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        trace    = %cli.trace.display(),
        config   = ?cli.config,
        interval = ?cli.interval,
        metric   = ?cli.metric,
        "Configuration"
    );

    if let Err(e) = run(&cli) {
        error!("fairsched aborted: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    // ── Load scheduler configuration ──────────────────────────────────────────
    let mut config = match &cli.config {
        Some(path) => SchedulerConfig::load_from_file(path)?,
        None => {
            warn!("No configuration file provided, using default scheduler settings");
            SchedulerConfig::default()
        }
    };
    if let Some(interval) = cli.interval {
        config = config.with_interval(interval)?;
    }
    if let Some(metric) = &cli.metric {
        config = config.with_metric(metric.parse::<Metric>()?);
    }

    // ── Load trace and replay ─────────────────────────────────────────────────
    let trace = Trace::load_from_file(&cli.trace)?;
    let mut replayer = Replayer::new(config);
    let report = replayer
        .run(&trace)
        .context("scheduler consistency failure, run stopped")?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &ReplayReport) {
    info!(
        events = report.events,
        ticks = report.ticks,
        echoes = report.echoes,
        evictions = report.evictions,
        placements = report.placements,
        end_time = report.end_time,
        max_spread = report.max_spread,
        "Replay summary"
    );

    for snap in report.exited.iter().chain(report.live.iter()) {
        info!(
            "  [thread {id}]  score={score:.0}  assigned_time={time}  assignments={count}  state={state:?}",
            id = snap.id,
            score = snap.score,
            time = snap.assigned_time,
            count = snap.assignment_count,
            state = snap.state,
        );
    }
}
