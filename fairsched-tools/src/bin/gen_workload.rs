/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Synthetic workload generator.
//!
//! Writes a deterministic trace for `fairsched --trace`:
//!
//! * every thread starts at time 0;
//! * thread `i` blocks every `--block-every` units, phase-shifted by
//!   `i × block_every / threads`, for `--block-for` units, cycling through
//!   real blocking causes;
//! * every thread exits at `--duration`.
//!
//! With `--block-every 0` the threads never block, which is the textbook
//! fairness workload (N identical always-runnable threads).

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;

use fairsched::host::{SimTime, ThreadId};
use fairsched::sim::{ThreadSpec, Trace, TraceEvent};

/// Real blocking causes used for generated stalls.
const REASONS: [&str; 4] = ["futex", "mutex", "barrier", "cond"];

#[derive(Debug, Parser)]
#[command(name = "gen-workload", about = "Generate a synthetic fairsched trace")]
struct Args {
    /// Number of threads.
    #[arg(short = 'n', long, default_value_t = 8)]
    threads: u32,

    /// Time at which every thread exits.
    #[arg(short = 'd', long, default_value_t = 10_000_000)]
    duration: SimTime,

    /// Blocking period per thread; 0 disables blocking.
    #[arg(long, default_value_t = 0)]
    block_every: SimTime,

    /// Length of each blocked period.
    #[arg(long, default_value_t = 100_000)]
    block_for: SimTime,

    /// IPC of every thread (only matters for the instructions metric).
    #[arg(long, default_value_t = 1.0)]
    ipc: f64,

    /// Wrap the run in explicit roi_begin / roi_end events.
    #[arg(long, default_value_t = false)]
    roi: bool,

    /// Output YAML file.
    #[arg(short = 'o', long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let trace = generate(&args)?;
    trace.save_to_file(&args.output)?;

    info!(
        threads = args.threads,
        events = trace.events.len(),
        output = %args.output.display(),
        "Workload trace written"
    );
    Ok(())
}

fn generate(args: &Args) -> Result<Trace> {
    if args.threads == 0 {
        bail!("--threads must be at least 1");
    }
    if args.block_every > 0 && args.block_for >= args.block_every {
        bail!("--block-for must be shorter than --block-every");
    }

    let mut events = Vec::new();
    if args.roi {
        events.push(TraceEvent::RoiBegin { time: 0 });
    }

    for thread in 0..args.threads {
        events.push(TraceEvent::Start { time: 0, thread });
    }
    if args.block_every > 0 {
        for thread in 0..args.threads {
            events.extend(blocking_events(args, thread)?);
        }
    }
    for thread in 0..args.threads {
        events.push(TraceEvent::Exit {
            time: args.duration,
            thread,
        });
    }

    if args.roi {
        events.push(TraceEvent::RoiEnd {
            time: args.duration,
        });
    }

    let threads = (0..args.threads)
        .map(|id| ThreadSpec { id, ipc: args.ipc })
        .collect();
    let mut trace = Trace { threads, events };
    trace.validate()?;
    trace.sort();
    Ok(trace)
}

/// Stall/resume pairs for one thread, all strictly before the exit.
fn blocking_events(args: &Args, thread: ThreadId) -> Result<Vec<TraceEvent>> {
    let Some(phase) = args
        .block_every
        .checked_mul(SimTime::from(thread))
        .map(|p| p / SimTime::from(args.threads))
    else {
        bail!("--block-every {} is too large for {} threads", args.block_every, args.threads);
    };
    let mut events = Vec::new();
    let mut next = args.block_every.checked_add(phase);
    let mut n = thread as usize;

    while let Some(stall_at) = next {
        let resume_at = match stall_at.checked_add(args.block_for) {
            Some(t) if t < args.duration => t,
            _ => break,
        };
        events.push(TraceEvent::Stall {
            time: stall_at,
            thread,
            reason: REASONS[n % REASONS.len()].to_string(),
        });
        events.push(TraceEvent::Resume {
            time: resume_at,
            thread,
            woken_by: None,
        });
        next = stall_at.checked_add(args.block_every);
        n += 1;
    }
    Ok(events)
}
