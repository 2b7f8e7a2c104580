/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! YAML workload traces.
//!
//! ```yaml
//! threads:
//!   - { id: 0, ipc: 1.5 }
//! events:
//!   - { event: roi_begin, time: 0 }
//!   - { event: start,  time: 0,    thread: 0 }
//!   - { event: stall,  time: 400,  thread: 0, reason: futex }
//!   - { event: resume, time: 900,  thread: 0, woken_by: 1 }
//!   - { event: exit,   time: 5000, thread: 0 }
//!   - { event: roi_end, time: 5000 }
//! ```
//!
//! `threads` is optional; unlisted threads run at an IPC of 1.0.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::host::{SimTime, ThreadId};

/// Instructions retired per time unit for threads not listed in `threads`.
pub const DEFAULT_IPC: f64 = 1.0;

fn default_ipc() -> f64 {
    DEFAULT_IPC
}

/// Per-thread execution properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSpec {
    pub id: ThreadId,
    #[serde(default = "default_ipc")]
    pub ipc: f64,
}

/// One host event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    Start {
        time: SimTime,
        thread: ThreadId,
    },
    Stall {
        time: SimTime,
        thread: ThreadId,
        reason: String,
    },
    Resume {
        time: SimTime,
        thread: ThreadId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        woken_by: Option<ThreadId>,
    },
    Exit {
        time: SimTime,
        thread: ThreadId,
    },
    RoiBegin {
        time: SimTime,
    },
    RoiEnd {
        time: SimTime,
    },
}

impl TraceEvent {
    pub fn time(&self) -> SimTime {
        match self {
            TraceEvent::Start { time, .. }
            | TraceEvent::Stall { time, .. }
            | TraceEvent::Resume { time, .. }
            | TraceEvent::Exit { time, .. }
            | TraceEvent::RoiBegin { time }
            | TraceEvent::RoiEnd { time } => *time,
        }
    }

    /// The thread the event is about, if any.
    pub fn thread(&self) -> Option<ThreadId> {
        match self {
            TraceEvent::Start { thread, .. }
            | TraceEvent::Stall { thread, .. }
            | TraceEvent::Resume { thread, .. }
            | TraceEvent::Exit { thread, .. } => Some(*thread),
            TraceEvent::RoiBegin { .. } | TraceEvent::RoiEnd { .. } => None,
        }
    }
}

/// A complete workload trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub threads: Vec<ThreadSpec>,
    #[serde(default)]
    pub events: Vec<TraceEvent>,
}

impl Trace {
    /// Read and validate a trace file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// fails [`validate`](Self::validate).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading workload trace from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open trace file: {}", path.display()))?;
        let trace = Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid trace file: {}", path.display()))?;

        info!(
            events = trace.events.len(),
            threads = trace.thread_count(),
            end_time = trace.end_time(),
            "Trace loaded"
        );
        Ok(trace)
    }

    /// Parse, validate and time-sort a YAML trace.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut trace: Trace = serde_yaml::from_str(content).context("Failed to parse YAML")?;
        trace.validate()?;
        trace.sort();
        Ok(trace)
    }

    /// Write the trace as YAML.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialise trace")?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Cannot write trace file: {}", path.display()))
    }

    /// Stable sort by time: same-time events keep their file order.
    pub fn sort(&mut self) {
        self.events.sort_by_key(TraceEvent::time);
    }

    /// Check thread specs.  Event ordering per thread is the host's
    /// contract and is not checked here.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for spec in &self.threads {
            if !(spec.ipc.is_finite() && spec.ipc > 0.0) {
                bail!("thread {} has invalid ipc {}", spec.id, spec.ipc);
            }
            if !seen.insert(spec.id) {
                bail!("thread {} is listed twice in 'threads'", spec.id);
            }
        }
        Ok(())
    }

    pub fn ipc_of(&self, thread: ThreadId) -> f64 {
        self.threads
            .iter()
            .find(|s| s.id == thread)
            .map_or(DEFAULT_IPC, |s| s.ipc)
    }

    /// `true` if the trace delimits its region of interest explicitly.
    pub fn has_roi_begin(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, TraceEvent::RoiBegin { .. }))
    }

    /// Number of distinct threads that start.
    pub fn thread_count(&self) -> usize {
        self.events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::Start { thread, .. } => Some(*thread),
                _ => None,
            })
            .collect::<HashSet<_>>()
            .len()
    }

    /// Time of the last event, `0` for an empty trace.
    pub fn end_time(&self) -> SimTime {
        self.events.iter().map(TraceEvent::time).max().unwrap_or(0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
