/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-thread bookkeeping for the fairness scheduler.
//!
//! One [`ThreadRecord`] exists per live software thread:
//!
//! ```text
//!  start ──► ThreadRecord ──(stall / resume / rebalance)──► ... ──► exit ──► removed
//! ```
//!
//! # Ownership model
//! Records are owned by the [`FairScheduler`](crate::scheduler::FairScheduler)
//! thread table.  Callers only ever see `&ThreadRecord` or a detached
//! [`ThreadSnapshot`]; all mutation goes through the scheduler so the score
//! and core-occupancy invariants cannot be bypassed.

use crate::host::{CoreId, SimTime, ThreadId};

// ── Core slot ─────────────────────────────────────────────────────────────────

/// Whether a thread currently holds a core.
///
/// Replaces an optional integer with a `-1`/`None` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoreSlot {
    #[default]
    Unassigned,
    Assigned(CoreId),
}

impl CoreSlot {
    pub fn core(&self) -> Option<CoreId> {
        match self {
            CoreSlot::Unassigned => None,
            CoreSlot::Assigned(core) => Some(*core),
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, CoreSlot::Assigned(_))
    }
}

// ── Lifecycle state ───────────────────────────────────────────────────────────

/// Lifecycle state derived from a record's `core` and `runnable` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    UnassignedRunnable,
    AssignedRunnable,
    Blocked,
}

// ── ThreadRecord ──────────────────────────────────────────────────────────────

/// Scheduler-side record of one live software thread.
#[derive(Debug, Clone)]
pub struct ThreadRecord {
    // ── Identity ──────────────────────────────────────────────────────────────
    pub(crate) id: ThreadId,

    // ── Scheduling state ──────────────────────────────────────────────────────
    pub(crate) core: CoreSlot,

    /// `false` while the thread is blocked.
    pub(crate) runnable: bool,

    /// Set by a `stall("unscheduled")` echo; the next resume is swallowed.
    pub(crate) pending_self_release: bool,

    // ── Fairness accounting ───────────────────────────────────────────────────
    /// Accumulated service credit.  Lower means higher priority.
    pub(crate) score: f64,

    /// Host metric value at the last settlement.
    pub(crate) raw_metric_at_last_sample: u64,

    // ── Diagnostics ───────────────────────────────────────────────────────────
    pub(crate) started_at: SimTime,
    pub(crate) last_scheduled_in_at: Option<SimTime>,
    pub(crate) last_scheduled_out_at: Option<SimTime>,

    /// Number of times this thread was given a core.
    pub(crate) assignment_count: u64,

    /// Total simulated time spent holding a core, settled on release.
    pub(crate) assigned_time: SimTime,
}

impl ThreadRecord {
    /// Fresh, runnable, unassigned record with zero score.
    pub(crate) fn new(id: ThreadId, raw_metric: u64, started_at: SimTime) -> Self {
        Self {
            id,
            core: CoreSlot::Unassigned,
            runnable: true,
            pending_self_release: false,
            score: 0.0,
            raw_metric_at_last_sample: raw_metric,
            started_at,
            last_scheduled_in_at: None,
            last_scheduled_out_at: None,
            assignment_count: 0,
            assigned_time: 0,
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn core(&self) -> CoreSlot {
        self.core
    }

    pub fn assigned_core(&self) -> Option<CoreId> {
        self.core.core()
    }

    pub fn is_assigned(&self) -> bool {
        self.core.is_assigned()
    }

    pub fn is_runnable(&self) -> bool {
        self.runnable
    }

    pub fn pending_self_release(&self) -> bool {
        self.pending_self_release
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn raw_metric_at_last_sample(&self) -> u64 {
        self.raw_metric_at_last_sample
    }

    pub fn started_at(&self) -> SimTime {
        self.started_at
    }

    pub fn last_scheduled_in_at(&self) -> Option<SimTime> {
        self.last_scheduled_in_at
    }

    pub fn last_scheduled_out_at(&self) -> Option<SimTime> {
        self.last_scheduled_out_at
    }

    pub fn assignment_count(&self) -> u64 {
        self.assignment_count
    }

    pub fn assigned_time(&self) -> SimTime {
        self.assigned_time
    }

    pub fn state(&self) -> ThreadState {
        match (self.runnable, self.core) {
            (false, _) => ThreadState::Blocked,
            (true, CoreSlot::Assigned(_)) => ThreadState::AssignedRunnable,
            (true, CoreSlot::Unassigned) => ThreadState::UnassignedRunnable,
        }
    }

    /// `true` if the thread is a candidate for a free core.
    pub(crate) fn is_waiting(&self) -> bool {
        self.runnable && !self.core.is_assigned()
    }

    pub fn snapshot(&self) -> ThreadSnapshot {
        ThreadSnapshot {
            id: self.id,
            core: self.core.core(),
            state: self.state(),
            score: self.score,
            assignment_count: self.assignment_count,
            assigned_time: self.assigned_time,
        }
    }
}

// ── ThreadSnapshot ────────────────────────────────────────────────────────────

/// Detached copy of the reportable parts of a [`ThreadRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadSnapshot {
    pub id: ThreadId,
    pub core: Option<CoreId>,
    pub state: ThreadState,
    pub score: f64,
    pub assignment_count: u64,
    pub assigned_time: SimTime,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
