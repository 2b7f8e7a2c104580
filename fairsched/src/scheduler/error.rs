/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the fairness scheduler.
//!
//! Two failure layers share one enum:
//!
//! * **Configuration errors** (`UnknownMetric`, `NoUsableCores`,
//!   `InvalidInterval`) are raised at setup, before the first event.
//! * **Consistency errors** (everything else) mean the thread table, the
//!   core-occupancy table or the event stream disagree with each other.  They
//!   indicate a bookkeeping bug or a broken host, never a transient fault, so
//!   callers must stop the run instead of retrying.
//!
//! **Do not** collapse these into `anyhow::Error` inside the scheduler; the
//! binary does that at the very top.

use thiserror::Error;

use crate::host::{CoreId, ThreadId};

/// Error returned by every fallible [`FairScheduler`](super::FairScheduler)
/// operation.
#[derive(Debug, Error, PartialEq)]
pub enum SchedulerError {
    // ── Configuration ─────────────────────────────────────────────────────────
    /// The metric selector string is not recognised.
    #[error("unknown fairness metric: '{0}' (valid: time, instructions)")]
    UnknownMetric(String),

    /// The core mask left no usable core.
    #[error("no usable cores — the core mask disables every core")]
    NoUsableCores,

    /// The rebalance interval must be strictly positive.
    #[error("rebalance interval must be greater than zero")]
    InvalidInterval,

    // ── Event stream ──────────────────────────────────────────────────────────
    /// An event referenced a thread that is not live.
    #[error("thread {0} is not a live thread")]
    UnknownThread(ThreadId),

    /// A start event arrived for a thread that is already live.
    #[error("thread {0} started twice")]
    DuplicateThread(ThreadId),

    // ── Internal consistency ──────────────────────────────────────────────────
    /// A core id outside the usable set was about to be assigned.
    #[error("core {0} is not in the usable core set")]
    UnknownCore(CoreId),

    /// Two threads would hold the same core.
    #[error("core {core} is held by thread {holder}, cannot assign it to thread {claimant}")]
    CoreConflict {
        core: CoreId,
        holder: ThreadId,
        claimant: ThreadId,
    },

    /// More threads hold a core than there are cores.
    #[error("{assigned} threads hold a core but only {cores} cores exist")]
    CapacityExceeded { assigned: usize, cores: usize },

    /// The rebalancer selected more unassigned threads than there are free
    /// cores.
    #[error("rebalance needs {needed} free cores but only {available} are free")]
    InsufficientFreeCores { needed: usize, available: usize },

    /// The thread table and the core-occupancy table disagree.
    #[error("occupancy table says core {core} holds {recorded:?} but thread table says {actual:?}")]
    OccupancyMismatch {
        core: CoreId,
        recorded: Option<ThreadId>,
        actual: Option<ThreadId>,
    },
}
