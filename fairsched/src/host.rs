/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Types shared with the host simulator.
//!
//! The scheduler never owns the host.  Every callback receives the host as
//! `&mut impl Host` and talks to it through two channels only:
//!
//! ```text
//!  host ──(sample: metric counter)──►  FairScheduler
//!  host ◄──(set_affinity: directive)──  FairScheduler
//! ```
//!
//! Lifecycle events travel the other way as plain method calls on
//! [`FairScheduler`](crate::scheduler::FairScheduler).

use std::fmt;
use std::str::FromStr;

use crate::scheduler::SchedulerError;

/// Stable host identifier of a software thread.
pub type ThreadId = u32;

/// Identifier of an execution core.
pub type CoreId = u32;

/// Simulated time, in whatever unit the host clock uses (typically ns).
pub type SimTime = u64;

/// Stall reason the host reports when a thread was descheduled because of
/// our own affinity release rather than a real blocking cause.
pub const UNSCHEDULED_REASON: &str = "unscheduled";

// ── Affinity directive ────────────────────────────────────────────────────────

/// Affinity directive issued to the host for one thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoreAffinity {
    /// No constraint – the host may run the thread on any core.
    #[default]
    Any,

    /// Restricted to exactly this core.
    Pinned(CoreId),
}

impl CoreAffinity {
    /// Returns the pinned core, or `None` for [`CoreAffinity::Any`].
    pub fn core(&self) -> Option<CoreId> {
        match self {
            CoreAffinity::Any => None,
            CoreAffinity::Pinned(core) => Some(*core),
        }
    }
}

// ── Fairness metric ───────────────────────────────────────────────────────────

/// Resource counter used as fairness credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metric {
    /// Elapsed non-idle running time.
    #[default]
    ElapsedTime,
    /// Retired instruction count.
    Instructions,
}

impl Metric {
    /// Canonical configuration spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::ElapsedTime => "time",
            Metric::Instructions => "instructions",
        }
    }
}

impl FromStr for Metric {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "time" | "elapsed-non-idle-time" => Ok(Metric::ElapsedTime),
            "instructions" | "retired-instruction-count" => Ok(Metric::Instructions),
            other => Err(SchedulerError::UnknownMetric(other.to_string())),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Stall reasons ─────────────────────────────────────────────────────────────

/// Typed view of the host's stall reason string.
///
/// The host protocol is stringly typed; this enum is built once at the
/// boundary so the rest of the scheduler never compares strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StallReason {
    /// Echo of our own affinity release – not a real block.
    Unscheduled,
    Mutex,
    Futex,
    Cond,
    Barrier,
    Join,
    Pause,
    Sleep,
    Syscall,
    /// Synthesised by the exit handler.
    Exit,
    /// Any cause the host reports that we do not recognise.
    Other(String),
}

impl StallReason {
    /// Parse the raw string delivered by the host.
    ///
    /// Never fails: unrecognised causes are real blocks and map to
    /// [`StallReason::Other`].
    pub fn from_host(reason: &str) -> Self {
        match reason {
            UNSCHEDULED_REASON => StallReason::Unscheduled,
            "mutex" => StallReason::Mutex,
            "futex" => StallReason::Futex,
            "cond" | "condvar" => StallReason::Cond,
            "barrier" => StallReason::Barrier,
            "join" => StallReason::Join,
            "pause" => StallReason::Pause,
            "sleep" => StallReason::Sleep,
            "syscall" => StallReason::Syscall,
            "exit" => StallReason::Exit,
            other => StallReason::Other(other.to_string()),
        }
    }

    /// `true` for the reserved echo sentinel.
    pub fn is_unscheduled(&self) -> bool {
        matches!(self, StallReason::Unscheduled)
    }

    pub fn as_str(&self) -> &str {
        match self {
            StallReason::Unscheduled => UNSCHEDULED_REASON,
            StallReason::Mutex => "mutex",
            StallReason::Futex => "futex",
            StallReason::Cond => "cond",
            StallReason::Barrier => "barrier",
            StallReason::Join => "join",
            StallReason::Pause => "pause",
            StallReason::Sleep => "sleep",
            StallReason::Syscall => "syscall",
            StallReason::Exit => "exit",
            StallReason::Other(s) => s,
        }
    }
}

impl fmt::Display for StallReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Host trait ────────────────────────────────────────────────────────────────

/// The simulator substrate the scheduler steers.
pub trait Host {
    /// Current value of `metric` for `thread`.
    ///
    /// Must be non-decreasing while the thread holds a core and frozen while
    /// it does not.
    fn sample(&self, thread: ThreadId, metric: Metric) -> u64;

    /// Apply an affinity directive to `thread`.
    fn set_affinity(&mut self, thread: ThreadId, affinity: CoreAffinity);
}

// ── Test host ─────────────────────────────────────────────────────────────────


// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_accepts_short_and_long_spellings() {
        assert_eq!("time".parse::<Metric>().unwrap(), Metric::ElapsedTime);
        assert_eq!(
            "elapsed-non-idle-time".parse::<Metric>().unwrap(),
            Metric::ElapsedTime
        );
        assert_eq!(
            "instructions".parse::<Metric>().unwrap(),
            Metric::Instructions
        );
        assert_eq!(
            "retired-instruction-count".parse::<Metric>().unwrap(),
            Metric::Instructions
        );
    }

    #[test]
    fn unknown_metric_is_a_configuration_error() {
        let err = "cycles".parse::<Metric>().unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownMetric(ref m) if m == "cycles"));
    }

    #[test]
    fn unscheduled_sentinel_is_distinguished_from_real_blocks() {
        assert!(StallReason::from_host("unscheduled").is_unscheduled());
        for real in ["mutex", "futex", "cond", "barrier", "join", "pause", "sleep"] {
            assert!(!StallReason::from_host(real).is_unscheduled(), "{real}");
        }
    }

    #[test]
    fn unknown_stall_reason_keeps_its_text() {
        let r = StallReason::from_host("io_wait");
        assert_eq!(r, StallReason::Other("io_wait".into()));
        assert_eq!(r.to_string(), "io_wait");
    }

    #[test]
    fn affinity_core_extracts_pin() {
        assert_eq!(CoreAffinity::Pinned(3).core(), Some(3));
        assert_eq!(CoreAffinity::Any.core(), None);
    }
}
