/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Thread lifecycle event handlers.
//!
//! Per-thread state machine:
//!
//! ```text
//!              start (core free)             stall(real)
//!   ─────────► AssignedRunnable ─────────────────────────► Blocked
//!   start          ▲     │ rebalance evicts                 │
//!   (no core)      │     ▼                                  │ resume
//!   ─────────► UnassignedRunnable ◄─────────────────────────┘ (no core free)
//! ```
//!
//! Assignments made here are opportunistic; the periodic rebalancer is
//! authoritative.  `stall("unscheduled")` and the resume that follows it are
//! echoes of our own affinity release and are swallowed.

use tracing::debug;

use crate::host::{Host, SimTime, StallReason, ThreadId};
use crate::thread::ThreadRecord;

use super::{by_rank, FairScheduler, SchedulerError};

impl FairScheduler {
    /// A new thread appeared.  It takes the lowest free core if there is one.
    ///
    /// # Errors
    /// [`SchedulerError::DuplicateThread`] if `thread` is already live.
    pub fn on_thread_start<H: Host>(
        &mut self,
        host: &mut H,
        thread: ThreadId,
        time: SimTime,
    ) -> Result<(), SchedulerError> {
        if self.threads.contains_key(&thread) {
            return Err(SchedulerError::DuplicateThread(thread));
        }

        let raw = self.sample(&*host, thread);
        self.threads
            .insert(thread, ThreadRecord::new(thread, raw, time));

        match self.first_free_core() {
            Some(core) => self.assign(host, thread, core, time)?,
            None => debug!(thread, time, "start: no free core, thread waits"),
        }

        self.verify_invariants()
    }

    /// The host stalled `thread` for `reason`.
    ///
    /// The reserved reason `"unscheduled"` only arms echo suppression.  Any
    /// other reason releases the thread's core, marks it blocked and backfills
    /// the freed core.
    pub fn on_thread_stall<H: Host>(
        &mut self,
        host: &mut H,
        thread: ThreadId,
        reason: &str,
        time: SimTime,
    ) -> Result<(), SchedulerError> {
        self.handle_stall(host, thread, StallReason::from_host(reason), time)?;
        self.verify_invariants()
    }

    /// `thread` became runnable again.
    ///
    /// Echo resumes are swallowed.  A real wake resets the score to the global
    /// minimum and takes a free core if one exists.
    pub fn on_thread_resume<H: Host>(
        &mut self,
        host: &mut H,
        thread: ThreadId,
        woken_by: Option<ThreadId>,
        time: SimTime,
    ) -> Result<(), SchedulerError> {
        let rec = self.record_mut(thread)?;
        if rec.pending_self_release {
            rec.pending_self_release = false;
            debug!(thread, time, "resume: echo of own release, ignored");
            return self.verify_invariants();
        }

        self.reset_to_global_minimum(&*host, thread)?;
        let rec = self.record_mut(thread)?;
        rec.runnable = true;
        let waiting = !rec.is_assigned();
        debug!(thread, ?woken_by, time, score = rec.score, "resume");

        if waiting {
            if let Some(core) = self.first_free_core() {
                self.assign(host, thread, core, time)?;
            }
        }

        self.verify_invariants()
    }

    /// `thread` terminated.  Handled as `stall("exit")`, then the record is
    /// removed and returned.
    pub fn on_thread_exit<H: Host>(
        &mut self,
        host: &mut H,
        thread: ThreadId,
        time: SimTime,
    ) -> Result<ThreadRecord, SchedulerError> {
        self.handle_stall(host, thread, StallReason::Exit, time)?;

        let rec = self
            .threads
            .remove(&thread)
            .ok_or(SchedulerError::UnknownThread(thread))?;
        debug!(
            thread,
            time,
            score = rec.score,
            assigned_time = rec.assigned_time,
            "exit"
        );

        self.verify_invariants()?;
        Ok(rec)
    }

    fn handle_stall<H: Host>(
        &mut self,
        host: &mut H,
        thread: ThreadId,
        reason: StallReason,
        time: SimTime,
    ) -> Result<(), SchedulerError> {
        if reason.is_unscheduled() {
            self.record_mut(thread)?.pending_self_release = true;
            debug!(thread, time, "stall: echo of own release, ignored");
            return Ok(());
        }

        // A real block supersedes any outstanding echo pair.
        self.record_mut(thread)?.pending_self_release = false;

        let freed = self.release(host, thread, time)?;
        self.record_mut(thread)?.runnable = false;
        debug!(thread, %reason, ?freed, time, "stall");

        if let Some(core) = freed {
            match self.backfill_candidate() {
                Some(next) => {
                    self.assign(host, next, core, time)?;
                    debug!(thread = next, core, time, "backfill");
                }
                None => debug!(core, time, "backfill: no waiting thread, core idles"),
            }
        }
        Ok(())
    }

    /// Lowest-ranked runnable thread without a core.
    fn backfill_candidate(&self) -> Option<ThreadId> {
        self.threads
            .values()
            .filter(|r| r.is_waiting())
            .min_by(|a, b| by_rank(a, b))
            .map(|r| r.id)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
