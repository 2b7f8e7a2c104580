/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core assignment actuator.
//!
//! The only place that mutates `ThreadRecord::core` and the occupancy
//! table, and the only place that issues affinity directives.  Both
//! operations settle the score under the *old* assignment before changing
//! anything.

use tracing::debug;

use crate::host::{CoreAffinity, CoreId, Host, SimTime, ThreadId};
use crate::thread::CoreSlot;

use super::{FairScheduler, SchedulerError};

impl FairScheduler {
    /// Give `core` to `thread` and pin the thread to it.
    ///
    /// A thread that already holds a different core is released first.
    ///
    /// # Errors
    /// [`SchedulerError::UnknownCore`] if `core` is not usable and
    /// [`SchedulerError::CoreConflict`] if another thread holds it.
    pub(crate) fn assign<H: Host>(
        &mut self,
        host: &mut H,
        thread: ThreadId,
        core: CoreId,
        time: SimTime,
    ) -> Result<(), SchedulerError> {
        match self.occupancy.get(&core) {
            None => return Err(SchedulerError::UnknownCore(core)),
            Some(Some(holder)) if *holder == thread => return Ok(()),
            Some(Some(holder)) => {
                return Err(SchedulerError::CoreConflict {
                    core,
                    holder: *holder,
                    claimant: thread,
                })
            }
            Some(None) => {}
        }

        if self.record(thread)?.is_assigned() {
            self.release(host, thread, time)?;
        }

        // Metric accrued while unpinned is not service credit.
        let raw = self.sample(&*host, thread);
        let rec = self.record_mut(thread)?;
        rec.core = CoreSlot::Assigned(core);
        rec.raw_metric_at_last_sample = raw;
        rec.last_scheduled_in_at = Some(time);
        rec.assignment_count += 1;
        let score = rec.score;

        self.occupancy.insert(core, Some(thread));
        host.set_affinity(thread, CoreAffinity::Pinned(core));

        debug!(thread, core, time, score, "assign");
        Ok(())
    }

    /// Take `thread`'s core away and lift its affinity restriction.
    ///
    /// Returns the freed core, or `None` if the thread held none (in which
    /// case no directive is issued).
    pub(crate) fn release<H: Host>(
        &mut self,
        host: &mut H,
        thread: ThreadId,
        time: SimTime,
    ) -> Result<Option<CoreId>, SchedulerError> {
        self.update_score(&*host, thread)?;

        let Some(core) = self.record(thread)?.assigned_core() else {
            return Ok(None);
        };
        let recorded = self.occupancy.get(&core).copied().flatten();
        if recorded != Some(thread) {
            return Err(SchedulerError::OccupancyMismatch {
                core,
                recorded,
                actual: Some(thread),
            });
        }

        let rec = self.record_mut(thread)?;
        rec.core = CoreSlot::Unassigned;
        rec.last_scheduled_out_at = Some(time);
        if let Some(since) = rec.last_scheduled_in_at {
            rec.assigned_time += time.saturating_sub(since);
        }
        let score = rec.score;

        self.occupancy.insert(core, None);
        host.set_affinity(thread, CoreAffinity::Any);

        debug!(thread, core, time, score, "release");
        Ok(Some(core))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
